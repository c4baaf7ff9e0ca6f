//! Whitespace-token prompting over any reader, so scripted stdin works as well as a terminal.
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub struct Prompter<R, W> {
    input: R,
    output: W,
    tokens: VecDeque<String>,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            tokens: VecDeque::new(),
        }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn say(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", text.as_ref())?;
        Ok(())
    }

    /// Next whitespace-separated token, reading more lines as needed.
    fn next_token(&mut self) -> Result<String> {
        loop {
            if let Some(token) = self.tokens.pop_front() {
                return Ok(token);
            }
            self.output.flush()?;
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("failed to read input")?;
            if read == 0 {
                bail!("input ended while waiting for a value");
            }
            self.tokens
                .extend(line.split_whitespace().map(str::to_owned));
        }
    }

    /// Asks `question` until a token parses and passes `valid`, echoing each accepted value.
    pub fn ask<T>(&mut self, question: &str, valid: impl Fn(&T) -> bool) -> Result<T>
    where
        T: FromStr + std::fmt::Display,
    {
        loop {
            self.say(question)?;
            let token = self.next_token()?;
            match token.parse::<T>() {
                Ok(value) if valid(&value) => {
                    self.say(format!("{value}"))?;
                    return Ok(value);
                }
                _ => self.say(format!("'{token}' is not accepted here."))?,
            }
        }
    }

    /// Like [`Prompter::ask`] for two values read after a single question.
    pub fn ask_pair<T>(&mut self, question: &str, valid: impl Fn(&T, &T) -> bool) -> Result<(T, T)>
    where
        T: FromStr + std::fmt::Display,
    {
        loop {
            self.say(question)?;
            let first = self.next_token()?;
            let second = self.next_token()?;
            match (first.parse::<T>(), second.parse::<T>()) {
                (Ok(a), Ok(b)) if valid(&a, &b) => {
                    self.say(format!("{a} {b}"))?;
                    return Ok((a, b));
                }
                _ => self.say(format!("'{first} {second}' is not accepted here."))?,
            }
        }
    }

    /// A bare token such as a file name.
    pub fn ask_word(&mut self, question: &str) -> Result<String> {
        self.say(question)?;
        let word = self.next_token()?;
        self.say(&word)?;
        Ok(word)
    }
}
