#![forbid(unsafe_code)]
//! Interactive driver: `micropack [EDGE]`, then answer the prompts on stdin.
mod menu;
mod prompt;

use std::io;

use anyhow::{bail, Context, Result};
use micropack::lattice::DEFAULT_EDGE;
use tracing::info;

use crate::menu::Session;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn edge_from_args() -> Result<usize> {
    let mut args = std::env::args().skip(1);
    let edge = match args.next() {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("lattice edge must be a positive integer, got '{arg}'"))?,
        None => DEFAULT_EDGE,
    };
    if args.next().is_some() {
        bail!("usage: micropack [EDGE]");
    }
    Ok(edge)
}

fn main() -> Result<()> {
    init_tracing();
    let edge = edge_from_args()?;
    info!("Starting with a {}³ lattice.", edge);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::start(stdin.lock(), stdout.lock(), edge)?;
    session.run()?;
    info!(
        "Finished with {} particles.",
        session.state().catalog().len()
    );
    Ok(())
}
