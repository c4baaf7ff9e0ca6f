//! The numbered menu loop and one handler per entry.
use std::fs::File;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use micropack::io::{write_distance_profile, DISTANCE_PROFILE_FILE};
use micropack::lattice::MAX_TABLE_RADIUS;
use micropack::placement::MAX_SIZE_CLASSES;
use micropack::prelude::*;

use crate::prompt::Prompter;

const MENU: &str = "
 Input User Choice
1) Exit
2) Add spherical particles (cement, gypsum, pozzolans, etc.) to microstructure
3) Flocculate system by reducing number of particle clusters
4) Measure global phase fractions
5) Add an aggregate to the microstructure
6) Measure single phase connectivity (pores or solids)
7) Measure phase fractions vs. distance from aggregate surface
8) Output current microstructure to file";

/// One interactive session over a single microstructure.
pub struct Session<R, W> {
    prompter: Prompter<R, W>,
    state: Microstructure,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Asks for the seed and builds an empty lattice of edge `edge`.
    pub fn start(input: R, output: W, edge: usize) -> Result<Self> {
        let mut prompter = Prompter::new(input, output);
        let seed: i32 = prompter.ask(
            "Enter random number seed value (a negative integer)",
            |s| *s != 0,
        )?;
        let state = Microstructure::new(edge, seed)?;
        Ok(Self { prompter, state })
    }

    pub fn state(&self) -> &Microstructure {
        &self.state
    }

    /// Runs the menu until the user picks exit.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let choice: u32 = self.prompter.ask(MENU, |_| true)?;
            match choice {
                1 => return Ok(()),
                2 => self.place()?,
                3 => self.flocculate()?,
                4 => self.tally()?,
                5 => self.aggregate()?,
                6 => self.connectivity()?,
                7 => self.distance_profile()?,
                8 => self.save()?,
                _ => {}
            }
        }
    }

    fn place(&mut self) -> Result<()> {
        let edge = self.state.edge() as i32;
        let p = &mut self.prompter;
        let classes: usize = p.ask(
            &format!("Enter number of different size spheres to use (max. is {MAX_SIZE_CLASSES})"),
            |n| *n <= MAX_SIZE_CLASSES,
        )?;
        let dispersion: i32 = p.ask(
            "Enter dispersion factor (separation distance in pixels) for spheres (0-2)\n\
             0 corresponds to totally random placement",
            |d| (0..=2).contains(d),
        )?;
        let gypsum: f32 = p.ask(
            "Enter probability for gypsum particles on a random particle basis (0.0-1.0)",
            |g| (0.0..=1.0).contains(g),
        )?;
        let (hemihydrate, anhydrite): (f32, f32) = p.ask_pair(
            "Enter probabilities for hemihydrate and anhydrite forms of gypsum (0.0-1.0)",
            |h, a| (0.0..=1.0).contains(h) && (0.0..=1.0).contains(a) && h + a <= 1.001,
        )?;
        if classes == 0 {
            return Ok(());
        }

        let phases: Vec<String> = Phase::PLACEABLE
            .iter()
            .map(|ph| format!("{}- {}", ph.code(), ph.name()))
            .collect();
        p.say("Enter number, radius, and phase ID for each sphere class (largest radius 1st)")?;
        p.say(format!("Phases are {}", phases.join(", ")))?;

        // The dispersion shell counts against the sphere table limit.
        let max_radius = (edge / 3).min(MAX_TABLE_RADIUS - dispersion);
        let mut size_classes = Vec::with_capacity(classes);
        for i in 1..=classes {
            let count: u32 = p.ask(&format!("Enter number of spheres of class {i}"), |_| true)?;
            let radius: i32 = p.ask(
                &format!("Enter radius of spheres of class {i}\n(Integer <={max_radius} please)"),
                |r| (1..=max_radius).contains(r),
            )?;
            let code: u8 = p.ask(&format!("Enter phase of spheres of class {i}"), |c| {
                Phase::from_code(*c).is_some_and(Phase::is_placeable)
            })?;
            let phase = Phase::try_from(code)?;
            size_classes.push(SizeClass::new(count, radius, phase));
        }

        let config = PlacementConfig::new(dispersion)
            .with_gypsum_probability(gypsum)
            .with_sulfate_split(hemihydrate, anhydrite);
        let report = PlacementEngine::try_new(config)?.run(&mut self.state, &size_classes)?;
        p.say(format!(
            "Placed {} spheres ({} sulfate voxels of {} cement voxels).",
            report.placed_count(),
            report.sulfate.placed_sulfate,
            report.sulfate.placed_total
        ))
    }

    fn flocculate(&mut self) -> Result<()> {
        let target: usize = self.prompter.ask(
            "Enter number of flocs desired at end of routine (>0)",
            |n| *n > 0,
        )?;
        let report = FlocculationEngine::try_new(FlocConfig::new(target))?.run(&mut self.state)?;
        self.prompter.say(format!(
            "Number of clusters is {} after {} rounds",
            report.clusters_remaining, report.rounds
        ))
    }

    fn tally(&mut self) -> Result<()> {
        let tally = PhaseTally::measure(self.state.grid());
        self.prompter.say("\n Phase counts are:")?;
        for (phase, count) in tally.iter() {
            self.prompter.say(format!("{}= {}", phase.name(), count))?;
        }
        Ok(())
    }

    fn aggregate(&mut self) -> Result<()> {
        let limit = self.state.edge().saturating_sub(2);
        let thickness: usize = self.prompter.ask(
            "Enter thickness of aggregate to place (an even integer)",
            |t| t % 2 == 0 && *t <= limit,
        )?;
        insert_slab(&mut self.state, thickness)?;
        Ok(())
    }

    fn connectivity(&mut self) -> Result<()> {
        let code: u8 = self.prompter.ask(
            "Enter phase to analyze 0) pores 1) Solids",
            |c| PhaseSelector::from_code(*c).is_some(),
        )?;
        let selector = PhaseSelector::from_code(code).unwrap_or(PhaseSelector::Porosity);
        let result = connectivity(self.state.grid_mut(), selector)?;
        let p = &mut self.prompter;
        p.say(format!("Phase ID= {}", selector.code()))?;
        p.say(format!(
            "Number accessible from top= {}",
            result.accessible_from_top
        ))?;
        p.say(format!(
            "Number contained in through pathways= {}",
            result.through
        ))
    }

    fn distance_profile(&mut self) -> Result<()> {
        let Some(slab) = self.state.aggregate() else {
            return self.prompter.say("No aggregate present.");
        };
        let bins = distance_profile(self.state.grid(), slab);
        write_distance_profile(&bins, self.prompter.output())?;
        let file = File::create(DISTANCE_PROFILE_FILE)
            .with_context(|| format!("cannot create {DISTANCE_PROFILE_FILE}"))?;
        write_distance_profile(&bins, file)?;
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let phase_path = self
            .prompter
            .ask_word("Enter name of file to save microstructure to")?;
        let particle_path = self
            .prompter
            .ask_word("Enter name of file to save particle IDs to")?;
        save_grids(self.state.grid(), &phase_path, &particle_path)
            .with_context(|| format!("cannot write {phase_path} / {particle_path}"))?;
        Ok(())
    }
}
