//! Flat text grid files: one integer per line, x fastest, then y, then z.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::analysis::DistanceBin;
use crate::catalog::MAX_PARTICLE_CELL;
use crate::error::{Error, Result};
use crate::lattice::{Cell, Phase, VoxelGrid, EMPTY_CELL};

/// Default file name of the distance profile written by the interactive tool.
pub const DISTANCE_PROFILE_FILE: &str = "agglist.out";

/// Column order of the distance profile; anhydrite precedes hemihydrate.
const PROFILE_COLUMNS: [Phase; 11] = [
    Phase::Porosity,
    Phase::Cement,
    Phase::C2S,
    Phase::Gypsum,
    Phase::Anhydrite,
    Phase::Hemihydrate,
    Phase::Pozzolan,
    Phase::Inert,
    Phase::Slag,
    Phase::CalciumCarbonate,
    Phase::FlyAsh,
];

/// Which lattice a grid file holds; decides the accepted value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Phase codes.
    Phase,
    /// Empty, aggregate sentinel, or encoded particle ids up to [`MAX_PARTICLE_CELL`].
    Particle,
}

impl GridKind {
    fn accepts(self, value: u16) -> bool {
        match self {
            GridKind::Phase => u8::try_from(value)
                .ok()
                .and_then(Phase::from_code)
                .is_some(),
            GridKind::Particle => {
                value <= MAX_PARTICLE_CELL && !matches!(Cell::decode(value), Cell::Unknown(_))
            }
        }
    }
}

/// Writes the phase grid.
pub fn write_phase_grid<W: Write>(grid: &VoxelGrid, out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    for &code in grid.phases() {
        writeln!(out, "{code}")?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the particle grid, replacing values that name nothing with 0.
///
/// Returns the number of replaced voxels.
pub fn write_particle_grid<W: Write>(grid: &VoxelGrid, out: W) -> Result<usize> {
    let mut out = BufWriter::new(out);
    let mut clamped = 0;
    for &value in grid.particles() {
        let value = if GridKind::Particle.accepts(value) {
            value
        } else {
            clamped += 1;
            EMPTY_CELL
        };
        writeln!(out, "{value}")?;
    }
    out.flush()?;
    if clamped > 0 {
        warn!("Wrote {} invalid particle cells as 0.", clamped);
    }
    Ok(clamped)
}

/// Writes both lattices to the given paths.
pub fn save_grids(
    grid: &VoxelGrid,
    phase_path: impl AsRef<Path>,
    particle_path: impl AsRef<Path>,
) -> Result<()> {
    let phase_path = phase_path.as_ref();
    let particle_path = particle_path.as_ref();
    write_phase_grid(grid, File::create(phase_path)?)?;
    write_particle_grid(grid, File::create(particle_path)?)?;
    info!(
        "Saved microstructure to {} and particle ids to {}.",
        phase_path.display(),
        particle_path.display()
    );
    Ok(())
}

/// Reads exactly `edge³` values of `kind` from a grid file.
///
/// Blank lines are skipped. Missing values, extra values, and out-of-range values are
/// reported with their line number.
pub fn read_grid<R: BufRead>(reader: R, edge: usize, kind: GridKind) -> Result<Vec<u16>> {
    let expected = edge * edge * edge;
    let mut values = Vec::with_capacity(expected);
    let mut last_line = 0;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        last_line = line_no;
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        if values.len() == expected {
            return Err(Error::GridFormat {
                line: line_no,
                message: format!("more than {expected} values"),
            });
        }
        let value: u16 = token.parse().map_err(|_| Error::GridFormat {
            line: line_no,
            message: format!("'{token}' is not a grid value"),
        })?;
        if !kind.accepts(value) {
            return Err(Error::GridFormat {
                line: line_no,
                message: format!("value {value} is out of range for a {kind:?} grid"),
            });
        }
        values.push(value);
    }

    if values.len() < expected {
        return Err(Error::GridFormat {
            line: last_line + 1,
            message: format!("expected {expected} values, found {}", values.len()),
        });
    }
    Ok(values)
}

/// Loads both lattices of edge `edge` from disk.
pub fn load_grids(
    phase_path: impl AsRef<Path>,
    particle_path: impl AsRef<Path>,
    edge: usize,
) -> Result<VoxelGrid> {
    let phases = read_grid(
        BufReader::new(File::open(phase_path.as_ref())?),
        edge,
        GridKind::Phase,
    )?;
    let particles = read_grid(
        BufReader::new(File::open(particle_path.as_ref())?),
        edge,
        GridKind::Particle,
    )?;
    // `read_grid` only accepts phase codes, which all fit in a byte.
    let phases = phases.into_iter().map(|v| v as u8).collect();
    VoxelGrid::from_raw(edge, phases, particles)
}

/// Writes a distance profile as a header line and one row per distance.
pub fn write_distance_profile<W: Write>(bins: &[DistanceBin], out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    write!(out, "Distance")?;
    for phase in PROFILE_COLUMNS {
        write!(out, "  {}", phase.name())?;
    }
    writeln!(out)?;
    for bin in bins {
        write!(out, "{}", bin.distance)?;
        for phase in PROFILE_COLUMNS {
            write!(out, "  {}", bin.tally.count(phase))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
