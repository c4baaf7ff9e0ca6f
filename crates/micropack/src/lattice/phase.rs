//! Phase identifiers stored in the phase grid.
//!
//! [`Phase`] is the closed set of materials a voxel can hold. The numeric codes returned by
//! [`Phase::code`] are the values persisted in grid files and must stay stable.
use std::fmt;

use crate::error::{Error, Result};

/// Material held by a voxel.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Porosity,
    /// Clinker; cement classes may be re-assigned to one of the calcium sulfates at placement.
    Cement,
    C2S,
    Gypsum,
    Hemihydrate,
    Anhydrite,
    Pozzolan,
    Inert,
    Slag,
    CalciumCarbonate,
    Aggregate,
    FlyAsh,
}

impl Phase {
    pub const ALL: [Phase; 12] = [
        Phase::Porosity,
        Phase::Cement,
        Phase::C2S,
        Phase::Gypsum,
        Phase::Hemihydrate,
        Phase::Anhydrite,
        Phase::Pozzolan,
        Phase::Inert,
        Phase::Slag,
        Phase::CalciumCarbonate,
        Phase::Aggregate,
        Phase::FlyAsh,
    ];

    /// Phases a size class may request.
    pub const PLACEABLE: [Phase; 10] = [
        Phase::Cement,
        Phase::C2S,
        Phase::Gypsum,
        Phase::Hemihydrate,
        Phase::Anhydrite,
        Phase::Pozzolan,
        Phase::Inert,
        Phase::Slag,
        Phase::CalciumCarbonate,
        Phase::FlyAsh,
    ];

    /// Persisted integer code.
    pub const fn code(self) -> u8 {
        match self {
            Phase::Porosity => 0,
            Phase::Cement => 1,
            Phase::C2S => 2,
            Phase::Gypsum => 5,
            Phase::Hemihydrate => 6,
            Phase::Anhydrite => 7,
            Phase::Pozzolan => 8,
            Phase::Inert => 9,
            Phase::Slag => 10,
            Phase::CalciumCarbonate => 26,
            Phase::Aggregate => 28,
            Phase::FlyAsh => 30,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Position of this phase in [`Phase::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Phase::Porosity => "Porosity",
            Phase::Cement => "Cement",
            Phase::C2S => "C2S",
            Phase::Gypsum => "Gypsum",
            Phase::Hemihydrate => "Hemihydrate",
            Phase::Anhydrite => "Anhydrite",
            Phase::Pozzolan => "Pozzolan",
            Phase::Inert => "Inert",
            Phase::Slag => "Slag",
            Phase::CalciumCarbonate => "CaCO3",
            Phase::Aggregate => "Aggregate",
            Phase::FlyAsh => "Fly Ash",
        }
    }

    pub fn is_placeable(self) -> bool {
        Self::PLACEABLE.contains(&self)
    }

    pub fn is_sulfate(self) -> bool {
        matches!(self, Phase::Gypsum | Phase::Hemihydrate | Phase::Anhydrite)
    }
}

impl TryFrom<u8> for Phase {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Phase::from_code(code).ok_or(Error::UnknownPhase { code })
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.code()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
