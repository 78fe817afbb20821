//! Choice of the missing mass window from the target material

use crate::{cuttable::BoundPair, numeric::Float};

use std::fmt::{self, Display};

/// Missing mass window of hydrogen-like targets (GeV)
const MM_WINDOW_LH2: BoundPair = BoundPair {
    low: 0.90,
    high: 0.98,
};

/// Missing mass window of the deuterium target (GeV)
const MM_WINDOW_LD2: BoundPair = BoundPair {
    low: 0.88,
    high: 1.04,
};

/// Material struck by the beam
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// Liquid hydrogen
    LH2,

    /// Liquid deuterium
    LD2,

    /// 10 cm aluminium dummy
    Dummy10cm,

    /// Anything else, analysed as liquid hydrogen
    Unrecognized(String),
}
//
impl Target {
    /// Interpret a target name given on the command line (case-sensitive)
    pub fn parse(name: &str) -> Self {
        match name {
            "LH2" => Target::LH2,
            "LD2" => Target::LD2,
            "Dummy10cm" => Target::Dummy10cm,
            other => Target::Unrecognized(other.to_owned()),
        }
    }

    /// Window on the pion missing mass, applied with strict inequalities
    ///
    /// Unrecognized targets fall back to the liquid hydrogen window, which is
    /// reported as a warning.
    ///
    pub fn missing_mass_window(&self) -> BoundPair {
        match self {
            Target::LH2 | Target::Dummy10cm => MM_WINDOW_LH2,
            Target::LD2 => MM_WINDOW_LD2,
            Target::Unrecognized(name) => {
                log::warn!(
                    "Target type {name:?} not recognized, defaulting to the LH2 missing mass \
                     window ({}, {})",
                    MM_WINDOW_LH2.low,
                    MM_WINDOW_LH2.high
                );
                MM_WINDOW_LH2
            }
        }
    }

    /// Truth that the default window is used for lack of a known target
    pub fn is_fallback(&self) -> bool {
        matches!(self, Target::Unrecognized(_))
    }
}

impl Display for Target {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::LH2 => write!(fmt, "LH2"),
            Target::LD2 => write!(fmt, "LD2"),
            Target::Dummy10cm => write!(fmt, "Dummy10cm"),
            Target::Unrecognized(name) => write!(fmt, "{name}"),
        }
    }
}

/// Check whether a missing mass lies strictly inside of a window
///
/// Values on either edge are rejected, and so are NaNs.
///
pub fn in_window(window: BoundPair, missing_mass: Float) -> bool {
    window.low < missing_mass && missing_mass < window.high
}
