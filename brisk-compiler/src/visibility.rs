// Visibility lattice for export inference
// How much of a referenced declaration the current context reveals

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Visibility {
    /// Fully revealed: the referenced declaration must be exported as well
    Transparent,
    /// Revealed by name only: hidden declarations may be exported opaquely
    Semitransparent,
    /// Not revealed at all
    Invisible,
}

impl Visibility {
    /// Used for compile-time values embedded in a type, e.g. array sizes
    pub fn strengthen(self) -> Self {
        match self {
            Visibility::Semitransparent => Visibility::Transparent,
            other => other,
        }
    }

    /// Used before descending into a subprogram body
    pub fn weaken(self) -> Self {
        match self {
            Visibility::Semitransparent => Visibility::Invisible,
            other => other,
        }
    }

    /// Seed for a top-level value (constants, params, module variables)
    pub fn for_value(exposed: bool) -> Self {
        if exposed {
            Visibility::Transparent
        } else {
            Visibility::Invisible
        }
    }

    /// Seed for a top-level type, subprogram or prototype
    pub fn for_declaration(exposed: bool) -> Self {
        if exposed {
            Visibility::Semitransparent
        } else {
            Visibility::Invisible
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Transparent => write!(f, "transparent"),
            Visibility::Semitransparent => write!(f, "semitransparent"),
            Visibility::Invisible => write!(f, "invisible"),
        }
    }
}
