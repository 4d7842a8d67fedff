//! The per-frame gesture alphabet and the rule that folds two eyes' gaze and
//! a blink into one symbol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gaze::GazeDirection;

/// One discrete reading per frame.
///
/// `None` means the frame gave no reliable reading; it is never part of an
/// enrolled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureSymbol {
    Left,
    Right,
    Center,
    Blink,
    None,
}

impl GestureSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
            Self::Blink => "blink",
            Self::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for GestureSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown gesture symbol '{0}'")]
pub struct UnknownSymbol(pub String);

impl FromStr for GestureSymbol {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            "blink" => Ok(Self::Blink),
            "none" => Ok(Self::None),
            _ => Err(UnknownSymbol(s.to_string())),
        }
    }
}

impl From<GazeDirection> for GestureSymbol {
    fn from(dir: GazeDirection) -> Self {
        match dir {
            GazeDirection::Left => Self::Left,
            GazeDirection::Right => Self::Right,
            GazeDirection::Center => Self::Center,
        }
    }
}

/// Merge both eyes' directions and this frame's blink event into one symbol.
///
/// Precedence: blink, then either eye left, then either eye right, then both
/// eyes center. Anything else (including no face) is `None`.
pub fn resolve(
    left: Option<GazeDirection>,
    right: Option<GazeDirection>,
    blinked: bool,
) -> GestureSymbol {
    use crate::gaze::GazeDirection as G;

    if blinked {
        return GestureSymbol::Blink;
    }
    match (left, right) {
        (Some(G::Left), _) | (_, Some(G::Left)) => GestureSymbol::Left,
        (Some(G::Right), _) | (_, Some(G::Right)) => GestureSymbol::Right,
        (Some(G::Center), Some(G::Center)) => GestureSymbol::Center,
        _ => GestureSymbol::None,
    }
}
