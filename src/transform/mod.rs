//! Core machinery of the two-pass AO→MO transformation: shell-pair
//! indexing, buffer-fill strategies, and basis-rotation strategies.

use std::error::Error;
use std::fmt;

pub mod fill;
pub mod pair;
pub mod reference;
pub mod rotation;

// =================
// Error definitions
// =================

/// Error arising from caller-supplied ranges or buffers inconsistent with the
/// basis description or with each other. Detected before parallel dispatch
/// and fatal to the enclosing driver call.
#[derive(Debug, Clone)]
pub struct DimensionMismatchError(pub String);

impl fmt::Display for DimensionMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Dimension mismatch: {}", self.0)
    }
}

impl Error for DimensionMismatchError {}
