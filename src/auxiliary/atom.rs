//! Atoms in the basis description.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A structure storing a classical atom: the charge centre a group of basis
/// shells is attached to. The atom table is read-only for the lifetime of a
/// transformation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Atom {
    /// The atomic number of the atom.
    pub atomic_number: u32,

    /// The position of the atom in Bohr.
    pub coordinates: Point3<f64>,
}

impl Atom {
    /// Constructs a new atom at the specified position.
    ///
    /// # Arguments
    ///
    /// * `atomic_number` - The atomic number of the atom.
    /// * `coordinates` - The position of the atom in Bohr.
    pub fn new(atomic_number: u32, coordinates: Point3<f64>) -> Self {
        Self {
            atomic_number,
            coordinates,
        }
    }
}
