//! Basis description: shell tables and the derived AO-offset map.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auxiliary::atom::Atom;


// =================
// Error definitions
// =================

/// Error arising from a malformed atom or shell table. Detected once at
/// construction and fatal to the whole run.
#[derive(Debug, Clone)]
pub struct InvalidBasisError(pub String);

impl fmt::Display for InvalidBasisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid basis: {}", self.0)
    }
}

impl Error for InvalidBasisError {}

// ==================
// Struct definitions
// ==================

// ~~~~~~~~~~~~~~~~~~~
// GaussianContraction
// ~~~~~~~~~~~~~~~~~~~

/// A structure to handle primitives in a Gaussian contraction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaussianContraction {
    /// Constituent primitives in the contraction. Each primitive has the form
    /// $`c\exp\left[-\alpha\lvert \mathbf{r} - \mathbf{R} \rvert^2\right]`$ and is characterised
    /// by a tuple of its exponent $`\alpha`$ and coefficient $`c`$, respectively.
    pub primitives: Vec<(f64, f64)>,
}

impl GaussianContraction {
    /// The number of primitive Gaussians in this contraction.
    pub fn contraction_length(&self) -> usize {
        self.primitives.len()
    }
}

// ~~~~~~~~~
// ShellKind
// ~~~~~~~~~

/// An enumerated type indicating whether the functions in a shell are pure
/// (solid-harmonic) or Cartesian Gaussians, which determines the number of
/// functions the shell contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellKind {
    /// Variant for pure shells with $`2l + 1`$ functions.
    Pure,

    /// Variant for Cartesian shells with $`(l + 1)(l + 2)/2`$ functions.
    Cartesian,
}

// ~~~~~~~~~~
// BasisShell
// ~~~~~~~~~~

/// A structure representing one shell in the basis description: a group of
/// basis functions sharing a centre and an angular momentum. A generally
/// contracted shell carries several contracted radial functions, each of
/// which contributes a full set of angular functions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasisShell {
    /// The angular momentum $`l`$ of this shell.
    pub l: u32,

    /// The pure or Cartesian nature of the functions in this shell.
    pub kind: ShellKind,

    /// Index of the atom this shell is centred on.
    pub atom_index: usize,

    /// The contracted radial functions of this shell.
    pub contractions: Vec<GaussianContraction>,
}

impl BasisShell {
    /// Constructs a new shell with a single contraction.
    ///
    /// # Arguments
    ///
    /// * `l` - The angular momentum of the shell.
    /// * `kind` - Pure or Cartesian.
    /// * `atom_index` - Index of the owning atom in the atom table.
    /// * `contraction` - The Gaussian contraction.
    pub fn new(l: u32, kind: ShellKind, atom_index: usize, contraction: GaussianContraction) -> Self {
        Self {
            l,
            kind,
            atom_index,
            contractions: vec![contraction],
        }
    }

    /// Constructs a new generally contracted shell.
    pub fn new_general(
        l: u32,
        kind: ShellKind,
        atom_index: usize,
        contractions: Vec<GaussianContraction>,
    ) -> Self {
        Self {
            l,
            kind,
            atom_index,
            contractions,
        }
    }

    /// The number of angular functions per contraction.
    pub fn angular_width(&self) -> usize {
        let l = self.l as usize;
        match self.kind {
            ShellKind::Pure => 2 * l + 1,
            ShellKind::Cartesian => (l + 1) * (l + 2) / 2,
        }
    }

    /// The number of basis functions in this shell.
    pub fn n_funcs(&self) -> usize {
        self.contractions.len() * self.angular_width()
    }
}

// ~~~~~~~~
// BasisSet
// ~~~~~~~~

/// A structure containing the full basis description for a transformation
/// run: the atom table, the shell table, and the derived AO-offset map giving
/// the first AO index and the width of every shell.
///
/// A `BasisSet` is immutable once constructed and is shared read-only by all
/// parallel workers of the transformation drivers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasisSet {
    /// The atom table.
    atoms: Vec<Atom>,

    /// The shell table.
    shells: Vec<BasisShell>,

    /// The AO-offset map: `ao_loc[s]` is the first AO index contributed by
    /// shell `s`, and `ao_loc[nbas]` the total AO count.
    ao_loc: Vec<usize>,
}

impl BasisSet {
    /// Validates the atom and shell tables and constructs the basis
    /// description together with its AO-offset map.
    ///
    /// # Arguments
    ///
    /// * `atoms` - The atom table.
    /// * `shells` - The shell table.
    ///
    /// # Errors
    ///
    /// [`InvalidBasisError`] if the shell table is empty, any shell has an
    /// empty contraction or non-finite primitives, or any shell refers to an
    /// atom outside the atom table.
    pub fn new(atoms: Vec<Atom>, shells: Vec<BasisShell>) -> Result<Self, InvalidBasisError> {
        if shells.is_empty() {
            return Err(InvalidBasisError("empty shell table.".to_string()));
        }
        for (s, shell) in shells.iter().enumerate() {
            if shell
                .contractions
                .iter()
                .any(|contraction| contraction.contraction_length() == 0)
            {
                return Err(InvalidBasisError(format!(
                    "shell {s} has an empty contraction."
                )));
            }
            if shell
                .contractions
                .iter()
                .flat_map(|contraction| contraction.primitives.iter())
                .any(|(a, c)| !a.is_finite() || !c.is_finite())
            {
                return Err(InvalidBasisError(format!(
                    "shell {s} has non-finite primitives."
                )));
            }
            if shell.atom_index >= atoms.len() {
                return Err(InvalidBasisError(format!(
                    "shell {s} refers to atom {} outside the atom table of length {}.",
                    shell.atom_index,
                    atoms.len()
                )));
            }
            if shell.n_funcs() == 0 {
                return Err(InvalidBasisError(format!("shell {s} has zero width.")));
            }
        }
        let mut ao_loc = Vec::with_capacity(shells.len() + 1);
        ao_loc.push(0);
        for shell in shells.iter() {
            let last = *ao_loc
                .last()
                .expect("The AO-offset map is never empty here.");
            ao_loc.push(last + shell.n_funcs());
        }
        Ok(Self {
            atoms,
            shells,
            ao_loc,
        })
    }

    /// The atom table.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// The shell table.
    pub fn shells(&self) -> &[BasisShell] {
        &self.shells
    }

    /// The number of shells.
    pub fn nbas(&self) -> usize {
        self.shells.len()
    }

    /// The total number of AO basis functions.
    pub fn nao(&self) -> usize {
        *self
            .ao_loc
            .last()
            .expect("The AO-offset map is never empty.")
    }

    /// The AO-offset map, of length `nbas + 1`.
    pub fn ao_loc(&self) -> &[usize] {
        &self.ao_loc
    }

    /// The first AO index contributed by shell `s`.
    pub fn shell_start(&self, s: usize) -> usize {
        self.ao_loc[s]
    }

    /// The number of basis functions in shell `s`.
    pub fn shell_width(&self, s: usize) -> usize {
        self.ao_loc[s + 1] - self.ao_loc[s]
    }
}
