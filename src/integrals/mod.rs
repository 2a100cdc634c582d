//! Integral-source capabilities feeding the transformation drivers.
//!
//! The integral engine is an external collaborator of the transformation: the
//! drivers only require something implementing [`IntegralSource`], which
//! produces one contiguous block of raw AO integrals per shell quadruplet.
//! [`TabulatedEri`] adapts a precomputed dense AO tensor to this interface.

use std::error::Error;
use std::fmt;

use ndarray::{s, Array4, Array5};

use crate::basis::BasisSet;

pub mod screening;


// =================
// Error definitions
// =================

/// Error arising from the evaluation of an integral block for a specific
/// shell quadruplet. Propagated as a fatal failure of the enclosing driver
/// call: no retry, no partial results.
#[derive(Debug, Clone)]
pub struct IntegralEvaluationError(pub String);

impl fmt::Display for IntegralEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Integral evaluation failed: {}", self.0)
    }
}

impl Error for IntegralEvaluationError {}

// ==================
// Struct definitions
// ==================

/// A tuple of four shell indices identifying one raw-integral block
/// $`(ij|kl)`$. Quadruplets are transient: they are generated by the
/// iteration schedule of the drivers and never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShellQuadruplet {
    /// The first bra shell.
    pub i: usize,

    /// The second bra shell.
    pub j: usize,

    /// The first ket shell.
    pub k: usize,

    /// The second ket shell.
    pub l: usize,
}

impl ShellQuadruplet {
    /// Constructs a quadruplet from its four shell indices.
    pub fn new(i: usize, j: usize, k: usize, l: usize) -> Self {
        Self { i, j, k, l }
    }
}

impl fmt::Display for ShellQuadruplet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({} {}|{} {})", self.i, self.j, self.k, self.l)
    }
}

// =================
// Trait definitions
// =================

/// Trait defining the integral-evaluation capability required by the
/// transformation drivers.
///
/// Implementations must be callable concurrently from independent worker
/// threads with disjoint quadruplets; any internal evaluation cache must be
/// constructed in [`Self::prepare`], which the drivers invoke exactly once
/// before parallel dispatch, and be read-only thereafter.
pub trait IntegralSource: Sync {
    /// Performs any one-off initialisation of internal evaluation state.
    /// Called once by the drivers before parallel dispatch; the default does
    /// nothing.
    fn prepare(&self, _basis: &BasisSet) -> Result<(), IntegralEvaluationError> {
        Ok(())
    }

    /// Evaluates the raw integral block for one shell quadruplet.
    ///
    /// # Arguments
    ///
    /// * `quartet` - The shell quadruplet $`(ij|kl)`$.
    /// * `ncomp` - The number of components per integral (more than one for
    ///   derivative-like integral sets).
    /// * `basis` - The basis description.
    ///
    /// # Returns
    ///
    /// The block as an array of shape `(ncomp, wi, wj, wk, wl)` where `wx` is
    /// the width of shell `x`. The block is exclusively owned by the calling
    /// worker until consumed by the fill strategy.
    fn eri_block(
        &self,
        quartet: ShellQuadruplet,
        ncomp: usize,
        basis: &BasisSet,
    ) -> Result<Array5<f64>, IntegralEvaluationError>;
}

// ~~~~~~~~~~~~
// TabulatedEri
// ~~~~~~~~~~~~

/// An [`IntegralSource`] backed by a precomputed dense AO integral tensor.
///
/// This serves callers that already hold their AO integrals in memory and
/// want to feed them through the same transformation drivers as an on-the-fly
/// integral engine would.
pub struct TabulatedEri {
    /// The AO tensor, of shape `(ncomp, nao, nao, nao, nao)`.
    eri: Array5<f64>,
}

impl TabulatedEri {
    /// Wraps a component-stacked AO tensor of shape `(ncomp, nao, nao, nao, nao)`.
    pub fn new(eri: Array5<f64>) -> Self {
        Self { eri }
    }

    /// Wraps a single-component AO tensor of shape `(nao, nao, nao, nao)`.
    pub fn from_dense(eri: Array4<f64>) -> Self {
        let (p, q, r, t) = eri.dim();
        let eri = eri
            .as_standard_layout()
            .into_owned()
            .into_shape((1, p, q, r, t))
            .expect("Reshaping a contiguous dense tensor to one stacked component cannot fail.");
        Self { eri }
    }

    /// The number of components held by this source.
    pub fn ncomp(&self) -> usize {
        self.eri.dim().0
    }
}

impl IntegralSource for TabulatedEri {
    fn prepare(&self, basis: &BasisSet) -> Result<(), IntegralEvaluationError> {
        let nao = basis.nao();
        let dim = self.eri.dim();
        if dim.1 != nao || dim.2 != nao || dim.3 != nao || dim.4 != nao {
            return Err(IntegralEvaluationError(format!(
                "tabulated tensor of shape {dim:?} does not cover a basis of {nao} AOs."
            )));
        }
        Ok(())
    }

    fn eri_block(
        &self,
        quartet: ShellQuadruplet,
        ncomp: usize,
        basis: &BasisSet,
    ) -> Result<Array5<f64>, IntegralEvaluationError> {
        if ncomp != self.ncomp() {
            return Err(IntegralEvaluationError(format!(
                "{ncomp} components requested from a tabulated tensor holding {}.",
                self.ncomp()
            )));
        }
        let (i0, i1) = (basis.shell_start(quartet.i), basis.ao_loc()[quartet.i + 1]);
        let (j0, j1) = (basis.shell_start(quartet.j), basis.ao_loc()[quartet.j + 1]);
        let (k0, k1) = (basis.shell_start(quartet.k), basis.ao_loc()[quartet.k + 1]);
        let (l0, l1) = (basis.shell_start(quartet.l), basis.ao_loc()[quartet.l + 1]);
        Ok(self
            .eri
            .slice(s![.., i0..i1, j0..j1, k0..k1, l0..l1])
            .to_owned())
    }
}
