//! Shell-pair screening capabilities.
//!
//! Screening is purely advisory: skipping a shell pair never changes the
//! correctness of the transformation, only its cost, since skipped pairs are
//! treated as contributing all-zero integral blocks.

use ndarray::Array2;

use crate::basis::BasisSet;
use crate::integrals::{IntegralEvaluationError, IntegralSource, ShellQuadruplet};

#[cfg(test)]
#[path = "screening_tests.rs"]
mod screening_tests;

// =================
// Trait definitions
// =================

/// Trait defining the screening capability consulted by the transformation
/// drivers before every integral evaluation.
///
/// Implementations are constructed once before parallel dispatch and queried
/// concurrently by all workers; they must therefore be read-only and `Sync`.
pub trait ShellPairScreen: Sync {
    /// Decides whether the shell pair `(ksh, lsh)` can be skipped.
    fn skip(&self, ksh: usize, lsh: usize) -> bool;
}

// ==================
// Struct definitions
// ==================

// ~~~~~~~~~~~
// NoScreening
// ~~~~~~~~~~~

/// A screen that never skips any shell pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoScreening;

impl ShellPairScreen for NoScreening {
    fn skip(&self, _ksh: usize, _lsh: usize) -> bool {
        false
    }
}

// ~~~~~~~~~~~~~~~~
// SchwarzScreening
// ~~~~~~~~~~~~~~~~

/// A screen based on the Schwarz bound
/// $`|(ij|kl)| \le \sqrt{(ij|ij)}\sqrt{(kl|kl)}`$.
///
/// The per-pair bounds $`q_{ij} = \sqrt{\max |(ij|ij)|}`$ are computed once
/// from the diagonal integral blocks at construction; a pair is skipped when
/// the largest quadruplet it can participate in falls below the threshold.
#[derive(Clone, Debug)]
pub struct SchwarzScreening {
    /// The symmetric matrix of per-shell-pair bounds $`q_{ij}`$.
    q: Array2<f64>,

    /// The largest entry of [`Self::q`].
    q_max: f64,

    /// Quadruplets bounded below this value are skipped.
    threshold: f64,
}

impl SchwarzScreening {
    /// Builds the Schwarz bounds from the diagonal blocks $`(kl|kl)`$ of the
    /// given integral source.
    ///
    /// # Arguments
    ///
    /// * `source` - The integral source to bound.
    /// * `basis` - The basis description.
    /// * `threshold` - Quadruplets bounded below this value are skipped.
    pub fn build(
        source: &dyn IntegralSource,
        basis: &BasisSet,
        threshold: f64,
    ) -> Result<Self, IntegralEvaluationError> {
        source.prepare(basis)?;
        let nbas = basis.nbas();
        let mut q = Array2::<f64>::zeros((nbas, nbas));
        for ksh in 0..nbas {
            for lsh in 0..=ksh {
                let block =
                    source.eri_block(ShellQuadruplet::new(ksh, lsh, ksh, lsh), 1, basis)?;
                let bound = block
                    .iter()
                    .fold(0.0_f64, |acc, v| acc.max(v.abs()))
                    .sqrt();
                q[(ksh, lsh)] = bound;
                q[(lsh, ksh)] = bound;
            }
        }
        let q_max = q.iter().fold(0.0_f64, |acc, v| acc.max(*v));
        Ok(Self {
            q,
            q_max,
            threshold,
        })
    }

    /// The per-shell-pair bound matrix.
    pub fn bounds(&self) -> &Array2<f64> {
        &self.q
    }
}

impl ShellPairScreen for SchwarzScreening {
    fn skip(&self, ksh: usize, lsh: usize) -> bool {
        self.q[(ksh, lsh)] * self.q_max < self.threshold
    }
}
