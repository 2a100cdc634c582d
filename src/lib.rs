//! # ao2mo: AO→MO two-electron integral transformation
//!
//! `ao2mo` transforms two-electron repulsion integrals from an atomic-orbital
//! (AO) basis to a molecular-orbital (MO) basis. The transformation is carried
//! out in two passes: a *half transform* that evaluates raw AO integral blocks
//! shell quadruplet by shell quadruplet and rotates one index pair into the MO
//! basis, and a *full transform* that rotates the remaining AO index pair. The
//! four-index rotation dominates the cost of most post-mean-field methods, so
//! the drivers here centre on
//! - shell-quartet batching with permutation symmetry, so that no
//!   symmetry-equivalent integral block is evaluated twice,
//! - lock-free data parallelism over independent shell-pair blocks, and
//! - pluggable strategies for integral evaluation, screening, and basis
//!   rotation, resolved once per driver call.
//!
//! The integral engine itself is *not* part of this crate: anything
//! implementing [`integrals::IntegralSource`] can feed the drivers, from a
//! full Gaussian integral library to a precomputed tensor
//! ([`integrals::TabulatedEri`]).
//!
//! ## Entry points
//!
//! Three drivers cover the transformation, each following the
//! [`drivers::EriDriver`] pattern of a parameter structure, capability
//! references, and a `run`/`result` pair:
//! - [`drivers::ao_fill::AoFillDriver`]: first pass without rotation,
//!   producing the shell-pair-blocked raw AO buffer;
//! - [`drivers::half_transform::HalfTransformDriver`]: first pass fused with
//!   the bra-pair rotation, producing the half-transformed intermediate;
//! - [`drivers::full_transform::FullTransformDriver`]: second pass, rotating
//!   the ket AO pair of the intermediate into the requested MO windows.

pub mod auxiliary;
pub mod basis;
pub mod drivers;
pub mod integrals;
pub mod transform;
