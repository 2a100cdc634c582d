//! Buffer-fill strategies for the first transformation pass.
//!
//! A fill strategy owns the bra-side storage convention of the raw integral
//! buffer and the scatter of each raw block into the ket AO-pair columns of
//! its shell pair. Both strategies evaluate only bra shell pairs with
//! $`i \ge j`$; the block for such a pair also covers the $`(j, i)`$
//! quadruplet by permutation symmetry, so the stored half is mirrored into
//! the implied symmetric position rather than recomputed.

use itertools::iproduct;
use ndarray::{Array3, ArrayViewMut3, Axis};
use rayon::prelude::*;

use crate::basis::BasisSet;
use crate::integrals::screening::ShellPairScreen;
use crate::integrals::{IntegralSource, ShellQuadruplet};
use crate::transform::pair::{decompose_shell_pair, ket_pair_columns, KetPairLayout};
use crate::transform::DimensionMismatchError;

#[cfg(test)]
#[path = "fill_tests.rs"]
mod fill_tests;

// =================
// Trait definitions
// =================

/// Trait defining how raw integral blocks are placed into the first-pass
/// buffer.
///
/// The parallel fill engine hands each implementation the mutable buffer
/// region of exactly one ket shell pair, shaped
/// `(pair columns, ncomp, bra_len)`; implementations never see, and can never
/// write to, another worker's region.
pub trait FillStrategy: Sync {
    /// The length of the bra dimension of the buffer for a basis of `nao`
    /// functions.
    fn bra_len(&self, nao: usize) -> usize;

    /// Evaluates and scatters all quadruplets of one ket shell pair
    /// `(ksh, lsh)` into the pair's buffer region.
    ///
    /// # Arguments
    ///
    /// * `source` - The integral source.
    /// * `screen` - The advisory bra-pair screen; skipped bra pairs leave
    ///   their buffer entries zero.
    /// * `basis` - The basis description.
    /// * `ksh`, `lsh` - The ket shell pair, with `ksh >= lsh`.
    /// * `ncomp` - The number of components per integral.
    /// * `out` - The buffer region of this shell pair.
    fn fill_shell_pair(
        &self,
        source: &dyn IntegralSource,
        screen: &dyn ShellPairScreen,
        basis: &BasisSet,
        ksh: usize,
        lsh: usize,
        ncomp: usize,
        out: ArrayViewMut3<f64>,
    ) -> Result<(), anyhow::Error>;
}

// ==================
// Struct definitions
// ==================

// ~~~~~~~~~~~~
// DenseBraFill
// ~~~~~~~~~~~~

/// A fill strategy storing the bra dimension densely as an $`n_{\mathrm{AO}}^2`$
/// square. Each stored $`(i, j)`$ value is mirrored into the implied
/// $`(j, i)`$ position.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseBraFill;

impl FillStrategy for DenseBraFill {
    fn bra_len(&self, nao: usize) -> usize {
        nao * nao
    }

    fn fill_shell_pair(
        &self,
        source: &dyn IntegralSource,
        screen: &dyn ShellPairScreen,
        basis: &BasisSet,
        ksh: usize,
        lsh: usize,
        ncomp: usize,
        mut out: ArrayViewMut3<f64>,
    ) -> Result<(), anyhow::Error> {
        let nao = basis.nao();
        let wk = basis.shell_width(ksh);
        let wl = basis.shell_width(lsh);
        let diagonal = ksh == lsh;
        for ish in 0..basis.nbas() {
            for jsh in 0..=ish {
                if screen.skip(ish, jsh) {
                    continue;
                }
                let block = source
                    .eri_block(ShellQuadruplet::new(ish, jsh, ksh, lsh), ncomp, basis)
                    .map_err(anyhow::Error::from)?;
                let i0 = basis.shell_start(ish);
                let j0 = basis.shell_start(jsh);
                let wi = basis.shell_width(ish);
                let wj = basis.shell_width(jsh);
                for (col, ka, lb) in ket_pair_columns(wk, wl, diagonal) {
                    for (c, (a, b)) in iproduct!(0..ncomp, iproduct!(0..wi, 0..wj)) {
                        let v = block[[c, a, b, ka, lb]];
                        out[[col, c, (i0 + a) * nao + (j0 + b)]] = v;
                        if ish != jsh {
                            out[[col, c, (j0 + b) * nao + (i0 + a)]] = v;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// ~~~~~~~~~~~~~
// PackedBraFill
// ~~~~~~~~~~~~~

/// A fill strategy storing only the $`i \ge j`$ triangle of the bra
/// dimension, packed as $`i(i+1)/2 + j`$.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackedBraFill;

impl FillStrategy for PackedBraFill {
    fn bra_len(&self, nao: usize) -> usize {
        nao * (nao + 1) / 2
    }

    fn fill_shell_pair(
        &self,
        source: &dyn IntegralSource,
        screen: &dyn ShellPairScreen,
        basis: &BasisSet,
        ksh: usize,
        lsh: usize,
        ncomp: usize,
        mut out: ArrayViewMut3<f64>,
    ) -> Result<(), anyhow::Error> {
        let wk = basis.shell_width(ksh);
        let wl = basis.shell_width(lsh);
        let diagonal = ksh == lsh;
        for ish in 0..basis.nbas() {
            for jsh in 0..=ish {
                if screen.skip(ish, jsh) {
                    continue;
                }
                let block = source
                    .eri_block(ShellQuadruplet::new(ish, jsh, ksh, lsh), ncomp, basis)
                    .map_err(anyhow::Error::from)?;
                let i0 = basis.shell_start(ish);
                let j0 = basis.shell_start(jsh);
                let wi = basis.shell_width(ish);
                let wj = basis.shell_width(jsh);
                for (col, ka, lb) in ket_pair_columns(wk, wl, diagonal) {
                    for c in 0..ncomp {
                        for a in 0..wi {
                            // On the bra diagonal only the local a >= b
                            // triangle lies in the stored half.
                            let bmax = if ish == jsh { a + 1 } else { wj };
                            for b in 0..bmax {
                                let p = i0 + a;
                                let q = j0 + b;
                                out[[col, c, p * (p + 1) / 2 + q]] = block[[c, a, b, ka, lb]];
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// =========
// Functions
// =========

/// Fills the raw integral buffer for a contiguous range of ket shell pairs,
/// in parallel over the pairs.
///
/// The buffer is zero-initialised and partitioned by the ket-pair column
/// layout into disjoint per-pair regions before dispatch, so workers write
/// without synchronisation. A ket shell pair rejected by the screen leaves
/// its region zero; this is a legitimate zero contribution, not an error.
/// The first worker error observed after the join aborts the whole call.
///
/// # Arguments
///
/// * `source` - The integral source; its [`IntegralSource::prepare`] hook is
///   invoked once before dispatch.
/// * `fill` - The fill strategy.
/// * `screen` - The advisory shell-pair screen.
/// * `basis` - The basis description.
/// * `klsh_start`, `klsh_count` - The compound ket shell-pair range.
/// * `ncomp` - The number of components per integral.
///
/// # Returns
///
/// The buffer of shape `(nkl, ncomp, bra_len)` where `nkl` is the number of
/// AO-pair columns covered by the requested range.
pub fn fill_shell_pair_range(
    source: &dyn IntegralSource,
    fill: &dyn FillStrategy,
    screen: &dyn ShellPairScreen,
    basis: &BasisSet,
    klsh_start: usize,
    klsh_count: usize,
    ncomp: usize,
) -> Result<Array3<f64>, anyhow::Error> {
    if ncomp == 0 {
        return Err(DimensionMismatchError("ncomp must be at least 1.".to_string()).into());
    }
    let layout = KetPairLayout::new(basis);
    if klsh_start + klsh_count > layout.n_shell_pairs() {
        return Err(DimensionMismatchError(format!(
            "ket shell-pair range [{klsh_start}, {}) exceeds the {} pairs of the basis.",
            klsh_start + klsh_count,
            layout.n_shell_pairs()
        ))
        .into());
    }
    source.prepare(basis)?;

    let nkl = layout.columns_in_range(klsh_start, klsh_count);
    let bra_len = fill.bra_len(basis.nao());
    let mut eri = Array3::<f64>::zeros((nkl, ncomp, bra_len));

    let counts = layout.range_column_counts(klsh_start, klsh_count);
    let regions = partition_columns(eri.view_mut(), &counts);
    regions
        .into_par_iter()
        .zip(klsh_start..klsh_start + klsh_count)
        .map(|(region, klsh)| {
            let (ksh, lsh) = decompose_shell_pair(klsh);
            if screen.skip(ksh, lsh) {
                log::debug!("Ket shell pair ({ksh}, {lsh}) rejected by the screen.");
                return Ok(());
            }
            fill.fill_shell_pair(source, screen, basis, ksh, lsh, ncomp, region)
        })
        .collect::<Result<Vec<()>, anyhow::Error>>()?;
    Ok(eri)
}

/// Splits the buffer along its column axis into the disjoint regions owned
/// one-to-one by the parallel work units.
fn partition_columns<'a>(
    view: ArrayViewMut3<'a, f64>,
    counts: &[usize],
) -> Vec<ArrayViewMut3<'a, f64>> {
    let mut regions = Vec::with_capacity(counts.len());
    let mut rest = view;
    for &count in counts {
        let (region, tail) = rest.split_at(Axis(0), count);
        regions.push(region);
        rest = tail;
    }
    regions
}
