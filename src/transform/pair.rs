//! Compound indexing of shell pairs and the ket-side column layout.
//!
//! The first-pass drivers iterate over a linearised index space of ket shell
//! pairs $`(k, l)`$ with $`k \ge l`$, so that quadruplets differing only by a
//! $`k \leftrightarrow l`$ swap are scheduled exactly once. The bijection
//! between the linear index and the pair is pure and invertible.

use crate::basis::BasisSet;

#[cfg(test)]
#[path = "pair_tests.rs"]
mod pair_tests;

// =========
// Functions
// =========

/// The number of shell pairs $`(k, l)`$ with $`k \ge l`$ for `nbas` shells.
pub fn n_shell_pairs(nbas: usize) -> usize {
    nbas * (nbas + 1) / 2
}

/// Encodes a shell pair $`(k, l)`$ with $`k \ge l`$ into its compound index
/// $`k(k+1)/2 + l`$.
pub fn compose_shell_pair(k: usize, l: usize) -> usize {
    debug_assert!(k >= l);
    k * (k + 1) / 2 + l
}

/// Decodes a compound shell-pair index back into the pair $`(k, l)`$ with
/// $`k \ge l`$. Inverse of [`compose_shell_pair`].
pub fn decompose_shell_pair(kl: usize) -> (usize, usize) {
    let mut k = (((8.0 * kl as f64 + 1.0).sqrt() - 1.0) / 2.0) as usize;
    // Guard against floating-point rounding of the square root.
    while k * (k + 1) / 2 > kl {
        k -= 1;
    }
    while (k + 1) * (k + 2) / 2 <= kl {
        k += 1;
    }
    (k, kl - k * (k + 1) / 2)
}

/// Enumerates the AO-pair columns contributed by the ket shell pair
/// $`(k, l)`$, yielding `(column, κ, λ)` with `κ`, `λ` local to the shells.
///
/// Off-diagonal pairs contribute all `wk · wl` combinations; a diagonal pair
/// (`k == l`) contributes only its `κ ≥ λ` triangle, since the remaining
/// combinations are symmetry-equivalent.
pub fn ket_pair_columns(
    wk: usize,
    wl: usize,
    diagonal: bool,
) -> impl Iterator<Item = (usize, usize, usize)> {
    (0..wk)
        .flat_map(move |a| {
            let lmax = if diagonal { a + 1 } else { wl };
            (0..lmax).map(move |b| (a, b))
        })
        .enumerate()
        .map(|(col, (a, b))| (col, a, b))
}

// ==================
// Struct definitions
// ==================

/// The column layout of the ket AO-pair dimension: how many AO-pair columns
/// each ket shell pair contributes, and where the columns of each pair start.
///
/// Built once per run from the basis description; the cumulative offsets
/// drive both buffer sizing and the disjoint partitioning of the output
/// buffer across parallel workers.
#[derive(Clone, Debug)]
pub struct KetPairLayout {
    /// Cumulative column offsets over all shell pairs, of length
    /// `n_shell_pairs(nbas) + 1`.
    offsets: Vec<usize>,
}

impl KetPairLayout {
    /// Builds the layout for a basis description.
    pub fn new(basis: &BasisSet) -> Self {
        let nbas = basis.nbas();
        let mut offsets = Vec::with_capacity(n_shell_pairs(nbas) + 1);
        offsets.push(0);
        for kl in 0..n_shell_pairs(nbas) {
            let (k, l) = decompose_shell_pair(kl);
            let last = *offsets
                .last()
                .expect("The offset table is never empty here.");
            offsets.push(last + pair_column_count(basis.shell_width(k), basis.shell_width(l), k == l));
        }
        Self { offsets }
    }

    /// The number of ket shell pairs covered by this layout.
    pub fn n_shell_pairs(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The number of AO-pair columns contributed by shell pair `klsh`.
    pub fn pair_columns(&self, klsh: usize) -> usize {
        self.offsets[klsh + 1] - self.offsets[klsh]
    }

    /// The total number of AO-pair columns over the contiguous shell-pair
    /// range `[klsh_start, klsh_start + klsh_count)`.
    pub fn columns_in_range(&self, klsh_start: usize, klsh_count: usize) -> usize {
        self.offsets[klsh_start + klsh_count] - self.offsets[klsh_start]
    }

    /// The per-pair column counts over a contiguous shell-pair range, in
    /// order. These are the sizes of the disjoint buffer regions owned by the
    /// parallel workers.
    pub fn range_column_counts(&self, klsh_start: usize, klsh_count: usize) -> Vec<usize> {
        (klsh_start..klsh_start + klsh_count)
            .map(|kl| self.pair_columns(kl))
            .collect()
    }

    /// The total number of AO-pair columns over all shell pairs; equal to
    /// `nao(nao + 1)/2`.
    pub fn total_columns(&self) -> usize {
        *self
            .offsets
            .last()
            .expect("The offset table is never empty.")
    }
}

/// The number of AO-pair columns of one ket shell pair.
fn pair_column_count(wk: usize, wl: usize, diagonal: bool) -> usize {
    if diagonal {
        wk * (wk + 1) / 2
    } else {
        wk * wl
    }
}
