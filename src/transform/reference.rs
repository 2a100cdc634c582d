//! Single-shot dense reference transform.
//!
//! The two-pass drivers are equivalent, up to floating-point rounding, to one
//! dense four-index rotation. This module provides that rotation directly:
//! it is the comparison oracle for the test suite and a convenience for
//! systems small enough not to warrant the two-pass machinery.

use anyhow::format_err;
use ndarray::{s, Array4, ArrayView2, ArrayView4, Ix4};
use ndarray_einsum_beta::einsum;

use crate::transform::rotation::MoWindow;

/// Rotates all four indices of a dense AO tensor into the requested MO
/// windows in one contraction,
/// $`(ij|kl) = \sum_{pqrs} C_{pi} C_{qj} C_{rk} C_{sl} (pq|rs)`$.
///
/// # Arguments
///
/// * `eri` - The dense AO tensor, `nao × nao × nao × nao`.
/// * `mo` - The MO coefficient matrix, `nao × nmo`.
/// * `wi`, `wj`, `wk`, `wl` - The MO windows of the four output indices.
///
/// # Returns
///
/// The rotated tensor of shape `(wi.count, wj.count, wk.count, wl.count)`.
pub fn dense_full_transform(
    eri: ArrayView4<f64>,
    mo: ArrayView2<f64>,
    wi: MoWindow,
    wj: MoWindow,
    wk: MoWindow,
    wl: MoWindow,
) -> Result<Array4<f64>, anyhow::Error> {
    let ci = mo.slice(s![.., wi.start..wi.end()]);
    let cj = mo.slice(s![.., wj.start..wj.end()]);
    let ck = mo.slice(s![.., wk.start..wk.end()]);
    let cl = mo.slice(s![.., wl.start..wl.end()]);
    let rotated = einsum("pqrs,pi,qj,rk,sl->ijkl", &[&eri, &ci, &cj, &ck, &cl])
        .map_err(|err| format_err!("Reference contraction failed: {err}."))?;
    Ok(rotated.into_dimensionality::<Ix4>()?)
}
