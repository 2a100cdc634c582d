use nalgebra::Point3;
use ndarray::{Array2, Array4};

use crate::auxiliary::atom::Atom;
use crate::basis::{BasisSet, BasisShell, GaussianContraction, ShellKind};
use crate::drivers::half_transform::{HalfTransformDriver, HalfTransformParams};
use crate::drivers::EriDriver;
use crate::integrals::screening::NoScreening;
use crate::integrals::TabulatedEri;
use crate::transform::fill::{fill_shell_pair_range, DenseBraFill, PackedBraFill};
use crate::transform::rotation::{
    transform_rows, FullRotation, MoWindow, SquareLayout, TrilLayout, TrilRotation,
};
use crate::transform::DimensionMismatchError;

fn contraction() -> GaussianContraction {
    GaussianContraction {
        primitives: vec![(1.0, 1.0)],
    }
}

fn basis_12() -> BasisSet {
    let shells = vec![
        BasisShell::new(0, ShellKind::Pure, 0, contraction()),
        BasisShell::new_general(0, ShellKind::Pure, 0, vec![contraction(), contraction()]),
    ];
    BasisSet::new(vec![Atom::new(1, Point3::origin())], shells).unwrap()
}

fn model_eri(nao: usize) -> Array4<f64> {
    Array4::from_shape_fn((nao, nao, nao, nao), |(p, q, r, s)| {
        let g = |a: usize, b: usize| 1.0 / (1.0 + a as f64 + b as f64) + 0.1 * (a as f64 * b as f64);
        g(p, q) * g(r, s) + 0.5 * (g(p, q) + g(r, s))
    })
}

fn mo_matrix(nao: usize, nmo: usize) -> Array2<f64> {
    Array2::from_shape_fn((nao, nmo), |(p, i)| {
        0.3 * ((p * nmo + i) % 5) as f64 + 0.1 * (p + 1) as f64 - 0.05 * (i as f64)
    })
}

#[test]
fn test_half_transform_agrees_with_separate_fill_and_rotation() {
    let basis = basis_12();
    let nao = basis.nao();
    let source = TabulatedEri::from_dense(model_eri(nao));
    let mo = mo_matrix(nao, 3);
    let bra = MoWindow::new(0, 2);
    let ket = MoWindow::new(1, 2);

    let params = HalfTransformParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .bra(bra)
        .ket(ket)
        .build()
        .unwrap();
    let mut driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&FullRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    driver.run().unwrap();
    let fused = driver.result().unwrap();
    assert_eq!(fused.dim(), (6, 1, 4));

    // The fill-only entry point followed by a separate rotation pass must
    // agree numerically with the fused path.
    let raw =
        fill_shell_pair_range(&source, &DenseBraFill, &NoScreening, &basis, 0, 3, 1).unwrap();
    let rows = raw.into_shape((6, nao * nao)).unwrap();
    let rotated = transform_rows(
        rows.view(),
        &SquareLayout,
        &FullRotation,
        mo.view(),
        bra,
        ket,
        nao,
    );
    let separate = rotated.into_shape((6, 1, 4)).unwrap();
    assert_eq!(fused, &separate);
}

#[test]
fn test_half_transform_packed_agrees_with_dense() {
    let basis = basis_12();
    let nao = basis.nao();
    let source = TabulatedEri::from_dense(model_eri(nao));
    let mo = mo_matrix(nao, 3);
    let window = MoWindow::new(0, 3);

    let params = HalfTransformParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .bra(window)
        .ket(window)
        .build()
        .unwrap();

    let mut dense_driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&TrilRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    dense_driver.run().unwrap();
    let from_dense = dense_driver.result().unwrap();

    let mut packed_driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&PackedBraFill)
        .screen(&NoScreening)
        .layout(&TrilLayout)
        .rotation(&TrilRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    packed_driver.run().unwrap();
    let from_packed = packed_driver.result().unwrap();

    // The packed bra storage carries the same information as the dense one,
    // so the rotated intermediates coincide.
    assert_eq!(from_dense, from_packed);
}

#[test]
fn test_half_transform_rejects_mismatched_layout() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let mo = mo_matrix(basis.nao(), 3);
    let window = MoWindow::new(0, 2);
    let params = HalfTransformParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .bra(window)
        .ket(window)
        .build()
        .unwrap();
    let mut driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&PackedBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&FullRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(err.downcast_ref::<DimensionMismatchError>().is_some());
}

#[test]
fn test_half_transform_rejects_invalid_windows() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let mo = mo_matrix(basis.nao(), 3);
    let params = HalfTransformParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .bra(MoWindow::new(2, 2))
        .ket(MoWindow::new(0, 3))
        .build()
        .unwrap();
    let mut driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&FullRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(err.downcast_ref::<DimensionMismatchError>().is_some());
}

#[test]
fn test_half_transform_empty_bra_window() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let mo = mo_matrix(basis.nao(), 3);
    let params = HalfTransformParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .bra(MoWindow::new(0, 0))
        .ket(MoWindow::new(0, 3))
        .build()
        .unwrap();
    let mut driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&FullRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    driver.run().unwrap();
    assert_eq!(driver.result().unwrap().dim(), (6, 1, 0));
}

#[test]
fn test_half_transform_empty_shell_pair_range() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let mo = mo_matrix(basis.nao(), 3);
    let window = MoWindow::new(0, 2);
    let params = HalfTransformParams::builder()
        .klsh_start(1)
        .klsh_count(0)
        .bra(window)
        .ket(window)
        .build()
        .unwrap();
    let mut driver = HalfTransformDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .layout(&SquareLayout)
        .rotation(&FullRotation)
        .mo_coeff(mo.view())
        .build()
        .unwrap();
    driver.run().unwrap();
    assert_eq!(driver.result().unwrap().dim(), (0, 1, 4));
}
