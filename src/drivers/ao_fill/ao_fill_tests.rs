use nalgebra::Point3;
use ndarray::{Array4, Array5};

use crate::auxiliary::atom::Atom;
use crate::basis::{BasisSet, BasisShell, GaussianContraction, ShellKind};
use crate::drivers::ao_fill::{AoFillDriver, AoFillParams};
use crate::drivers::EriDriver;
use crate::integrals::screening::NoScreening;
use crate::integrals::{IntegralEvaluationError, IntegralSource, ShellQuadruplet, TabulatedEri};
use crate::transform::fill::{fill_shell_pair_range, DenseBraFill};

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

struct FailingSource;

impl IntegralSource for FailingSource {
    fn eri_block(
        &self,
        quartet: ShellQuadruplet,
        _ncomp: usize,
        _basis: &BasisSet,
    ) -> Result<Array5<f64>, IntegralEvaluationError> {
        Err(IntegralEvaluationError(format!(
            "quadruplet {quartet} unavailable."
        )))
    }
}

#[test]
fn test_ao_fill_driver_matches_engine() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let params = AoFillParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .build()
        .unwrap();
    let mut driver = AoFillDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .build()
        .unwrap();
    driver.run().unwrap();

    let expected =
        fill_shell_pair_range(&source, &DenseBraFill, &NoScreening, &basis, 0, 3, 1).unwrap();
    assert_eq!(driver.result().unwrap(), &expected);
}

#[test]
fn test_ao_fill_driver_no_result_before_run() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let params = AoFillParams::builder()
        .klsh_start(0)
        .klsh_count(1)
        .build()
        .unwrap();
    let driver = AoFillDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&source)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .build()
        .unwrap();
    assert!(driver.result().is_err());
}

#[test]
fn test_ao_fill_driver_propagates_integral_failure() {
    let basis = basis_12();
    let params = AoFillParams::builder()
        .klsh_start(0)
        .klsh_count(3)
        .build()
        .unwrap();
    let mut driver = AoFillDriver::builder()
        .parameters(&params)
        .basis(&basis)
        .source(&FailingSource)
        .fill(&DenseBraFill)
        .screen(&NoScreening)
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(err.downcast_ref::<IntegralEvaluationError>().is_some());
    assert!(driver.result().is_err());
}
