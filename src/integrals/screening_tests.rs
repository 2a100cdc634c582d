use nalgebra::Point3;
use ndarray::{s, Array4};

use crate::auxiliary::atom::Atom;
use crate::basis::{BasisSet, BasisShell, GaussianContraction, ShellKind};
use crate::integrals::screening::{NoScreening, SchwarzScreening, ShellPairScreen};
use crate::integrals::TabulatedEri;

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

#[test]
fn test_no_screening_never_skips() {
    let screen = NoScreening;
    for k in 0..4 {
        for l in 0..=k {
            assert!(!screen.skip(k, l));
        }
    }
}

#[test]
fn test_schwarz_screening_skips_negligible_pair() {
    let basis = basis_12();
    let mut eri = model_eri(basis.nao());
    // Zero the diagonal block (10|10) so that the bound of shell pair (1, 0)
    // vanishes. Shell 0 covers AO 0, shell 1 covers AOs 1 and 2.
    eri.slice_mut(s![1..3, 0..1, 1..3, 0..1]).fill(0.0);
    let source = TabulatedEri::from_dense(eri);

    let screen = SchwarzScreening::build(&source, &basis, 1e-10).unwrap();
    assert!(screen.skip(1, 0));
    assert!(!screen.skip(0, 0));
    assert!(!screen.skip(1, 1));
    assert_eq!(screen.bounds()[(1, 0)], 0.0);
    assert_eq!(screen.bounds()[(0, 1)], 0.0);
}

#[test]
fn test_schwarz_screening_keeps_everything_at_zero_threshold() {
    let basis = basis_12();
    let source = TabulatedEri::from_dense(model_eri(basis.nao()));
    let screen = SchwarzScreening::build(&source, &basis, 0.0).unwrap();
    for k in 0..basis.nbas() {
        for l in 0..=k {
            assert!(!screen.skip(k, l));
        }
    }
}
