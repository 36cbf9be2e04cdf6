use faer::Mat;
use rpca::noisy::{Noisy, TemporalNorm};
use rpca::pcp::Pcp;
use rpca::{E, I, Mask};

fn main() {
    divan::main();
}

/// Rank-1 smooth signal with a deterministic sprinkle of large spikes.
fn fixture(nrows: I, ncols: I) -> Mat<E> {
    Mat::from_fn(nrows, ncols, |i, j| {
        let clean = 4.0 * ((i as E) * 0.3).sin() * ((j as E) * 0.2).cos();
        let spike = if (i * 31 + j * 17) % 23 == 0 { 5.0 } else { 0.0 };
        clean + spike
    })
}

#[divan::bench]
fn pcp_32x64() {
    let d = fixture(32, 64);
    let omega = Mask::full(32, 64);
    let solver = Pcp {
        max_iter: 100,
        ..Pcp::default()
    };
    solver.decompose(d.as_ref(), &omega).unwrap();
}

#[divan::bench]
fn noisy_l2_32x64() {
    let d = fixture(32, 64);
    let omega = Mask::full(32, 64);
    let solver = Noisy {
        rank: Some(2),
        list_periods: vec![16],
        list_etas: vec![0.5],
        norm: TemporalNorm::L2,
        max_iter: 100,
        ..Noisy::default()
    };
    solver.decompose(d.as_ref(), &omega).unwrap();
}

#[divan::bench]
fn noisy_l1_32x64() {
    let d = fixture(32, 64);
    let omega = Mask::full(32, 64);
    let solver = Noisy {
        rank: Some(2),
        list_periods: vec![16],
        list_etas: vec![0.5],
        norm: TemporalNorm::L1,
        max_iter: 100,
        ..Noisy::default()
    };
    solver.decompose(d.as_ref(), &omega).unwrap();
}
