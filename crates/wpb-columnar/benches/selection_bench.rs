use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wpb_columnar::{Cutflow, Jagged, Selection, Weights, delta_r_mask};
use wpb_columnar::event::{Jet, Muon};

const CUTS: [&str; 6] = ["c0", "c1", "c2", "c3", "c4", "c5"];

fn make_selection(n: usize) -> (Selection, Weights) {
    let mut sel = Selection::new(n);
    for (k, name) in CUTS.iter().enumerate() {
        // Deterministic pattern, each cut keeps roughly (k+2)/(k+3) of the events.
        let mask = (0..n).map(|i| (i * 7 + k * 13) % (k + 3) != 0).collect();
        sel.add(*name, mask).unwrap();
    }
    let mut w = Weights::new(n);
    w.add("genweight", (0..n).map(|i| if i % 9 == 0 { -1.0 } else { 1.0 }).collect(), None, None)
        .unwrap();
    w.add("pileup", vec![0.97; n], Some(vec![1.02; n]), Some(vec![0.93; n])).unwrap();
    (sel, w)
}

fn bench_cutflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("cutflow");

    for n in [1_000usize, 100_000] {
        let (sel, w) = make_selection(n);
        let weights = w.weight(None).unwrap();
        group.bench_with_input(BenchmarkId::new("compute", n), &n, |b, _| {
            b.iter(|| black_box(Cutflow::compute(&sel, &weights, &CUTS).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("weight_product", n), &n, |b, _| {
            b.iter(|| black_box(w.weight(Some("pileupUp")).unwrap()))
        });
    }

    group.finish();
}

fn bench_delta_r_mask(c: &mut Criterion) {
    let n = 10_000usize;
    let jets = Jagged::from_nested(
        (0..n)
            .map(|i| (0..(i % 6)).map(|j| Jet::new(30.0, 0.3 * j as f64, 0.5 * j as f64)).collect())
            .collect(),
    );
    let muons = Jagged::from_nested(
        (0..n).map(|i| (0..(i % 3)).map(|j| Muon::new(40.0, 0.6 * j as f64, 1.0, 1)).collect()).collect(),
    );
    c.bench_function("delta_r_mask_10k", |b| {
        b.iter(|| black_box(delta_r_mask(&jets, &muons, 0.4).unwrap()))
    });
}

criterion_group!(benches, bench_cutflow, bench_delta_r_mask);
criterion_main!(benches);
