mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use micropack::lattice::Phase;
use micropack::placement::{place_classes, PlacementConfig, SizeClass};
use micropack::state::Microstructure;

const EDGES: [usize; 3] = [25, 50, 100];

fn placement_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement/mixed_classes");

    for &edge in &EDGES {
        let scale = (edge * edge * edge / 15_625) as u32;
        let classes = [
            SizeClass::new(scale, 4, Phase::Cement),
            SizeClass::new(4 * scale, 2, Phase::Cement),
            SizeClass::new(8 * scale, 1, Phase::Inert),
        ];
        let spheres: u32 = classes.iter().map(|c| c.count).sum();
        group.throughput(common::elements_throughput(spheres as usize));

        let config = PlacementConfig::new(1)
            .with_gypsum_probability(0.1)
            .with_sulfate_split(0.2, 0.3);

        group.bench_with_input(BenchmarkId::from_parameter(edge), &edge, |b, &edge| {
            b.iter(|| {
                let mut state = Microstructure::new(edge, -1234).expect("valid lattice");
                let report = place_classes(&mut state, &config, &classes).expect("fits");
                black_box(report.placed_count());
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = placement_benches
}
criterion_main!(benches);
