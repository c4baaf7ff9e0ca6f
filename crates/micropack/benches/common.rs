use std::time::Duration;

use criterion::{Criterion, Throughput};
use micropack::placement::{place_classes, PlacementConfig, SizeClass};
use micropack::state::Microstructure;

pub const SAMPLE_SIZE: usize = 10;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// A lattice of edge `edge` packed with `count` spheres of each radius in `radii`.
#[allow(dead_code)]
pub fn packed_state(edge: usize, seed: i32, radii: &[(u32, i32)]) -> Microstructure {
    let mut state = Microstructure::new(edge, seed).expect("valid lattice");
    let classes: Vec<SizeClass> = radii
        .iter()
        .map(|&(count, radius)| SizeClass::new(count, radius, micropack::lattice::Phase::Cement))
        .collect();
    place_classes(&mut state, &PlacementConfig::default(), &classes).expect("placement fits");
    state
}
