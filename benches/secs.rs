#![feature(test)]
extern crate test;
use norlys_secs::config::{GridConfig, InterpolationConfig};
use norlys_secs::secs::{secs_interpolate, ObservationVector};
use test::Bencher;

fn make_input() -> Vec<ObservationVector> {
    vec![ObservationVector {
        lat: 69.0,
        lon: 19.0,
        alt: 0.0,
        i: -100.0,
        j: -100.0,
        k: f64::NAN,
    }]
}

#[bench]
fn bench_secs_interpolate(b: &mut Bencher) {
    let obs = make_input();
    let config = InterpolationConfig {
        prediction_grid: GridConfig {
            lat_range: [45.0, 85.0],
            lat_steps: 5,
            lon_range: [-180.0, 179.0],
            lon_steps: 5,
            altitude: 0.0,
        },
        ..Default::default()
    };

    b.iter(|| {
        let out = secs_interpolate(&obs, &config);
        test::black_box(out);
    })
}
