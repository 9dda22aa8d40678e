use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use varstar::retrievers::gaia::transform::DR3_TRANSFORMS;
use varstar::retrievers::gaia::{GaiaOptions, GaiaRelease, GaiaRetriever};
use varstar::retrievers::{ObservationRetriever, RetrievalContext};

const HEADER: &str = "source_id,transit_id,band,time,mag,flux,flux_error,flux_over_error,rejected_by_photometry,rejected_by_variability,other_flags,solution_id";

/// Synthetic DR3 epoch photometry: `transits` complete G/BP/RP triplets.
fn epoch_photometry(transits: usize) -> String {
    let mut text = String::with_capacity(transits * 3 * 128);
    text.push_str(HEADER);
    text.push('\n');
    for i in 0..transits {
        let time = 1700.0 + i as f64 * 0.25;
        for (band, mag, offset) in [("G", 11.02, 0.0), ("BP", 11.38, 0.0001), ("RP", 10.45, 0.0002)] {
            let mag = mag + 0.1 * (i as f64 * 0.3).sin();
            text.push_str(&format!(
                "5853498713190525696,{i},{band},{:.6},{mag:.5},41350.6,30.2,1369.2,false,false,4097,375316653866487564\n",
                time + offset
            ));
        }
    }
    text
}

fn bench_color_polynomials(c: &mut Criterion) {
    c.bench_function("gaia/dr3_polynomials", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for k in 0..1_000 {
                let x = -0.5 + k as f64 * 0.004;
                for transform in &DR3_TRANSFORMS {
                    sum += transform.magnitude(black_box(11.0), x);
                    sum += transform.uncertainty(0.002, x, 0.003);
                }
            }
            black_box(sum)
        })
    });
}

fn bench_retrieve(c: &mut Criterion) {
    let text = epoch_photometry(2_000);
    let mut group = c.benchmark_group("gaia/retrieve");

    for (label, options) in [
        ("raw", GaiaOptions::default()),
        ("transformed", GaiaOptions::default().release(GaiaRelease::Dr3).transform(true)),
    ] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    GaiaRetriever::from_reader(Cursor::new(text.as_bytes()), "bench")
                        .expect("synthetic input")
                        .with_options(options)
                },
                |mut retriever| black_box(retriever.retrieve(&RetrievalContext::new()).expect("retrieve")),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_color_polynomials, bench_retrieve);
criterion_main!(benches);
