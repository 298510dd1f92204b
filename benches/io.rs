use criterion::{criterion_group, criterion_main, Criterion};
use rafile::prelude::*;
use rafile::test_utilities::{random_rafile, random_rafile_content};

const NSTANZAS: usize = 10_000;

fn bench_parse_shootout(c: &mut Criterion) {
    // create the benchmark group
    let mut group = c.benchmark_group("rafile");

    // create the test data
    let content = random_rafile_content(NSTANZAS);

    // configure the sample size for the group
    group.sample_size(10);

    group.bench_function("parse", |b| {
        b.iter(|| {
            let rafile =
                RaFile::from_reader(content.as_bytes(), None, DuplicateNamePolicy::Warn).unwrap();
            rafile.len()
        });
    });

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let rafile =
                RaFile::from_reader(content.as_bytes(), None, DuplicateNamePolicy::Warn).unwrap();
            rafile.serialize().len()
        });
    });

    let rafile = random_rafile(NSTANZAS);
    group.bench_function("alt_index_build", |b| {
        b.iter(|| AltIndex::build(&rafile, "cell", false).unwrap().len());
    });
}

criterion_group!(benches, bench_parse_shootout);
criterion_main!(benches);
