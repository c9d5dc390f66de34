use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nginx_exporter::client::parse_stub_status;

const BODY: &str = "Active connections: 291 \n\
                    server accepts handled requests\n \
                    16630948 16630948 31070465 \n\
                    Reading: 6 Writing: 179 Waiting: 106 \n";

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_stub_status", |b| {
        b.iter(|| parse_stub_status(black_box(BODY)))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
