mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pytocpp::{codegen, compile};

fn bench_codegen(c: &mut Criterion) {
    for (label, source) in common::workloads("codegen") {
        let program = common::load_program(&label, &source);

        c.bench_function(&format!("codegen_generate_{label}"), |b| {
            b.iter(|| {
                let out = codegen::generate(black_box(&program)).expect("generate");
                black_box(out);
            })
        });

        c.bench_function(&format!("codegen_end_to_end_{label}"), |b| {
            b.iter(|| {
                let out = compile(black_box(&source)).expect("compile");
                black_box(out);
            })
        });
    }
}

criterion_group!(benches, bench_codegen);
criterion_main!(benches);
