use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::prelude::*;

fn criterion_benchmark(c: &mut Criterion) {
    let mut vm = Chip8Vm::new(Chip8Conf {
        seed: Some(0),
        ..Chip8Conf::default()
    });

    c.bench_function("maze frames", |b| {
        b.iter(|| {
            vm.load_bytecode(include_bytes!("../programs/maze")).unwrap();
            for _ in 0..black_box(100) {
                black_box(vm.run_frame().unwrap());
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
