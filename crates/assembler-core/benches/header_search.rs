use std::sync::atomic::AtomicBool;

use assembler_core::{search_batch, AcceptAll, BlockAssembler, BlockHeader, BlockParams, Target};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_search_batch(c: &mut Criterion) {
    let header = BlockHeader::new(4, [0u8; 32], [0x34u8; 32], 1_700_000_000, 0x1f00ffff);
    let prefix = header.serialize_without_nonce();
    // Nothing meets a zero target, so every batch hashes all its nonces
    let target = Target::from_be_bytes([0u8; 32]);

    c.bench_function("search_batch_4096", |b| {
        b.iter(|| search_batch(black_box(&prefix), &target, 0, 4096));
    });
}

fn bench_assemble_default_target(c: &mut Criterion) {
    let params = BlockParams {
        time: 1_700_000_000,
        ..BlockParams::new("bcrt1qminer")
    };
    let assembler = BlockAssembler::new(params).unwrap();
    let cancel = AtomicBool::new(false);

    c.bench_function("assemble_bits_1f00ffff", |b| {
        b.iter(|| assembler.assemble(&[], &AcceptAll, &cancel).unwrap());
    });
}

criterion_group!(benches, bench_search_batch, bench_assemble_default_target);
criterion_main!(benches);
