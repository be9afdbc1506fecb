use criterion::{BenchmarkId, Criterion, Throughput};
use heapless::Vec;
use libfah::network::application::websocket::Opcode;
use libfah::network::application::websocket::frame::{decode, encode};
use std::hint::black_box;

const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];
const SIZES: [usize; 3] = [16, 256, 2000];

pub fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_encode");
    for size in SIZES {
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let mut out: Vec<u8, 2048> = Vec::new();
                encode(Opcode::Text, black_box(payload), MASK, &mut out).unwrap();
                out
            })
        });
    }
    group.finish();
}

pub fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_decode");
    for size in SIZES {
        let mut wire: Vec<u8, 2048> = Vec::new();
        encode(Opcode::Text, &vec![b'x'; size], MASK, &mut wire).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &wire, |b, wire| {
            b.iter(|| {
                let mut out: Vec<u8, 2048> = Vec::new();
                decode(black_box(wire), &mut out).unwrap()
            })
        });
    }
    group.finish();
}
