use criterion::{criterion_group, criterion_main};

mod hub;
mod network;

criterion_group!(
    benches,
    network::application::websocket::bench_encode,
    network::application::websocket::bench_decode,
    hub::json::bench_parse_push,
    hub::json::bench_parse_details,
    hub::json::bench_token
);
criterion_main!(benches);
