use criterion::{Criterion, Throughput};
use libfah::hub::json::Document;
use libfah::hub::token::token;
use std::hint::black_box;

const PUSH: &str = r#"{"00000000-0000-0000-0000-000000000000":{
    "datapoints":{"ABB700000000/ch0000/odp0000":"1","7EB100000001/ch0000/idp0000":"0",
        "6000D2CB27B2/ch0003/odp0001":"21.5","6000D2CB27B2/ch0003/odp0002":"1"},
    "devices":{},"devicesAdded":[],"devicesRemoved":[],
    "scenesTriggered":{"ABB700000002":{"channels":{"ch0001":{
        "outputs":{"odp0000":{"value":"1","pairingID":256}},
        "inputs":{"idp0000":{"value":"0","pairingID":1}}}}}}}}"#;

const DETAILS: &str = r#"{"00000000-0000-0000-0000-000000000000":{"devices":{"6000D2CB27B2":{
    "displayName":"Kitchen","floor":"01","room":"02","interface":"vdev","nativeId":"ABC123",
    "channels":{
        "ch0000":{"displayName":"Light","functionID":"7","floor":"01","room":"02",
            "inputs":{"idp0000":{"pairingID":1,"value":"0"}},
            "outputs":{"odp0000":{"pairingID":256,"value":"1"}},
            "parameters":{"par0015":"60","par0027":"1"}},
        "ch0001":{"displayName":"Sensor","functionID":"41",
            "parameters":{"par0030":"3"}}},
    "parameters":{"par0001":"50","par0002":"1"}}}}}"#;

pub fn bench_parse_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");
    group.throughput(Throughput::Bytes(PUSH.len() as u64));
    group.bench_function("parse_push", |b| {
        b.iter(|| Document::parse(black_box(PUSH.as_bytes())).unwrap().datapoints.len())
    });
    group.finish();
}

pub fn bench_parse_details(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");
    group.throughput(Throughput::Bytes(DETAILS.len() as u64));
    group.bench_function("parse_details", |b| {
        b.iter(|| Document::parse(black_box(DETAILS.as_bytes())).unwrap().parameters.len())
    });
    group.finish();
}

pub fn bench_token(c: &mut Criterion) {
    c.bench_function("token_split_push_key", |b| {
        b.iter(|| {
            let key = black_box("6000D2CB27B2/ch0003/odp0001");
            (token(key, 0, '/'), token(key, 1, '/'), token(key, 2, '/'))
        })
    });
}
