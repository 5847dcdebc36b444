use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;
use tokio::sync::mpsc;

use rendezvous::signaling::{ClientMessage, ConnectionId, RoomId, RoomRegistry, SignalingHub};

/// join/leave churn benchmark
fn bench_registry(c: &mut Criterion) {
    let a = ConnectionId::generate();
    let b = ConnectionId::generate();
    let room = RoomId::generate();

    let mut group = c.benchmark_group("Registry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("join_leave_pair", |bench| {
        let mut registry = RoomRegistry::new();
        bench.iter(|| {
            registry.join(black_box(&room), a);
            registry.join(black_box(&room), b);
            registry.leave(black_box(&room), a);
            registry.leave(black_box(&room), b);
        })
    });

    group.finish();
}

/// offer relay benchmark (lookup + encode + enqueue)
fn bench_relay(c: &mut Criterion) {
    let mut hub = SignalingHub::new();
    let (tx_a, _rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let a = hub.connect(tx_a);
    let b = hub.connect(tx_b);
    let sdp = json!({"type": "offer", "sdp": "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n"});

    let mut group = c.benchmark_group("Relay");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |bench| {
        bench.iter(|| {
            let msg = ClientMessage::Offer {
                to: Some(b),
                sdp: Some(sdp.clone()),
            };
            black_box(hub.handle(a, msg));
            let _ = rx_b.try_recv();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_relay);
criterion_main!(benches);
