use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

// Simplified serving-room record for benchmarking the victim-selection scan
// (the dispatcher's hot path on every preemption/round-robin decision).
#[derive(Clone)]
struct ServingRoom {
    priority: u8,
    service_time: Duration,
}

// Mirrors Dispatcher::find_min_priority_victim: lowest priority, ties
// broken by largest service_time.
fn find_min_priority_victim(serving: &[ServingRoom]) -> usize {
    let mut best_idx = 0;
    let mut best_prio = u8::MAX;
    let mut best_service = Duration::ZERO;
    for (idx, room) in serving.iter().enumerate() {
        let better = room.priority < best_prio || (room.priority == best_prio && room.service_time > best_service);
        if idx == 0 || better {
            best_idx = idx;
            best_prio = room.priority;
            best_service = room.service_time;
        }
    }
    best_idx
}

fn bench_victim_scan(c: &mut Criterion) {
    c.bench_function("victim_scan_3_rooms", |b| {
        let serving = vec![
            ServingRoom { priority: 2, service_time: Duration::from_secs(30) },
            ServingRoom { priority: 2, service_time: Duration::from_secs(90) },
            ServingRoom { priority: 3, service_time: Duration::from_secs(10) },
        ];
        b.iter(|| {
            let idx = find_min_priority_victim(&serving);
            std::hint::black_box(idx);
        });
    });

    c.bench_function("victim_scan_100_rooms", |b| {
        let serving: Vec<ServingRoom> = (0..100)
            .map(|i| ServingRoom {
                priority: ((i % 3) + 1) as u8,
                service_time: Duration::from_secs(i as u64),
            })
            .collect();
        b.iter(|| {
            let idx = find_min_priority_victim(&serving);
            std::hint::black_box(idx);
        });
    });
}

// Benchmark the waiting-queue promotion scan (highest priority, smallest
// wait_remaining) at a representative queue depth.
fn bench_promotion_scan(c: &mut Criterion) {
    c.bench_function("promotion_scan_20_waiters", |b| {
        let waiting: Vec<(u8, Duration)> = (0..20)
            .map(|i| (((i % 3) + 1) as u8, Duration::from_secs((20 - i) as u64)))
            .collect();
        b.iter(|| {
            let mut best_idx = 0;
            let mut best_prio = 0u8;
            let mut best_key = Duration::MAX;
            for (idx, (prio, key)) in waiting.iter().enumerate() {
                let better = *prio > best_prio || (*prio == best_prio && *key < best_key);
                if idx == 0 || better {
                    best_idx = idx;
                    best_prio = *prio;
                    best_key = *key;
                }
            }
            std::hint::black_box(best_idx);
        });
    });
}

criterion_group!(benches, bench_victim_scan, bench_promotion_scan);
criterion_main!(benches);
