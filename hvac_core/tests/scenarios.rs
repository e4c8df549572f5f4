// End-to-end scenario tests (S1-S6) exercising Dispatcher directly, at the
// capacities and timings used as worked examples.
use hvac_core::config::Config;
use hvac_core::dispatcher::Dispatcher;
use hvac_core::store::RoomStore;
use hvac_protocol::{FanSpeed, Mode, RoomStatus, WaitTimer};
use std::path::PathBuf;
use std::time::Duration;

fn test_config() -> Config {
    hvac_core::config::test_config()
}

async fn store_with_rooms(n: usize, tag: &str) -> RoomStore {
    let cfg = test_config();
    RoomStore::load_or_init(&cfg, n, PathBuf::from(format!("/tmp/does-not-exist-{tag}.json"))).await
}

fn set_fan(store: &RoomStore, id: &str, speed: FanSpeed) {
    let mut r = store.rooms().get_mut(id).unwrap();
    r.fan_speed = speed;
    r.is_on = true;
}

#[tokio::test]
async fn s1_priority_preemption() {
    let store = store_with_rooms(4, "s1").await;
    let cfg = test_config();
    let dispatcher = Dispatcher::new(store.clone(), cfg);
    let ids: Vec<String> = store.room_ids();
    let (r1, r2, r3, r4) = (ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone());

    for r in [&r1, &r2, &r3] {
        set_fan(&store, r, FanSpeed::Mid);
        dispatcher.request(r);
    }
    assert_eq!(dispatcher.serving_snapshot().len(), 3);

    // give r2 the largest service_time so it is the deterministic victim
    dispatcher.tick(Duration::from_secs(5));
    {
        let mut r = store.rooms().get_mut(&r2).unwrap();
        r.service_time += Duration::from_secs(100);
    }

    set_fan(&store, &r4, FanSpeed::High);
    dispatcher.request(&r4);

    assert!(dispatcher.serving_snapshot().contains(&r4));
    assert_eq!(store.get(&r4).unwrap().status, RoomStatus::Serving);
    assert_eq!(store.get(&r4).unwrap().service_time, Duration::ZERO);

    let waiting = dispatcher.waiting_snapshot();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].0, r2);
    assert_eq!(waiting[0].1, WaitTimer::Indefinite);
}

#[tokio::test]
async fn s2_equal_priority_round_robin() {
    let store = store_with_rooms(4, "s2").await;
    let cfg = test_config();
    let dispatcher = Dispatcher::new(store.clone(), cfg.clone());
    let ids: Vec<String> = store.room_ids();
    let (r1, r2, r3, r4) = (ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone());

    for r in [&r1, &r2, &r3] {
        set_fan(&store, r, FanSpeed::Mid);
        dispatcher.request(r);
    }

    // r1..r3 accumulate service_time; r2 is made the largest so it's the
    // deterministic round-robin victim.
    for (r, extra) in [(&r1, 10u64), (&r2, 40u64), (&r3, 20u64)] {
        let mut room = store.rooms().get_mut(r).unwrap();
        room.service_time = Duration::from_secs(200 + extra);
    }

    set_fan(&store, &r4, FanSpeed::Mid);
    dispatcher.request(&r4);
    assert_eq!(dispatcher.waiting_snapshot()[0].0, r4);

    // advance the full slice; the swap should fire
    dispatcher.tick(cfg.slice);

    assert!(dispatcher.serving_snapshot().contains(&r4));
    assert_eq!(store.get(&r4).unwrap().status, RoomStatus::Serving);
    assert_eq!(store.get(&r4).unwrap().service_time, Duration::ZERO);

    let waiting = dispatcher.waiting_snapshot();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].0, r2);
    assert_eq!(waiting[0].1, WaitTimer::Slice(cfg.slice));
}

#[tokio::test]
async fn s3_slot_free_promotion() {
    let store = store_with_rooms(5, "s3").await;
    let cfg = test_config();
    let dispatcher = Dispatcher::new(store.clone(), cfg.clone());
    let ids: Vec<String> = store.room_ids();
    let (r1, r2, r3, r4, r5) = (ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone(), ids[4].clone());

    set_fan(&store, &r1, FanSpeed::High);
    dispatcher.request(&r1);
    set_fan(&store, &r2, FanSpeed::Mid);
    dispatcher.request(&r2);
    set_fan(&store, &r3, FanSpeed::Mid);
    dispatcher.request(&r3);

    set_fan(&store, &r5, FanSpeed::Low);
    dispatcher.request(&r5);
    set_fan(&store, &r4, FanSpeed::Mid);
    dispatcher.request(&r4);

    assert_eq!(dispatcher.waiting_snapshot().len(), 2);

    dispatcher.release(&r1);

    assert!(dispatcher.serving_snapshot().contains(&r4));
    assert_eq!(store.get(&r4).unwrap().status, RoomStatus::Serving);
    assert!(dispatcher.waiting_snapshot().iter().any(|(id, _)| id == &r5));
}

#[tokio::test]
async fn s4_hysteresis_drives_request_and_release() {
    use hvac_core::simulator::Simulator;
    use std::sync::Arc;

    let store = store_with_rooms(1, "s4").await;
    let cfg = test_config();
    let id = store.room_ids().into_iter().next().unwrap();
    {
        let mut r = store.rooms().get_mut(&id).unwrap();
        r.is_on = true;
        r.mode = Mode::Cool;
        r.fan_speed = FanSpeed::Mid;
        r.target_temp = 22.0;
        r.current_temp = 22.1;
    }
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), cfg.clone()));
    let sim = Simulator::new(store.clone(), dispatcher.clone(), cfg.clone());

    // below the hysteresis threshold (23.0): no request yet
    sim.tick(Duration::from_secs(1));
    assert_eq!(store.get(&id).unwrap().status, RoomStatus::Idle);

    // drive current_temp to the threshold via direct mutation (ambient
    // drift would take a while at this rate; assert the transition logic
    // directly instead of waiting out the drift in a unit test)
    {
        let mut r = store.rooms().get_mut(&id).unwrap();
        r.current_temp = 23.0;
    }
    sim.tick(Duration::from_secs(1));
    assert_ne!(store.get(&id).unwrap().status, RoomStatus::Idle);

    // let it serve down to target, then below; release should fire
    for _ in 0..600 {
        sim.tick(Duration::from_secs(1));
    }
    assert_eq!(store.get(&id).unwrap().status, RoomStatus::Idle);
}

#[tokio::test]
async fn s5_checkout_resets_fees() {
    use hvac_core::billing;

    let store = store_with_rooms(1, "s5").await;
    let cfg = test_config();
    let id = store.room_ids().into_iter().next().unwrap();
    {
        let mut r = store.rooms().get_mut(&id).unwrap();
        r.is_on = true;
        r.fee = 12.75;
        r.total_fee = 12.75;
        r.service_time = Duration::from_secs(1530);
        r.status = RoomStatus::Serving;
    }
    let dispatcher = Dispatcher::new(store.clone(), cfg);

    billing::checkout_reset(&store, &dispatcher, &id).await.unwrap();

    let r = store.get(&id).unwrap();
    assert_eq!(r.fee, 0.0);
    assert_eq!(r.total_fee, 0.0);
    assert_eq!(r.status, RoomStatus::Idle);
}

#[tokio::test]
async fn s6_priority_upgrade_while_waiting_preempts() {
    let store = store_with_rooms(4, "s6").await;
    let cfg = test_config();
    let dispatcher = Dispatcher::new(store.clone(), cfg);
    let ids: Vec<String> = store.room_ids();
    let (r1, r2, r3, r4) = (ids[0].clone(), ids[1].clone(), ids[2].clone(), ids[3].clone());

    for r in [&r1, &r2, &r3] {
        set_fan(&store, r, FanSpeed::Mid);
        dispatcher.request(r);
    }

    set_fan(&store, &r4, FanSpeed::Low);
    dispatcher.request(&r4);
    assert_eq!(store.get(&r4).unwrap().status, RoomStatus::Waiting);
    assert_eq!(dispatcher.waiting_snapshot()[0].1, WaitTimer::Indefinite);

    set_fan(&store, &r4, FanSpeed::High);
    dispatcher.request(&r4);

    assert_eq!(store.get(&r4).unwrap().status, RoomStatus::Serving);
    assert!(dispatcher.serving_snapshot().contains(&r4));
}
