//! Allocator and admission behavior of a full pool.

use meshpool_core::{
    BufferRecord, Component, PacketPool, PoolConfig, PoolError, Priority, RecordRef, SyncFlag,
    SyncStatus, MAX_FRAME_LEN,
};
use proptest::prelude::*;
use std::sync::Arc;

const DATA_PLANE: [Component; 5] = [
    Component::Udp,
    Component::Coap,
    Component::Rpl,
    Component::Icmpv6,
    Component::App,
];

fn pool_with(sync: &Arc<SyncFlag>) -> PacketPool {
    PacketPool::new(PoolConfig::default(), sync.clone()).expect("default config is valid")
}

fn synced_pool() -> PacketPool {
    pool_with(&Arc::new(SyncFlag::synchronized()))
}

#[test]
fn test_unsynchronized_gate() {
    let sync = Arc::new(SyncFlag::new(false));
    let pool = pool_with(&sync);

    for creator in DATA_PLANE {
        assert_eq!(pool.acquire(creator), None, "{creator} allocated while unsynchronized");
    }
    assert_eq!(pool.acquire(Component::Reservation), None);
    assert_eq!(pool.acquire(Component::Negotiation), None);

    // The MAC engine and everything more privileged still get buffers
    assert!(pool.acquire(Component::Tsch).is_some());
    assert!(pool.acquire(Component::Radio).is_some());

    sync.set(true);
    assert!(pool.acquire(Component::Udp).is_some());
}

#[test]
fn test_quota_scenario() {
    // Capacity 10, five slots reserved for the control plane
    let pool = synced_pool();

    let mut data = Vec::new();
    for i in 0..5 {
        let record = pool.acquire(DATA_PLANE[i % DATA_PLANE.len()]);
        assert!(record.is_some(), "data-plane acquire {} refused", i + 1);
        data.push(record.unwrap());
    }
    assert!(!pool.has_high_priority_headroom());
    assert_eq!(pool.acquire(Component::Udp), None);
    assert_eq!(pool.acquire(Component::App), None);

    // Control plane fills the rest of the pool
    let control = [
        Component::Tsch,
        Component::Reservation,
        Component::Negotiation,
        Component::Schedule,
        Component::Neighbors,
    ];
    for creator in control {
        assert!(pool.acquire(creator).is_some(), "{creator} refused under quota");
    }
    assert_eq!(pool.occupancy(), 10);
    assert_eq!(pool.acquire(Component::Negotiation), None);

    // Dropping below the budget re-admits data traffic
    pool.release(data[0]).unwrap();
    assert!(pool.has_high_priority_headroom());
    assert!(pool.acquire(Component::Coap).is_some());
}

#[test]
fn test_zero_quota_admits_data_until_full() {
    let config = PoolConfig::new().with_reserved_quota(0);
    let pool: PacketPool = PacketPool::new(config, Arc::new(SyncFlag::synchronized())).unwrap();
    for _ in 0..10 {
        assert!(pool.acquire(Component::App).is_some());
    }
    assert_eq!(pool.acquire(Component::App), None);
    assert_eq!(pool.acquire(Component::Tsch), None);
}

#[test]
fn test_release_restores_free_state() {
    let pool = synced_pool();
    let record = pool.acquire_with_priority(Component::Udp, Priority::new(1)).unwrap();
    pool.modify(record, Component::Udp, |r| {
        r.push_header(&[0xde, 0xad, 0xbe, 0xef])?;
        r.l4.protocol = Some(17);
        r.l2.retries_left = 4;
        r.l2.security_level = 5;
        Ok::<_, PoolError>(())
    })
    .unwrap()
    .unwrap();

    pool.release(record).unwrap();
    let reset = pool.inspect(record, |r| r.clone()).unwrap();
    assert_eq!(reset, BufferRecord::free(MAX_FRAME_LEN));
}

#[test]
fn test_double_release_succeeds() {
    let pool = synced_pool();
    let record = pool.acquire(Component::Udp).unwrap();
    assert_eq!(pool.release(record), Ok(()));
    assert_eq!(pool.inspect(record, BufferRecord::is_free), Ok(true));
    assert_eq!(pool.release(record), Ok(()));
    assert_eq!(pool.inspect(record, BufferRecord::is_free), Ok(true));
}

#[test]
fn test_stale_release_keeps_reallocated_record() {
    let pool = synced_pool();
    let a = pool.acquire(Component::Udp).unwrap();
    pool.release(a).unwrap();
    let b = pool.acquire(Component::Coap).unwrap();
    assert_eq!(a.slot(), b.slot());

    assert_eq!(pool.release(a), Ok(()));
    assert_eq!(pool.inspect(b, BufferRecord::is_free), Ok(false));
    assert_eq!(pool.inspect(b, BufferRecord::creator), Ok(Component::Coap));
    assert_eq!(pool.occupancy(), 1);

    assert_eq!(pool.inspect(a, BufferRecord::is_free), Err(PoolError::StaleRecord(a)));
    pool.release(b).unwrap();
    assert_eq!(pool.occupancy(), 0);
}

#[test]
fn test_foreign_release_changes_nothing() {
    let pool = synced_pool();
    let other = synced_pool();
    let mine = pool.acquire(Component::Udp).unwrap();
    let foreign = other.acquire(Component::Udp).unwrap();
    let before = pool.snapshot();

    assert_eq!(pool.release(foreign), Err(PoolError::UnknownRecord(foreign)));
    assert_eq!(pool.release_by(foreign, Component::Udp), Err(PoolError::UnknownRecord(foreign)));
    assert_eq!(pool.snapshot(), before);
    assert_eq!(pool.inspect(mine, BufferRecord::creator), Ok(Component::Udp));
}

#[test]
fn test_release_all_by_creator_is_exact() {
    let pool = synced_pool();
    let udp: Vec<RecordRef> = (0..3).map(|_| pool.acquire(Component::Udp).unwrap()).collect();
    let coap = pool.acquire(Component::Coap).unwrap();
    let tsch = pool.acquire(Component::Tsch).unwrap();
    pool.hand_off(udp[1], Component::Udp, Component::ToMac).unwrap();

    assert_eq!(pool.release_all_by_creator(Component::Udp), 3);
    for record in &udp {
        assert_eq!(pool.inspect(*record, BufferRecord::is_free), Ok(true));
    }
    assert_eq!(pool.inspect(coap, BufferRecord::creator), Ok(Component::Coap));
    assert_eq!(pool.inspect(tsch, BufferRecord::creator), Ok(Component::Tsch));
}

#[test]
fn test_release_all_by_owner_is_exact() {
    let pool = synced_pool();
    let a = pool.acquire(Component::Udp).unwrap();
    let b = pool.acquire(Component::Coap).unwrap();
    pool.hand_off(a, Component::Udp, Component::ToMac).unwrap();

    assert_eq!(pool.release_all_by_owner(Component::ToMac), 1);
    assert_eq!(pool.release_all_by_owner(Component::Forwarding), 0);
    assert_eq!(pool.inspect(a, BufferRecord::is_free), Ok(true));
    assert_eq!(pool.inspect(b, BufferRecord::owner), Ok(Component::Pool));
}

#[test]
fn test_contended_acquire_never_oversubscribes() {
    let pool = synced_pool();
    let creators = [
        Component::Udp,
        Component::Coap,
        Component::Tsch,
        Component::Negotiation,
    ];

    std::thread::scope(|scope| {
        for creator in creators {
            let pool = &pool;
            scope.spawn(move || {
                for _ in 0..500 {
                    if let Some(record) = pool.acquire(creator) {
                        assert!(pool.occupancy() <= pool.capacity());
                        pool.release_by(record, creator).unwrap();
                    }
                }
            });
        }
    });

    assert_eq!(pool.occupancy(), 0);
}

#[derive(Debug, Clone)]
enum Op {
    Acquire(usize, u8),
    Release(usize),
    ReleaseAllBy(usize),
    SetSync(bool),
}

const CREATORS: [Component; 8] = [
    Component::Tsch,
    Component::Reservation,
    Component::Negotiation,
    Component::Udp,
    Component::Coap,
    Component::Rpl,
    Component::App,
    Component::Radio,
];

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..CREATORS.len(), 0u8..12).prop_map(|(c, p)| Op::Acquire(c, p)),
        3 => (0usize..16).prop_map(Op::Release),
        1 => (0..CREATORS.len()).prop_map(Op::ReleaseAllBy),
        1 => any::<bool>().prop_map(Op::SetSync),
    ]
}

proptest! {
    #[test]
    fn allocation_invariants_hold(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let sync = Arc::new(SyncFlag::synchronized());
        let pool = pool_with(&sync);
        let budget = pool.config().open_slots(pool.capacity());
        let mut held: Vec<RecordRef> = Vec::new();

        for op in ops {
            match op {
                Op::Acquire(c, p) => {
                    let creator = CREATORS[c];
                    let data_before = pool.snapshot().slots.iter()
                        .filter(|s| !s.is_free() && !s.creator.is_quota_exempt())
                        .count();
                    match pool.acquire_with_priority(creator, Priority::new(p)) {
                        Some(record) => {
                            prop_assert!(creator.is_sync_exempt() || sync.is_synchronized());
                            prop_assert!(creator.is_quota_exempt() || data_before < budget);
                            held.push(record);
                        }
                        None => {
                            let full = pool.occupancy() == pool.capacity();
                            let gated = !creator.is_sync_exempt() && !sync.is_synchronized();
                            let quota = !creator.is_quota_exempt() && data_before >= budget;
                            prop_assert!(full || gated || quota);
                        }
                    }
                }
                Op::Release(i) => {
                    if !held.is_empty() {
                        let record = held.remove(i % held.len());
                        prop_assert_eq!(pool.release(record), Ok(()));
                        let free = pool.inspect(record, |r| r.clone()).unwrap();
                        prop_assert_eq!(free, BufferRecord::free(MAX_FRAME_LEN));
                    }
                }
                Op::ReleaseAllBy(c) => {
                    let creator = CREATORS[c];
                    let expected = pool.snapshot().count_created_by(creator);
                    prop_assert_eq!(pool.release_all_by_creator(creator), expected);
                    prop_assert_eq!(pool.snapshot().count_created_by(creator), 0);
                    held.retain(|record| {
                        pool.inspect(*record, |r| !r.is_free()).unwrap_or(false)
                    });
                }
                Op::SetSync(on) => sync.set(on),
            }
            prop_assert!(pool.occupancy() <= pool.capacity());
            prop_assert_eq!(pool.occupancy(), held.len());
        }
    }
}
