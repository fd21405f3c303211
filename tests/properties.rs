//! Property tests over random create/update sequences.

use chrono::{Duration, FixedOffset, TimeZone};
use proptest::prelude::*;
use service_orders::{
    ManualClock, NewOrder, OrderChanges, OrderId, RecordStore, Status, StoreConfig, StoreError,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Clone, Debug)]
enum Op {
    Create { urgent: bool },
    Update { pick: usize, status: Status, executor: bool },
    Resave,
}

fn status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|urgent| Op::Create { urgent }),
        4 => (any::<usize>(), status(), any::<bool>())
            .prop_map(|(pick, status, executor)| Op::Update { pick, status, executor }),
        1 => Just(Op::Resave),
    ]
}

fn open_store(dir: &TempDir) -> RecordStore {
    let start = FixedOffset::east_opt(-3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .unwrap();
    let clock = ManualClock::ticking(start, Duration::seconds(1));
    let config = StoreConfig {
        max_backups: 4,
        ..StoreConfig::in_dir(dir.path())
    };
    RecordStore::open_with_clock(config, Arc::new(clock)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_table_invariants_hold(ops in prop::collection::vec(op(), 1..24)) {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let mut created = 0u64;

        for op in ops {
            match op {
                Op::Create { urgent } => {
                    let order = store
                        .create(NewOrder::new("serviço", "Ana", "Bloco A").urgent(urgent))
                        .unwrap();
                    created += 1;
                    prop_assert_eq!(order.id, OrderId(created));
                }
                Op::Update { pick, status, executor } => {
                    if created == 0 {
                        continue;
                    }
                    let id = OrderId(pick as u64 % created + 1);
                    let was_done = store.load().get(id).unwrap().is_done();
                    let mut changes = OrderChanges::new().status(status);
                    if executor {
                        changes = changes.primary_executor("Ismael");
                    }
                    let before = fs::read(store.primary_path()).unwrap();

                    match store.update(id, changes) {
                        Ok(order) => {
                            prop_assert!(!was_done);
                            prop_assert_eq!(order.status, status);
                        }
                        Err(StoreError::OrderClosed(_)) => prop_assert!(was_done),
                        Err(StoreError::Validation(_)) => {
                            prop_assert!(status.requires_executor());
                            prop_assert_eq!(fs::read(store.primary_path()).unwrap(), before);
                        }
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
                Op::Resave => {
                    let before = fs::read(store.primary_path()).ok();
                    store.save(&store.load()).unwrap();
                    if let Some(before) = before {
                        prop_assert_eq!(fs::read(store.primary_path()).unwrap(), before);
                    }
                }
            }
        }

        let table = store.load();
        prop_assert_eq!(table.len() as u64, created);
        for (i, order) in table.iter().enumerate() {
            prop_assert_eq!(order.id, OrderId(i as u64 + 1));
            prop_assert!(order.completion_consistent());
        }
        prop_assert!(store.list_backups().unwrap().len() <= 4);
    }
}
