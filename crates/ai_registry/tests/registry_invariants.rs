//! Property tests: registry invariants hold under arbitrary operation
//! sequences and survive a reload from disk.

use chrono::Utc;
use potability_ai_registry::{RegistryError, VersionId, VersionRecord, VersionRegistry};
use proptest::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Op {
    /// Register the next version with this many extra samples
    Add(usize),
    /// Switch to the n-th existing record (modulo length)
    Switch(usize),
    /// Remove the n-th existing record (modulo length)
    Remove(usize),
    /// Switch to an id that does not exist
    SwitchUnknown(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..5).prop_map(Op::Add),
        2 => any::<usize>().prop_map(Op::Switch),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (1000u32..2000).prop_map(Op::SwitchUnknown),
    ]
}

fn record(id: VersionId, samples: usize, added: usize) -> VersionRecord {
    VersionRecord {
        version_id: id,
        created_at: Utc::now(),
        training_sample_count: samples,
        incremental_sample_count: added,
        train_accuracy: 0.8,
        cv_accuracy: 0.6,
        description: String::new(),
        artifact_hash: String::new(),
    }
}

fn assert_invariants(registry: &VersionRegistry) {
    let records = registry.list();
    assert_eq!(records[0].version_id, VersionId::Original);
    assert!(registry.get_current().is_ok());

    for pair in records.windows(2) {
        assert!(pair[0].version_id < pair[1].version_id);
        assert!(pair[0].training_sample_count <= pair[1].training_sample_count);
    }
    for r in records {
        assert!(r.version_id.number() <= registry.last_allocated());
    }
    assert_eq!(
        registry.list_views().iter().filter(|v| v.is_current).count(),
        1
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn invariants_hold_for_any_sequence(ops in prop::collection::vec(op(), 1..25)) {
        let dir = TempDir::new().unwrap();
        let mut registry =
            VersionRegistry::initialize(dir.path(), record(VersionId::Original, 100, 0)).unwrap();
        let mut samples = 100;
        let mut allocated = Vec::new();

        for op in ops {
            let before = registry.clone();
            match op {
                Op::Add(extra) => {
                    samples += extra;
                    let id = registry.next_version_id();
                    registry.add_version(record(id, samples, extra)).unwrap();
                    prop_assert!(!allocated.contains(&id), "{} allocated twice", id);
                    allocated.push(id);
                }
                Op::Switch(n) => {
                    let id = registry.list()[n % registry.len()].version_id;
                    registry.switch_current(id).unwrap();
                    prop_assert_eq!(registry.current_id(), id);
                }
                Op::Remove(n) => {
                    let id = registry.list()[n % registry.len()].version_id;
                    match registry.remove(id) {
                        Ok(removed) => prop_assert_eq!(removed.version_id, id),
                        Err(RegistryError::ProtectedVersion { .. }) => {
                            prop_assert!(id.is_original() || id == registry.current_id());
                            prop_assert_eq!(&registry, &before);
                        }
                        Err(e) => return Err(TestCaseError::fail(e.to_string())),
                    }
                }
                Op::SwitchUnknown(n) => {
                    let result = registry.switch_current(VersionId::Numbered(n));
                    prop_assert!(matches!(result, Err(RegistryError::NotFound(_))));
                    prop_assert_eq!(&registry, &before);
                }
            }

            assert_invariants(&registry);
            let reloaded = VersionRegistry::load(dir.path()).unwrap();
            prop_assert_eq!(&reloaded, &registry);
        }
    }
}
