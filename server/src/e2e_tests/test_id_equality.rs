//! Test identifier equality across both driver kinds.

use crate::database::{DriverKind, EntityId, is_equal_ids, to_entity_id};

fn sample_ids() -> Vec<EntityId> {
    let local = ["a", "page-1", "507f1f77bcf86cd799439011", "Ünïcode"];
    let object = ["507f1f77bcf86cd799439011", "65a1b2c3d4e5f60718293a4b"];

    local
        .iter()
        .map(|raw| to_entity_id(DriverKind::Local, raw).expect("local id"))
        .chain(
            object
                .iter()
                .map(|raw| to_entity_id(DriverKind::MongoDb, raw).expect("object id")),
        )
        .collect()
}

#[test]
fn test_is_equal_ids_is_reflexive() {
    for id in sample_ids() {
        assert!(is_equal_ids(Some(&id), Some(&id)), "{id:?}");
        assert!(is_equal_ids(Some(&id), Some(&id.clone())), "{id:?}");
    }
}

#[test]
fn test_is_equal_ids_is_symmetric() {
    let ids = sample_ids();
    for a in &ids {
        for b in &ids {
            assert_eq!(
                is_equal_ids(Some(a), Some(b)),
                is_equal_ids(Some(b), Some(a)),
                "{a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn test_is_equal_ids_with_absent_side_is_false() {
    for id in sample_ids() {
        assert!(!is_equal_ids(Some(&id), None));
        assert!(!is_equal_ids(None, Some(&id)));
    }
    assert!(!is_equal_ids(None, None));
}
