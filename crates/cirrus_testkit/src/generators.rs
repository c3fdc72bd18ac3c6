//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use crate::fixtures;
use cirrus_model::{
    DocumentKey, FieldValue, Mutation, MutationBatch, ObjectValue, SnapshotVersion, TargetId,
    Timestamp,
};
use proptest::prelude::*;

/// Strategy for generating target ids.
pub fn target_id_strategy() -> impl Strategy<Value = TargetId> {
    (1..1000i32).prop_map(TargetId)
}

/// Strategy for generating a set of distinct target ids.
pub fn distinct_target_ids_strategy(max: usize) -> impl Strategy<Value = Vec<TargetId>> {
    prop::collection::btree_set(1..1000i32, 1..=max.max(1))
        .prop_map(|ids| ids.into_iter().map(TargetId).collect())
}

/// Strategy for generating real (non-sentinel) snapshot versions.
pub fn snapshot_version_strategy() -> impl Strategy<Value = SnapshotVersion> {
    (1..1_000_000i64, 0..1_000_000_000i32).prop_map(|(seconds, nanos)| {
        let timestamp = Timestamp::new(seconds, nanos).expect("Nanos are in range");
        SnapshotVersion::new(timestamp).expect("Seconds are after the epoch")
    })
}

/// Strategy for generating document keys two segments deep.
pub fn document_key_strategy() -> impl Strategy<Value = DocumentKey> {
    (
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        prop::string::string_regex("[a-zA-Z0-9]{1,12}").expect("Invalid regex"),
    )
        .prop_map(|(collection, id)| fixtures::key(&format!("{collection}/{id}")))
}

/// Strategy for generating simple field values.
pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Boolean),
        any::<i64>().prop_map(FieldValue::Integer),
        prop::string::string_regex("[a-z ]{0,16}")
            .expect("Invalid regex")
            .prop_map(FieldValue::String),
    ]
}

/// Strategy for generating small objects.
pub fn object_strategy() -> impl Strategy<Value = ObjectValue> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex"),
        field_value_strategy(),
        0..5,
    )
    .prop_map(ObjectValue::from_fields)
}

/// Strategy for generating set or delete mutations.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (document_key_strategy(), object_strategy())
            .prop_map(|(key, value)| Mutation::set(key, value)),
        document_key_strategy().prop_map(Mutation::delete),
    ]
}

/// Strategy for generating a non-empty batch with the given id.
pub fn batch_strategy(batch_id: i32) -> impl Strategy<Value = MutationBatch> {
    prop::collection::vec(mutation_strategy(), 1..4)
        .prop_map(move |mutations| fixtures::batch(batch_id, mutations))
}

/// Strategy for generating a sequence of batches with ascending ids.
pub fn batch_sequence_strategy(max: usize) -> impl Strategy<Value = Vec<MutationBatch>> {
    prop::collection::vec(prop::collection::vec(mutation_strategy(), 1..4), 1..=max.max(1))
        .prop_map(|groups| {
            groups
                .into_iter()
                .enumerate()
                .map(|(i, mutations)| fixtures::batch(i as i32 + 1, mutations))
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_keys_are_document_keys(key in document_key_strategy()) {
            prop_assert_eq!(key.path().len(), 2);
        }

        #[test]
        fn generated_versions_are_real(version in snapshot_version_strategy()) {
            prop_assert!(version > SnapshotVersion::NONE);
        }

        #[test]
        fn batch_ids_ascend(batches in batch_sequence_strategy(6)) {
            for pair in batches.windows(2) {
                prop_assert!(pair[0].batch_id() < pair[1].batch_id());
            }
        }
    }
}
