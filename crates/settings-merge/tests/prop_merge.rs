/// Property-based tests for the merge engine.
///
/// Uses `proptest` to generate random settings documents and check the
/// invariants that must hold for every input:
///
/// - merging an array-free object with itself reproduces it exactly
/// - repeated array merges keep growing
/// - an incoming `null` never replaces an existing binding
/// - novel keys land after all original keys, in incoming order
/// - the merged document is the same through the text bridge
use std::collections::HashSet;

use proptest::prelude::*;
use settings_merge::{merge, merge_array, merge_documents, merge_object, serialize, Object, Value};

// ============================================================================
// Strategies
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]{1,2}").unwrap()
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| Value::Number(n.into())),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

/// Documents with nested objects and arrays, up to a few levels deep.
fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..6)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

/// Like [`arb_value`] but without arrays, so self-merge is an identity.
fn arb_array_free_object() -> impl Strategy<Value = Object> {
    let leaf = arb_scalar();
    let tree = leaf.prop_recursive(4, 48, 6, |inner| {
        prop::collection::vec((arb_key(), inner), 0..6)
            .prop_map(|pairs| Value::Object(pairs.into_iter().collect()))
    });
    prop::collection::vec((arb_key(), tree), 0..6).prop_map(|pairs| pairs.into_iter().collect())
}

fn arb_object() -> impl Strategy<Value = Object> {
    prop::collection::vec((arb_key(), arb_value()), 0..8)
        .prop_map(|pairs| pairs.into_iter().collect())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn self_merge_is_identity_without_arrays(o in arb_array_free_object()) {
        prop_assert_eq!(merge_object(&o, &o), o);
    }

    #[test]
    fn repeated_array_merge_grows(
        a1 in prop::collection::vec(arb_value(), 0..5),
        a2 in prop::collection::vec(arb_value(), 1..5),
    ) {
        let once = merge_array(&a1, &a2);
        let twice = merge_array(&once, &a2);
        prop_assert_eq!(once.len(), a1.len() + a2.len());
        prop_assert_eq!(twice.len(), once.len() + a2.len());
        prop_assert_ne!(twice, once);
    }

    #[test]
    fn incoming_null_preserves_original(
        o1 in arb_object(),
        nulls in prop::collection::vec(any::<prop::sample::Index>(), 0..4),
    ) {
        prop_assume!(!o1.is_empty());
        let original_keys: Vec<&str> = o1.keys().collect();
        let o2: Object = nulls
            .iter()
            .map(|ix| (ix.get(&original_keys).to_string(), Value::Null))
            .collect();
        let merged = merge_object(&o1, &o2);
        prop_assert_eq!(merged, o1);
    }

    #[test]
    fn novel_keys_follow_original_keys(o1 in arb_object(), o2 in arb_object()) {
        let merged = merge_object(&o1, &o2);
        let merged_keys: Vec<&str> = merged.keys().collect();
        let original_keys: Vec<&str> = o1.keys().collect();
        let original_set: HashSet<&str> = original_keys.iter().copied().collect();
        let novel: Vec<&str> = o2.keys().filter(|k| !original_set.contains(k)).collect();

        prop_assert_eq!(merged_keys.len(), original_keys.len() + novel.len());
        prop_assert_eq!(&merged_keys[..original_keys.len()], &original_keys[..]);
        prop_assert_eq!(&merged_keys[original_keys.len()..], &novel[..]);
    }

    #[test]
    fn non_null_incoming_scalars_win(o1 in arb_object(), o2 in arb_object()) {
        let merged = merge_object(&o1, &o2);
        for (key, v2) in &o2 {
            let got = merged.get(key).unwrap();
            match o1.get(key) {
                None => prop_assert_eq!(got, v2),
                Some(v1) if v2.is_null() => prop_assert_eq!(got, v1),
                Some(v1) if v1.kind() == v2.kind() && v1.is_container() => {}
                Some(_) => prop_assert_eq!(got, v2),
            }
        }
    }

    #[test]
    fn text_merge_matches_tree_merge(o1 in arb_object(), o2 in arb_object()) {
        let original = Value::Object(o1);
        let incoming = Value::Object(o2);
        let tree = merge(&original, &incoming).unwrap();
        let text = merge_documents(
            &serialize(&original).unwrap(),
            &serialize(&incoming).unwrap(),
        )
        .unwrap();
        prop_assert_eq!(text, serialize(&tree).unwrap());
    }
}
