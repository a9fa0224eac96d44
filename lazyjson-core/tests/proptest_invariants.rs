//! Property-based checks for the §8 invariants: round-tripping, equivalence
//! reflexivity/symmetry, and patch idempotency.

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use lazyjson_core::diff::Mode;
use lazyjson_core::{ReaderOptions, VirtualNode};

fn json_leaf() -> BoxedStrategy<String> {
    prop_oneof![
        Just("null".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        any::<i32>().prop_map(|n| n.to_string()),
        "[a-zA-Z0-9 ]{0,8}".prop_map(|s| format!("\"{s}\"")),
    ]
    .boxed()
}

fn json_value() -> BoxedStrategy<String> {
    let leaf = json_leaf();
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| format!("[{}]", items.join(","))),
            proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                let body: Vec<String> = entries.iter().map(|(k, v)| format!("\"{k}\":{v}")).collect();
                format!("{{{}}}", body.join(","))
            }),
        ]
    })
    .boxed()
}

fn parse(text: &str) -> VirtualNode {
    lazyjson_core::parse(text, ReaderOptions::default()).unwrap()
}

proptest! {
    #[test]
    fn minimized_round_trip_reparses_to_an_equivalent_document(text in json_value()) {
        let first = parse(&text);
        let minimized = first.to_minimized_json().unwrap();
        let second = parse(&minimized);
        prop_assert!(first.equivalent_to(&second, Mode::standard()));
    }

    #[test]
    fn equivalent_to_is_reflexive(text in json_value()) {
        let node = parse(&text);
        prop_assert!(node.equivalent_to(&node, Mode::standard()));
    }

    #[test]
    fn equivalent_to_is_symmetric(a in json_value(), b in json_value()) {
        let na = parse(&a);
        let nb = parse(&b);
        prop_assert_eq!(
            na.equivalent_to(&nb, Mode::standard()),
            nb.equivalent_to(&na, Mode::standard())
        );
    }

    #[test]
    fn patch_with_no_ops_is_idempotent(text in json_value()) {
        let node = parse(&text);
        let patched_once = node.patch(&[]).unwrap();
        let patched_twice = patched_once.patch(&[]).unwrap();
        prop_assert!(patched_once.equivalent_to(&patched_twice, Mode::standard()));
    }
}
