//! Cross-component chains: parse → path → edit → patch → diff, exercised
//! the way a caller actually strings these pieces together rather than one
//! component at a time.

use lazyjson_core::diff::{DifferenceKind, Mode};
use lazyjson_core::patch::Op;
use lazyjson_core::{Path, ReaderOptions};

fn parse(text: &str) -> lazyjson_core::VirtualNode {
    lazyjson_core::parse(text, ReaderOptions::default()).unwrap()
}

#[test]
fn array_indexing_reaches_every_element() {
    let doc = parse("[1, 2, 3]");
    assert_eq!(doc.size().unwrap(), 3);
    assert_eq!(doc.get_index(0).number().unwrap().as_f64(), 1.0);
    assert_eq!(doc.get_index(2).number().unwrap().as_f64(), 3.0);
}

#[test]
fn nested_path_navigates_and_reports_out_of_range() {
    let doc = parse(r#"{"a": { "b" : [12, false] } }"#);
    let value = doc.get(&Path::parse(".a.b[1]").unwrap());
    assert!(!value.boolean().unwrap());

    let missing = doc.get(&Path::parse(".a.b[3]").unwrap());
    assert!(missing.is_undefined());
    assert!(missing.number().is_err());
}

#[test]
fn curly_name_escape_reaches_a_dotted_key() {
    let doc = parse(r#"{"some.thing": 42}"#);
    let value = doc.get(&Path::parse("{some.thing}").unwrap());
    assert_eq!(value.number().unwrap().as_f64(), 42.0);
}

#[test]
fn member_order_does_not_affect_default_equivalence_but_affects_identity() {
    let a = parse(r#"{"a":1,"b":2}"#);
    let b = parse(r#"{"b":2,"a":1}"#);
    assert!(a.equivalent_to(&b, Mode::standard()));
    assert!(!a.identical_to(&b));
}

#[test]
fn any_order_diff_reports_the_single_genuine_divergence() {
    let a = parse("[1,2,3]");
    let b = parse("[1,3,2,5]");
    let differences = a.diff(&b, Mode::strict().any_order()).unwrap();
    assert_eq!(differences.len(), 1);
    assert_eq!(differences[0].canonical_path(), "$[3]");
    assert_eq!(differences[0].kind, DifferenceKind::MissingLeft);
}

#[test]
fn patch_rejects_same_target_but_allows_disjoint_siblings() {
    let doc = parse(r#"{"foo": {"bar": 1}}"#);
    let conflicting = vec![
        Op::Insert { path: Path::parse(".foo.bar").unwrap(), value_text: "null".to_string(), merge: false },
        Op::Remove { path: Path::parse(".foo.bar").unwrap() },
    ];
    assert!(doc.patch(&conflicting).is_err());

    let ok = vec![
        Op::Insert { path: Path::parse(".foo.x").unwrap(), value_text: "null".to_string(), merge: false },
        Op::Insert { path: Path::parse(".foo.y").unwrap(), value_text: "null".to_string(), merge: false },
    ];
    let patched = doc.patch(&ok).unwrap();
    assert!(patched.get_member("foo").get_member("x").is_null());
    assert!(patched.get_member("foo").get_member("y").is_null());
}

#[test]
fn edit_then_patch_then_diff_chain() {
    let original = parse(r#"{"name": "ada", "tags": ["math"]}"#);
    let added = original
        .patch(&[Op::Insert { path: Path::parse(".tags[1]").unwrap(), value_text: "\"logic\"".to_string(), merge: false }])
        .unwrap();
    assert_eq!(added.get_member("tags").size().unwrap(), 2);

    let removed = added.patch(&[Op::Remove { path: Path::parse(".tags[0]").unwrap() }]).unwrap();
    assert_eq!(removed.get_member("tags").get_index(0).string().unwrap(), "logic");

    let differences = original.diff(&removed, Mode::standard()).unwrap();
    assert!(!differences.is_empty());
}
