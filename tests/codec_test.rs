//! The serialization boundary reports that no codec is available.

use vertree::util::testing::init_test_setup;
use vertree::{decode, encode, JsonCodec, TreeArena, TreeCodec, TreeError};

#[test]
fn given_tree_when_encoding_then_not_implemented() {
    init_test_setup();
    let mut tree = TreeArena::new();
    let root = tree.make_map();
    let leaf = tree.make_leaf("x");
    tree.map_set(root, "x", Some(leaf.node())).unwrap();

    let err = encode(&tree, root.node()).unwrap_err();

    assert_eq!(err, TreeError::NotImplemented("encode"));
    assert!(!err.is_invariant_violation());
    assert_eq!(JsonCodec.encode(&tree, root.node()).unwrap_err(), err);
    assert_eq!(tree.version(root).unwrap(), 2);
}

#[test]
fn given_bytes_when_decoding_then_not_implemented_and_tree_untouched() {
    init_test_setup();
    let mut tree = TreeArena::new();

    let err = decode(&mut tree, br#"{"x": 1}"#).unwrap_err();

    assert_eq!(err, TreeError::NotImplemented("decode"));
    assert_eq!(tree.node_count(), 0);
}
