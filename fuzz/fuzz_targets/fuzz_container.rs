#![no_main]

//! Fuzz target for configuration, qualification and resolution
//!
//! Arbitrary key paths exercise the qualification trie and config flattening; the
//! invariants checked are the ones a caller can observe through the public API.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use norma_di::{ConfigTree, Container, DiError, Value};

#[derive(Debug, Arbitrary)]
enum Leaf {
    Int(i64),
    Text(String),
    Flag(bool),
}

impl From<Leaf> for Value {
    fn from(leaf: Leaf) -> Self {
        match leaf {
            Leaf::Int(n) => Value::Int(n),
            Leaf::Text(s) => Value::Str(s),
            Leaf::Flag(b) => Value::Bool(b),
        }
    }
}

/// Operations to perform on the container
#[derive(Debug, Arbitrary)]
enum ContainerOp {
    /// Declare a leaf under raw (unvalidated) segment names
    Declare(Vec<String>, Leaf),
    /// Declare through a dotted path
    Set(String, Leaf),
    Get(String),
    Qualify(String),
    Bind(String, String, Leaf),
    RoundTrip,
}

fn nested(segments: &[String], leaf: Leaf) -> Option<ConfigTree> {
    let (last, parents) = segments.split_last()?;
    let mut tree = ConfigTree::new().leaf(last.clone(), leaf);
    for parent in parents.iter().rev() {
        tree = ConfigTree::new().branch(parent.clone(), tree);
    }
    Some(tree)
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();

    for op in ops {
        match op {
            ContainerOp::Declare(segments, leaf) => {
                let reserved = segments.iter().any(|segment| segment.contains('|'));
                let Some(tree) = nested(&segments, leaf) else {
                    continue;
                };
                let before = container.len();
                match container.add_config(tree) {
                    Ok(()) => assert!(!reserved),
                    Err(DiError::ConfigurationKeyConflict { .. }) => {
                        assert!(reserved);
                        assert_eq!(container.len(), before);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            ContainerOp::Set(path, leaf) => {
                let _ = container.add_config(ConfigTree::new().set(&path, leaf));
            }
            ContainerOp::Get(name) => {
                let _ = container.get(name.as_str());
            }
            ContainerOp::Qualify(name) => match container.qualify(&name) {
                Ok(qualified) => {
                    // Qualification is idempotent
                    assert_eq!(container.qualify(&qualified).ok(), Some(qualified));
                }
                Err(err) => assert!(matches!(err, DiError::AmbiguousComponentName { .. })),
            },
            ContainerOp::Bind(consumer, needed, leaf) => {
                container.bind_contextually(&consumer, &needed, leaf);
            }
            ContainerOp::RoundTrip => {
                let config = container.get_config();
                let copy = Container::new();
                copy.add_config(config.clone()).unwrap();
                assert_eq!(copy.get_config(), config);
                assert_eq!(copy.len(), container.len());
            }
        }
    }
});
