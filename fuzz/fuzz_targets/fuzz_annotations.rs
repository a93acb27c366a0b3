#![no_main]

//! Fuzz target for the `@inject` docblock parser

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use norma_di::{AnnotationParser, DiError, DocParser};

#[derive(Debug, Arbitrary)]
struct Docblock {
    target: String,
    lines: Vec<String>,
    /// Wrap every line in `* ` like a PHP-style comment
    starred: bool,
}

fuzz_target!(|input: Docblock| {
    let doc = if input.starred {
        let body: Vec<String> = input.lines.iter().map(|line| format!(" * {line}")).collect();
        format!("/**\n{}\n */", body.join("\n"))
    } else {
        input.lines.join("\n")
    };

    let parser = DocParser::new();
    let first = parser.parse(&input.target, &doc);

    match &first {
        Ok(annotations) => {
            for (param, annotation) in annotations {
                assert!(param.is_empty() || param.starts_with('$'));
                assert!(!annotation.component().is_empty());
                assert!(!annotation.component().contains(char::is_whitespace));
            }
        }
        Err(err) => assert!(matches!(
            err,
            DiError::InvalidAnnotation { .. } | DiError::MissingAnnotationComponent { .. }
        )),
    }

    // Cached and uncached parses agree
    let second = parser.parse(&input.target, &doc);
    assert_eq!(first.is_ok(), second.is_ok());
    if let (Ok(a), Ok(b)) = (&first, &second) {
        assert_eq!(a.len(), b.len());
    }
});
