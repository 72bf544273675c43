//! Safe-mode gating of include resolution and attribute-driven configuration.

use std::path::PathBuf;

use rstest::rstest;
use scriba_parser::{Options, SafeMode, parse, parse_file};

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn document_json(path: &str, safe_mode: SafeMode) -> (String, Vec<scriba_parser::Diagnostic>) {
    let options = Options::builder().with_safe_mode(safe_mode).build();
    let document = parse_file(fixture(path), &options).expect("parse failed");
    let json = serde_json::to_string(&document).expect("serialize failed");
    (json, document.diagnostics)
}

#[test]
fn secure_mode_reads_no_include_at_all() {
    let (json, diagnostics) = document_json("includes/base/main.sba", SafeMode::Secure);
    assert!(!json.contains("Chapter content"));
    assert!(!json.contains("CONFIDENTIAL-MARKER"));
    assert!(json.contains("Unresolved directive"));
    assert!(diagnostics.len() >= 2, "both includes must be refused");
}

#[test]
fn safe_mode_confines_includes_to_the_base_directory() {
    let (json, diagnostics) = document_json("includes/base/main.sba", SafeMode::Safe);
    // Inside the subtree: expanded.
    assert!(json.contains("Chapter content"));
    // Outside the subtree: refused, never read.
    assert!(!json.contains("CONFIDENTIAL-MARKER"));
    assert!(json.contains("Unresolved directive"));
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("escapes the base directory")),
        "expected a containment warning, got {diagnostics:?}"
    );
}

#[test]
fn unsafe_mode_follows_both_includes() {
    let (json, _) = document_json("includes/base/main.sba", SafeMode::Unsafe);
    assert!(json.contains("Chapter content"));
    assert!(json.contains("CONFIDENTIAL-MARKER"));
}

#[rstest]
#[case::safe(SafeMode::Safe)]
#[case::server(SafeMode::Server)]
fn confining_modes_still_expand_contained_includes(#[case] safe_mode: SafeMode) {
    let (json, _) = document_json("includes/base/main.sba", safe_mode);
    assert!(json.contains("Chapter content"));
    assert!(!json.contains("CONFIDENTIAL-MARKER"));
}

#[test]
fn nested_includes_are_filtered_recursively() {
    let (json, _) = document_json("includes/base/nested.sba", SafeMode::Safe);
    assert!(json.contains("Conditional content from the nested include"));
    assert!(json.contains("Chapter content"));
}

#[test]
fn server_mode_ignores_backend_entries_from_the_document() {
    let options = Options::builder().with_safe_mode(SafeMode::Server).build();
    let document = parse(":backend: docbook\n\ntext\n", &options).expect("parse failed");
    assert_eq!(document.backend, "html5");
    assert!(
        document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("locked attribute")),
        "expected the locked-attribute warning"
    );
}

#[test]
fn unsafe_mode_honors_backend_entries() {
    let options = Options::builder().with_safe_mode(SafeMode::Unsafe).build();
    let document = parse(":backend: docbook\n\ntext\n", &options).expect("parse failed");
    assert_eq!(document.backend, "docbook");
}

#[test]
fn host_locked_attribute_is_protected_at_server_level() {
    let options = Options::builder()
        .with_safe_mode(SafeMode::Server)
        .with_locked_attribute("theme", "corporate")
        .build();
    let document = parse(":theme: midnight\n\n{theme}\n", &options).expect("parse failed");
    let json = serde_json::to_string(&document).expect("serialize failed");
    assert!(json.contains("corporate"));
    assert!(!json.contains("midnight"));
}

#[test]
fn escaped_include_is_untouched_text() {
    let options = Options::builder().with_safe_mode(SafeMode::Secure).build();
    let document =
        parse("\\include::secret.sba[]\n", &options).expect("parse failed");
    assert!(document.diagnostics.is_empty());
    let json = serde_json::to_string(&document).expect("serialize failed");
    assert!(json.contains("include::secret.sba[]"));
}
