mod common;
use common::*;

use epochscript_syntax::ErrorKind;

fn assert_rejected(source: &str) {
    let parsed = parse(source);
    assert!(!parsed.ok(), "{source:?} parsed without errors");
    assert!(
        !parsed.error_nodes().is_empty(),
        "{source:?} produced no error node"
    );
    assert_lossless(source);
}

// Error Recovery
#[test]
fn test_class_definition() {
    let source = "class Foo:\n    pass\n";
    let parsed = parse(source);
    assert!(!parsed.ok());
    let errors = parsed.error_nodes();
    assert!(errors[0].text().to_string().starts_with("class"));
    assert_eq!(
        count_tokens(&parsed.syntax(), SyntaxKind::Indent),
        count_tokens(&parsed.syntax(), SyntaxKind::Dedent)
    );
    assert_lossless(source);
}

#[test]
fn test_python_constructs_outside_the_language() {
    for source in [
        "def f(x):\n    return x\n",
        "@cache\nx = 1\n",
        "label = f\"{a}\"\n",
        "f = lambda x: x\n",
        "y = [v for v in xs]\n",
        "import numpy\n",
        "from os import path\n",
        "for i in xs:\n    x = i\n",
        "while a:\n    b = 1\n",
        "x += 1\n",
        "try:\n    a = 1\nexcept:\n    a = 2\n",
    ] {
        assert_rejected(source);
    }
}

#[test]
fn test_recovery_resumes_at_next_statement() {
    let source = "a = 1\nb = = 2\nc = 3\n";
    let parsed = parse(source);
    assert_eq!(parsed.errors().len(), 1);
    let kinds: Vec<SyntaxKind> = parsed.syntax().children().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        [SyntaxKind::AssignStmt, SyntaxKind::Error, SyntaxKind::AssignStmt]
    );
    assert_eq!(parsed.error_nodes()[0].text(), "b = = 2\n");
}

#[test]
fn test_unclosed_bracket() {
    let source = "x = f(1,\ny = 2\n";
    assert_rejected(source);
}

#[test]
fn test_missing_colon() {
    assert_rejected("if a\n    b = 1\nc = 2\n");
}

#[test]
fn test_unexpected_indent() {
    let source = "a = 1\n    b = 2\nc = 3\n";
    let parsed = parse(source);
    assert!(!parsed.ok());
    assert_eq!(parsed.syntax().first_child().unwrap().kind(), SyntaxKind::AssignStmt);
    assert_eq!(
        parsed.syntax().last_child().unwrap().kind(),
        SyntaxKind::AssignStmt
    );
    assert_lossless(source);
}

#[test]
fn test_lexical_errors() {
    let parsed = parse("x = 'abc\ny = $\n");
    let kinds: Vec<ErrorKind> = parsed.errors().iter().map(|e| e.kind).collect();
    assert!(kinds.iter().all(|k| matches!(k, ErrorKind::Lexical(_))), "{kinds:?}");
    assert_eq!(kinds.len(), 2);
}

#[test]
fn test_diagnostics_name_lines() {
    let parsed = parse("a = 1\nb = )\n");
    let diagnostics = parsed.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].starts_with("line 2: unexpected"), "{diagnostics:?}");
}

#[test]
fn test_errors_are_sorted() {
    let parsed = parse("a = )\nb = 'x\nc = (\n");
    let starts: Vec<_> = parsed.errors().iter().map(|e| e.range.start()).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn test_garbage_is_lossless() {
    for source in [
        ")))\n",
        "::::",
        "if:\nelse:\nelif\n",
        "\t\t x\n  y\n z\n",
        "x = (\n\n\n",
        "a = [1, 2\n  b = {\n",
        "'''\nunterminated",
        "else:\n    x = 1\n",
    ] {
        let parsed = parse(source);
        assert!(!parsed.ok(), "{source:?}");
        assert_lossless(source);
        let root = parsed.syntax();
        assert_eq!(
            count_tokens(&root, SyntaxKind::Indent),
            count_tokens(&root, SyntaxKind::Dedent),
            "{source:?}"
        );
    }
}
