mod common;
use common::*;

use epochscript_syntax::tree::{child_by_field, child_node_by_field};

/// The expression of a one-line expression statement.
fn expr(source: &str) -> SyntaxNode {
    let parsed = parse(&format!("{source}\n"));
    assert!(parsed.ok(), "{source:?}: {:?}", parsed.errors());
    let stmt = parsed.syntax().first_child().unwrap();
    assert_eq!(stmt.kind(), SyntaxKind::ExprStmt);
    stmt.first_child().unwrap()
}

fn field_text(node: &SyntaxNode, field: &str) -> String {
    child_node_by_field(node, field).unwrap().text().to_string()
}

// Precedence
#[test]
fn test_pipeline_binds_loosest() {
    insta::assert_snapshot!(snapshot_parse("a | b if c else d\n"), @r#"
    SourceFile@0..18
      ExprStmt@0..17
        PipelineExpr@0..17
          NameRef@0..1
            Ident@0..1 "a"
          Pipe@2..3 "|"
          TernaryExpr@4..17
            NameRef@4..5
              Ident@4..5 "b"
            KwIf@6..8 "if"
            NameRef@9..10
              Ident@9..10 "c"
            KwElse@11..15 "else"
            NameRef@16..17
              Ident@16..17 "d"
      Newline@17..18 "\n"
    "#);
}

#[test]
fn test_unary_minus_below_power() {
    insta::assert_snapshot!(snapshot_parse("-a ** b\n"), @r#"
    SourceFile@0..8
      ExprStmt@0..7
        UnaryExpr@0..7
          Minus@0..1 "-"
          BinaryExpr@1..7
            NameRef@1..2
              Ident@1..2 "a"
            Power@3..5 "**"
            NameRef@6..7
              Ident@6..7 "b"
      Newline@7..8 "\n"
    "#);
}

#[test]
fn test_lag_below_addition() {
    insta::assert_snapshot!(snapshot_parse("a >> 1 + 2\n"), @r#"
    SourceFile@0..11
      ExprStmt@0..10
        LagExpr@0..10
          NameRef@0..1
            Ident@0..1 "a"
          Shr@2..4 ">>"
          BinaryExpr@5..10
            Literal@5..6
              IntLiteral@5..6 "1"
            Plus@7..8 "+"
            Literal@9..10
              IntLiteral@9..10 "2"
      Newline@10..11 "\n"
    "#);
}

#[test]
fn test_not_below_comparison() {
    insta::assert_snapshot!(snapshot_parse("not a == b\n"), @r#"
    SourceFile@0..11
      ExprStmt@0..10
        UnaryExpr@0..10
          KwNot@0..3 "not"
          BinaryExpr@4..10
            NameRef@4..5
              Ident@4..5 "a"
            EqEq@6..8 "=="
            NameRef@9..10
              Ident@9..10 "b"
      Newline@10..11 "\n"
    "#);
}

#[test]
fn test_postfix_chain() {
    insta::assert_snapshot!(snapshot_parse("a.b(c)[d]\n"), @r#"
    SourceFile@0..10
      ExprStmt@0..9
        SubscriptExpr@0..9
          CallExpr@0..6
            AttributeExpr@0..3
              NameRef@0..1
                Ident@0..1 "a"
              Dot@1..2 "."
              Ident@2..3 "b"
            ArgList@3..6
              LParen@3..4 "("
              NameRef@4..5
                Ident@4..5 "c"
              RParen@5..6 ")"
          LBracket@6..7 "["
          NameRef@7..8
            Ident@7..8 "d"
          RBracket@8..9 "]"
      Newline@9..10 "\n"
    "#);
}

#[test]
fn test_associativity() {
    let power = expr("a ** b ** c");
    assert_eq!(field_text(&power, "left"), "a");
    assert_eq!(field_text(&power, "right"), "b ** c");

    let ternary = expr("a if b else c if d else e");
    assert_eq!(ternary.kind(), SyntaxKind::TernaryExpr);
    let orelse = child_node_by_field(&ternary, "orelse").unwrap();
    assert_eq!(orelse.kind(), SyntaxKind::TernaryExpr);
    assert_eq!(orelse.text(), "c if d else e");

    let pipeline = expr("a | b | c");
    assert_eq!(field_text(&pipeline, "left"), "a | b");

    let shifted = expr("a >> 1 << 2");
    assert_eq!(shifted.kind(), SyntaxKind::LeadExpr);
    let value = child_node_by_field(&shifted, "value").unwrap();
    assert_eq!(value.kind(), SyntaxKind::LagExpr);
    assert_eq!(field_text(&shifted, "periods"), "2");

    let difference = expr("a - b - c");
    assert_eq!(field_text(&difference, "left"), "a - b");
}

#[test]
fn test_boolean_and_arithmetic_levels() {
    let or = expr("a or b and c");
    assert_eq!(
        child_by_field(&or, "operator").unwrap().kind(),
        SyntaxKind::KwOr
    );
    assert_eq!(field_text(&or, "right"), "b and c");

    let sum = expr("a + b * c % d");
    assert_eq!(field_text(&sum, "right"), "b * c % d");

    let product = expr("-a * b");
    let left = child_node_by_field(&product, "left").unwrap();
    assert_eq!(left.kind(), SyntaxKind::UnaryExpr);
    assert_eq!(left.text(), "-a");

    let compare = expr("a + 1 > b >> 2");
    assert_eq!(
        child_by_field(&compare, "operator").unwrap().kind(),
        SyntaxKind::Gt
    );
    assert_eq!(field_text(&compare, "left"), "a + 1");
    assert_eq!(
        child_node_by_field(&compare, "right").unwrap().kind(),
        SyntaxKind::LagExpr
    );
}

// Collections
#[test]
fn test_one_element_tuple() {
    insta::assert_snapshot!(snapshot_parse("(a,)\n"), @r#"
    SourceFile@0..5
      ExprStmt@0..4
        TupleExpr@0..4
          LParen@0..1 "("
          NameRef@1..2
            Ident@1..2 "a"
          Comma@2..3 ","
          RParen@3..4 ")"
      Newline@4..5 "\n"
    "#);
}

#[test]
fn test_dict_and_list_literals() {
    insta::assert_snapshot!(snapshot_parse("{a: 1, 'b': [1, 2,]}\n"), @r#"
    SourceFile@0..21
      ExprStmt@0..20
        DictExpr@0..20
          LBrace@0..1 "{"
          DictEntry@1..5
            Ident@1..2 "a"
            Colon@2..3 ":"
            Literal@4..5
              IntLiteral@4..5 "1"
          Comma@5..6 ","
          DictEntry@7..19
            StringLiteral@7..10 "'b'"
            Colon@10..11 ":"
            ListExpr@12..19
              LBracket@12..13 "["
              Literal@13..14
                IntLiteral@13..14 "1"
              Comma@14..15 ","
              Literal@16..17
                IntLiteral@16..17 "2"
              Comma@17..18 ","
              RBracket@18..19 "]"
          RBrace@19..20 "}"
      Newline@20..21 "\n"
    "#);
}

#[test]
fn test_parenthesized_and_empty_collections() {
    let paren = expr("(a + b) * c");
    let left = child_node_by_field(&paren, "left").unwrap();
    assert_eq!(left.kind(), SyntaxKind::ParenExpr);

    let items = expr("([], {}, ())");
    assert_eq!(items.kind(), SyntaxKind::TupleExpr);
    let kinds: Vec<SyntaxKind> = items.children().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        [SyntaxKind::ListExpr, SyntaxKind::DictExpr, SyntaxKind::TupleExpr]
    );
}

#[test]
fn test_literals_and_builtins() {
    let call = expr("abs(x, 1.5, 15Min, True, None, 'a')");
    let function = child_node_by_field(&call, "function").unwrap();
    assert_eq!(function.kind(), SyntaxKind::BuiltinRef);
    let arguments = child_node_by_field(&call, "arguments").unwrap();
    let literals = arguments
        .children()
        .filter(|n| n.kind() == SyntaxKind::Literal)
        .count();
    assert_eq!(literals, 5);
}
