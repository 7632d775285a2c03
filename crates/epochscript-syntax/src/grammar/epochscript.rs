//! The EpochScript grammar.
//!
//! EpochScript is the subset of Python used for strategy formulas:
//! assignments, expression statements and `if`/`elif`/`else` blocks over
//! an expression language with pipelines, lag/lead operators and builtin
//! calls. Everything else Python offers (classes, functions, loops,
//! imports, lambdas, comprehensions, f-strings, ...) has no rule here and
//! therefore surfaces as a syntax error.

use super::{alt, rule, tok, Grammar, Prec, Rule};
use crate::lexer::TokenKind::{self, *};
use crate::syntax::SyntaxKind;

mod prec {
    pub(super) const PIPELINE: u8 = 1;
    pub(super) const TERNARY: u8 = 2;
    pub(super) const OR: u8 = 3;
    pub(super) const AND: u8 = 4;
    pub(super) const NOT: u8 = 5;
    pub(super) const COMPARE: u8 = 6;
    pub(super) const LAG_LEAD: u8 = 7;
    pub(super) const ADD: u8 = 8;
    pub(super) const MUL: u8 = 9;
    pub(super) const UNARY: u8 = 10;
    pub(super) const POWER: u8 = 11;
    pub(super) const CALL: u8 = 12;
    pub(super) const SUBSCRIPT: u8 = 13;
    pub(super) const ATTRIBUTE: u8 = 14;
}

const COMPARISONS: [TokenKind; 6] = [Lt, Gt, LtEq, GtEq, EqEq, Neq];

fn binary(operator: TokenKind, prec: Prec) -> super::Alternative {
    alt([
        rule("_expr").field("left"),
        tok(operator).field("operator"),
        rule("_expr").field("right"),
    ])
    .node(SyntaxKind::BinaryExpr)
    .prec(prec)
}

fn statements() -> [Rule; 13] {
    [
        Rule::visible("source_file", SyntaxKind::SourceFile)
            .alt(alt([]))
            .alt(alt([rule("_statements")])),
        Rule::hidden("_statements")
            .alt(alt([rule("_statement")]))
            .alt(alt([rule("_statements"), rule("_statement")])),
        Rule::hidden("_statement")
            .alt(alt([rule("_simple_statement"), tok(Newline)]))
            .alt(alt([rule("if_stmt")]))
            .alt(alt([tok(Error)])),
        Rule::hidden("_simple_statement")
            .alt(alt([rule("assign_stmt")]))
            .alt(alt([rule("expr_stmt")])),
        Rule::visible("assign_stmt", SyntaxKind::AssignStmt).alt(alt([
            rule("_target").field("left"),
            tok(Assign),
            rule("_expr").field("right"),
        ])),
        Rule::hidden("_target")
            .alt(alt([rule("name")]))
            .alt(alt([rule("tuple_pattern")])),
        Rule::visible("name", SyntaxKind::Name).alt(alt([tok(Ident)])),
        Rule::visible("tuple_pattern", SyntaxKind::TuplePattern)
            .alt(alt([rule("name"), rule("_more_names")]))
            .alt(alt([rule("name"), rule("_more_names"), tok(Comma)])),
        Rule::hidden("_more_names")
            .alt(alt([tok(Comma), rule("name")]))
            .alt(alt([rule("_more_names"), tok(Comma), rule("name")])),
        Rule::visible("expr_stmt", SyntaxKind::ExprStmt).alt(alt([rule("_expr")])),
        Rule::visible("if_stmt", SyntaxKind::IfStmt)
            .alt(alt([
                tok(KwIf),
                rule("_expr").field("condition"),
                tok(Colon),
                rule("block").field("consequence"),
            ]))
            .alt(alt([
                tok(KwIf),
                rule("_expr").field("condition"),
                tok(Colon),
                rule("block").field("consequence"),
                rule("_elif_clauses"),
            ]))
            .alt(alt([
                tok(KwIf),
                rule("_expr").field("condition"),
                tok(Colon),
                rule("block").field("consequence"),
                rule("else_clause"),
            ]))
            .alt(alt([
                tok(KwIf),
                rule("_expr").field("condition"),
                tok(Colon),
                rule("block").field("consequence"),
                rule("_elif_clauses"),
                rule("else_clause"),
            ])),
        Rule::hidden("_elif_clauses")
            .alt(alt([rule("elif_clause")]))
            .alt(alt([rule("_elif_clauses"), rule("elif_clause")])),
        Rule::visible("elif_clause", SyntaxKind::ElifClause).alt(alt([
            tok(KwElif),
            rule("_expr").field("condition"),
            tok(Colon),
            rule("block").field("consequence"),
        ])),
    ]
}

fn blocks() -> [Rule; 2] {
    [
        Rule::visible("else_clause", SyntaxKind::ElseClause).alt(alt([
            tok(KwElse),
            tok(Colon),
            rule("block").field("body"),
        ])),
        Rule::visible("block", SyntaxKind::Block).alt(alt([
            tok(Newline),
            tok(Indent),
            rule("_statements"),
            tok(Dedent),
        ])),
    ]
}

fn expression() -> Rule {
    let mut expr = Rule::hidden("_expr")
        .alt(
            alt([
                rule("_expr").field("left"),
                tok(Pipe),
                rule("_expr").field("right"),
            ])
            .node(SyntaxKind::PipelineExpr)
            .prec(Prec::left(prec::PIPELINE)),
        )
        .alt(
            alt([
                rule("_expr").field("body"),
                tok(KwIf),
                rule("_expr").field("condition"),
                tok(KwElse),
                rule("_expr").field("orelse"),
            ])
            .node(SyntaxKind::TernaryExpr)
            .prec(Prec::right(prec::TERNARY)),
        )
        .alt(binary(KwOr, Prec::left(prec::OR)))
        .alt(binary(KwAnd, Prec::left(prec::AND)))
        .alt(
            alt([tok(KwNot).field("operator"), rule("_expr").field("operand")])
                .node(SyntaxKind::UnaryExpr)
                .prec(Prec::left(prec::NOT)),
        );

    for operator in COMPARISONS {
        expr = expr.alt(binary(operator, Prec::left(prec::COMPARE)));
    }

    expr = expr
        .alt(
            alt([
                rule("_expr").field("value"),
                tok(Shr),
                rule("_expr").field("periods"),
            ])
            .node(SyntaxKind::LagExpr)
            .prec(Prec::left(prec::LAG_LEAD)),
        )
        .alt(
            alt([
                rule("_expr").field("value"),
                tok(Shl),
                rule("_expr").field("periods"),
            ])
            .node(SyntaxKind::LeadExpr)
            .prec(Prec::left(prec::LAG_LEAD)),
        );

    for operator in [Plus, Minus] {
        expr = expr.alt(binary(operator, Prec::left(prec::ADD)));
    }
    for operator in [Star, Slash, Percent] {
        expr = expr.alt(binary(operator, Prec::left(prec::MUL)));
    }
    for operator in [Minus, Plus] {
        expr = expr.alt(
            alt([tok(operator).field("operator"), rule("_expr").field("operand")])
                .node(SyntaxKind::UnaryExpr)
                .prec(Prec::left(prec::UNARY)),
        );
    }

    expr.alt(binary(Power, Prec::right(prec::POWER)))
        .alt(
            alt([
                rule("_expr").field("function"),
                rule("arg_list").field("arguments"),
            ])
            .node(SyntaxKind::CallExpr)
            .prec(Prec::left(prec::CALL)),
        )
        .alt(
            alt([
                rule("_expr").field("value"),
                tok(LBracket),
                rule("_expr").field("index"),
                tok(RBracket),
            ])
            .node(SyntaxKind::SubscriptExpr)
            .prec(Prec::left(prec::SUBSCRIPT)),
        )
        .alt(
            alt([
                rule("_expr").field("object"),
                tok(Dot),
                tok(Ident).field("attribute"),
            ])
            .node(SyntaxKind::AttributeExpr)
            .prec(Prec::left(prec::ATTRIBUTE)),
        )
        .alt(alt([rule("name_ref")]))
        .alt(alt([rule("builtin_ref")]))
        .alt(alt([rule("literal")]))
        .alt(alt([rule("paren_expr")]))
        .alt(alt([rule("tuple_expr")]))
        .alt(alt([rule("list_expr")]))
        .alt(alt([rule("dict_expr")]))
}

fn primaries() -> [Rule; 13] {
    [
        Rule::visible("arg_list", SyntaxKind::ArgList)
            .alt(alt([tok(LParen), tok(RParen)]))
            .alt(alt([tok(LParen), rule("_args"), tok(RParen)]))
            .alt(alt([tok(LParen), rule("_args"), tok(Comma), tok(RParen)])),
        Rule::hidden("_args")
            .alt(alt([rule("_arg")]))
            .alt(alt([rule("_args"), tok(Comma), rule("_arg")])),
        Rule::hidden("_arg")
            .alt(alt([rule("_expr")]))
            .alt(alt([rule("keyword_arg")])),
        Rule::visible("keyword_arg", SyntaxKind::KeywordArg).alt(alt([
            tok(Ident).field("name"),
            tok(Assign),
            rule("_expr").field("value"),
        ])),
        Rule::visible("paren_expr", SyntaxKind::ParenExpr).alt(alt([
            tok(LParen),
            rule("_expr"),
            tok(RParen),
        ])),
        Rule::visible("tuple_expr", SyntaxKind::TupleExpr)
            .alt(alt([tok(LParen), tok(RParen)]))
            .alt(alt([tok(LParen), rule("_expr"), tok(Comma), tok(RParen)]))
            .alt(alt([tok(LParen), rule("_expr"), rule("_more_exprs"), tok(RParen)]))
            .alt(alt([
                tok(LParen),
                rule("_expr"),
                rule("_more_exprs"),
                tok(Comma),
                tok(RParen),
            ])),
        Rule::hidden("_more_exprs")
            .alt(alt([tok(Comma), rule("_expr")]))
            .alt(alt([rule("_more_exprs"), tok(Comma), rule("_expr")])),
        Rule::visible("list_expr", SyntaxKind::ListExpr)
            .alt(alt([tok(LBracket), tok(RBracket)]))
            .alt(alt([tok(LBracket), rule("_expr"), tok(RBracket)]))
            .alt(alt([tok(LBracket), rule("_expr"), tok(Comma), tok(RBracket)]))
            .alt(alt([tok(LBracket), rule("_expr"), rule("_more_exprs"), tok(RBracket)]))
            .alt(alt([
                tok(LBracket),
                rule("_expr"),
                rule("_more_exprs"),
                tok(Comma),
                tok(RBracket),
            ])),
        Rule::visible("dict_expr", SyntaxKind::DictExpr)
            .alt(alt([tok(LBrace), tok(RBrace)]))
            .alt(alt([tok(LBrace), rule("_entries"), tok(RBrace)]))
            .alt(alt([tok(LBrace), rule("_entries"), tok(Comma), tok(RBrace)])),
        Rule::hidden("_entries")
            .alt(alt([rule("dict_entry")]))
            .alt(alt([rule("_entries"), tok(Comma), rule("dict_entry")])),
        Rule::visible("dict_entry", SyntaxKind::DictEntry)
            .alt(alt([
                tok(Ident).field("key"),
                tok(Colon),
                rule("_expr").field("value"),
            ]))
            .alt(alt([
                tok(StringLiteral).field("key"),
                tok(Colon),
                rule("_expr").field("value"),
            ])),
        Rule::visible("name_ref", SyntaxKind::NameRef).alt(alt([tok(Ident)])),
        Rule::visible("builtin_ref", SyntaxKind::BuiltinRef)
            .alt(alt([tok(BuiltinFunction)]))
            .alt(alt([tok(BuiltinType)])),
    ]
}

fn literal() -> Rule {
    [
        IntLiteral,
        FloatLiteral,
        TimeframeLiteral,
        StringLiteral,
        KwTrue,
        KwFalse,
        KwNone,
    ]
    .into_iter()
    .fold(Rule::visible("literal", SyntaxKind::Literal), |rule, token| {
        rule.alt(alt([tok(token)]))
    })
}

/// Builds the EpochScript grammar definition.
#[must_use]
pub fn epochscript_grammar() -> Grammar {
    let mut grammar = Grammar::new("epochscript")
        .start("source_file")
        .recovery(Error)
        .precedence(Prec::left(prec::PIPELINE), &[Pipe])
        .precedence(Prec::right(prec::TERNARY), &[KwIf, KwElse])
        .precedence(Prec::left(prec::OR), &[KwOr])
        .precedence(Prec::left(prec::AND), &[KwAnd])
        .precedence(Prec::left(prec::COMPARE), &COMPARISONS)
        .precedence(Prec::left(prec::LAG_LEAD), &[Shr, Shl])
        .precedence(Prec::left(prec::ADD), &[Plus, Minus])
        .precedence(Prec::left(prec::MUL), &[Star, Slash, Percent])
        .precedence(Prec::right(prec::POWER), &[Power])
        .precedence(Prec::left(prec::CALL), &[LParen])
        .precedence(Prec::left(prec::SUBSCRIPT), &[LBracket])
        .precedence(Prec::left(prec::ATTRIBUTE), &[Dot]);

    for rule in statements() {
        grammar = grammar.rule(rule);
    }
    for rule in blocks() {
        grammar = grammar.rule(rule);
    }
    grammar = grammar.rule(expression());
    for rule in primaries() {
        grammar = grammar.rule(rule);
    }
    grammar.rule(literal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Action;

    #[test]
    fn test_grammar_compiles_without_conflicts() {
        let table = epochscript_grammar().compile().expect("grammar compiles");
        assert_eq!(table.name(), "epochscript");
        assert!(table.state_count() > 50);
        assert_eq!(table.root_kind(), SyntaxKind::SourceFile);
    }

    #[test]
    fn test_start_state_accepts_empty_input_and_recovers() {
        let table = epochscript_grammar().compile().expect("grammar compiles");
        assert!(matches!(table.action(0, Eof), Action::Reduce(_)));
        assert!(matches!(table.action(0, Ident), Action::Shift(_)));
        assert!(table.is_recovery_state(0));
        assert_eq!(table.action(0, KwElse), Action::Error);
    }

    #[test]
    fn test_field_positions() {
        let table = epochscript_grammar().compile().expect("grammar compiles");
        let position = |kind, name| table.field_position(kind, table.field_id(name)?);
        assert_eq!(position(SyntaxKind::AssignStmt, "left"), Some(0));
        assert_eq!(position(SyntaxKind::AssignStmt, "right"), Some(2));
        assert_eq!(position(SyntaxKind::TernaryExpr, "orelse"), Some(4));
        assert_eq!(position(SyntaxKind::CallExpr, "arguments"), Some(1));
        assert_eq!(position(SyntaxKind::IfStmt, "consequence"), Some(3));
        assert_eq!(position(SyntaxKind::UnaryExpr, "operand"), Some(1));
        assert_eq!(position(SyntaxKind::DictEntry, "key"), Some(0));
        assert_eq!(position(SyntaxKind::NameRef, "left"), None);
    }
}
