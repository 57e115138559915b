//! Reading hot-word text into forms.

mod common;

use common::read;
use hebi::syntax::{Lexer, TokenKind};
use hebi::{qualify, Engine, ErrorType, QualContext};

#[test]
fn polyadic_marker_on_one_line() {
    assert_eq!(read("a: b c"), ["(a b c)"]);
}

#[test]
fn indented_block_continues_the_construct() {
    assert_eq!(read("a:\n  b\n  c\n"), ["(a b c)"]);
    assert_eq!(read("a: b\n  c\nd\n"), ["(a b c)", "d"]);
}

#[test]
fn only_the_outermost_construct_of_a_line_owns_its_block() {
    assert_eq!(read("a: b: c\n  d\n"), ["(a (b c) d)"]);
}

#[test]
fn nested_blocks() {
    let source = "print: 1\n  add: 2\n    3\n  4\nnext\n";
    assert_eq!(read(source), ["(print 1 (add 2 3) 4)", "next"]);
}

#[test]
fn unary_markers_and_no_op_groups() {
    assert_eq!(read("quote:x"), ["(quote x)"]);
    assert_eq!(read("pass: a b"), ["(a b)"]);
    assert_eq!(read("pass:f"), ["(f)"]);
    assert_eq!(read("f: :, a :* b"), ["(f :, a :* b)"]);
}

#[test]
fn embedded_expressions_are_wrapped() {
    assert_eq!(read("print: \"hi\" [1, 2]"), ["(print (\"hi\") ([1, 2]))"]);
    assert_eq!(read("f: (a +\n   b)\ng\n"), ["(f ((a +\n   b)))", "g"]);
}

#[test]
fn numbers_and_reserved_words() {
    assert_eq!(read("f: 1 -2.5 0x10 1+2j"), ["(f 1 -2.5 16 (1+2j))"]);
    assert_eq!(read("not: x"), ["(hebi.basic.._macro_.not_ x)"]);
    assert_eq!(read("!let: x"), ["(hebi.basic.._macro_.let x)"]);
}

#[test]
fn misaligned_dedent_reports_line_and_text() {
    let err = Engine::new().read("a:\n    b\n  c\n").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Indentation);
    assert_eq!(err.line(), Some(3));
    assert!(err.message().contains("\"  c\""));
}

#[test]
fn unterminated_string_is_incomplete() {
    let err = Engine::new().read("print: 'abc").unwrap_err();
    assert!(err.is_incomplete());
}

#[test]
fn atom_count_matches_terminal_tokens() {
    let sources = [
        "a: b c\n",
        "def: f\n  print: \"x\" 1\n  g: h: i\n",
        "for: x :in xs\n  if: x\n    :then: f: x\n",
    ];
    let engine = Engine::new();
    for source in sources {
        let terminals = Lexer::new(source)
            .map(Result::unwrap)
            .filter(|t| !matches!(t.kind, TokenKind::Open | TokenKind::Close(_)))
            .count();
        let atoms: usize = engine
            .read(source)
            .unwrap()
            .iter()
            .map(|form| form.atom_count())
            .sum();
        assert_eq!(atoms, terminals, "{source:?}");
    }
}

#[test]
fn qualification_is_idempotent() {
    let ctx = QualContext::for_unit("pkg.mod").with_macro("helper");
    for symbol in ["x", "helper", "len", "pkg.mod..x", ".upper", "xAUTO0_", "(1)"] {
        let once = qualify(symbol, &ctx);
        assert_eq!(qualify(&once, &ctx), once, "{symbol}");
    }
}
