//! Shapes of expanded forms.

mod common;

use common::expand;
use hebi::ast::Form;
use hebi::macros::ExpandContext;
use hebi::{Engine, ErrorType, HebiError, QualContext};

#[test]
fn if_with_elif_and_else() {
    let source = "if: c\n  :then: a\n  :elif: d b\n  :else: e\n";
    assert_eq!(
        expand(source),
        ["(hebi.bootstrap.._if_ c (lambda () a) (lambda () d) (lambda () b) : else_ (lambda () e))"]
    );
}

#[test]
fn for_with_label_and_else() {
    let source = "for: :outer x :in xs\n  f: x\n  :else: g:\n";
    assert_eq!(
        expand(source),
        ["(hebi.bootstrap.._for_ xs (lambda (x) (f x)) : else_ (lambda () (g)) label :outer)"]
    );
}

#[test]
fn break_and_continue() {
    assert_eq!(
        expand("break: :outer x\n"),
        ["(hebi.bootstrap..Break x : label :outer)"]
    );
    assert_eq!(expand("continue:\n"), ["(hebi.bootstrap..Continue None)"]);
}

#[test]
fn try_collects_handlers_in_order() {
    let source = "try: f:\n  :except: KeyError :as e\n    g: e\n  :except: pass: A B\n    h:\n  :finally: done:\n";
    assert_eq!(
        expand(source),
        ["(hebi.bootstrap.._try_ (lambda () (f)) KeyError (lambda (e) (g e)) (A B) (lambda (xAUTO0_) (h)) : finally (lambda () (done)))"]
    );
}

#[test]
fn nested_macros_expand_inside_bodies() {
    let source = "with: res\n  not: x\n";
    assert_eq!(
        expand(source),
        ["(hebi.bootstrap.._with_ (lambda () res) (lambda (xAUTO0_) (hebi.bootstrap.._not_ x)))"]
    );
}

#[test]
fn for_with_a_destructuring_target_expands_its_let() {
    let out = expand("for: pass: :, a b\n  :in pairs\n  f: a\n");
    assert_eq!(
        out,
        ["(hebi.bootstrap.._for_ pairs (lambda (xAUTO0_) ((lambda (a b) (f a)) : :* (hebi.bootstrap.._unpack (hebi.bootstrap..entuple (quote :,) (quote a) (quote b)) xAUTO0_))) : label None)"]
    );
}

#[test]
fn mask_qualifies_with_the_unit() {
    let engine = Engine::new();
    let qual = QualContext::for_unit("pkg.mod").with_macro("helper");
    let forms = engine
        .read_expanded("!mask: pass: helper x :,:y\n", &qual)
        .unwrap();
    assert_eq!(
        forms[0].to_string(),
        "(hebi.bootstrap..entuple : :? (quote pkg.mod.._macro_.helper) :? (quote pkg.mod..x) :? y)"
    );
}

#[test]
fn quoted_forms_are_left_alone() {
    assert_eq!(expand("quote: if: x\n"), ["(quote (hebi.basic.._macro_.if_ x))"]);
}

#[test]
fn malformed_macros_are_macro_syntax_errors() {
    let engine = Engine::new();
    let qual = QualContext::new();
    for source in [
        "if: c\n  :else: x\n",
        "for: x xs\n",
        "try: x\n  :finally: a\n  :except: E b\n",
        "!let: x 1\n",
        "raise: e :to c\n",
    ] {
        let err = engine.read_expanded(source, &qual).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MacroSyntax, "{source:?}");
    }
}

#[test]
fn custom_macros_can_be_registered() {
    fn unless(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
        let test = Form::list(vec![Form::sym(ctx.macro_name("not_")), args[0].clone()]);
        let mut then = vec![Form::sym(":then")];
        then.extend_from_slice(&args[1..]);
        Ok(Form::list(vec![
            Form::sym(ctx.macro_name("if_")),
            test,
            Form::List(then),
        ]))
    }

    let mut engine = Engine::new();
    engine.registry_mut().register("unless", unless);
    let forms = engine
        .read_expanded("!unless: c\n  a\n", &QualContext::new())
        .unwrap();
    assert_eq!(
        forms[0].to_string(),
        "(hebi.bootstrap.._if_ (hebi.bootstrap.._not_ c) (lambda () a))"
    );
}
