//! Expanded code evaluated by the reference runtime.

mod common;

use common::{ints, pair, run, run_in, unhandled_type, with_list, with_recorder, Recorder};
use hebi::runtime::{Interpreter, Value};
use hebi::{Engine, QualContext};

// ============================================================================
// CONDITIONALS AND BOOLEANS
// ============================================================================

#[test]
fn false_condition_selects_the_else_branch() {
    let source = "if: False\n  :then: 1\n  :else: 2\n";
    assert_eq!(run(source).unwrap(), Value::Int(2));
}

#[test]
fn elif_branches_are_tried_in_order() {
    let source = "if: False\n  :then: 1\n  :elif: False 2\n  :elif: True 3\n  :else: 4\n";
    assert_eq!(run(source).unwrap(), Value::Int(3));
}

#[test]
fn if_without_else_yields_the_empty_tuple() {
    let value = run("if: False\n  :then: 1\n").unwrap();
    assert_eq!(value, Value::tuple(Vec::new()));
}

#[test]
fn and_or_short_circuit() {
    // `nope` is undefined, so evaluating it would raise.
    assert_eq!(run("and: 1 0 nope\n").unwrap(), Value::Int(0));
    assert_eq!(run("or: 0 :x nope\n").unwrap(), Value::str(":x"));
    assert_eq!(run("and: 1 2\n").unwrap(), Value::Int(2));
    assert_eq!(run("not: 0\n").unwrap(), Value::Bool(true));
}

// ============================================================================
// LOOPS
// ============================================================================

#[test]
fn unlabeled_break_leaves_only_the_innermost_loop() {
    let (interp, acc) = with_list("acc");
    let source = "\
for: i :in range: 3
  for: j :in range: 3
    if: operator..eq: j 1
      :then: break:
    .append: acc hebi.bootstrap..entuple: i j
";
    run_in(&interp, source).unwrap();
    assert_eq!(acc, Value::list(vec![pair(0, 0), pair(1, 0), pair(2, 0)]));
}

#[test]
fn labeled_break_leaves_the_labeled_loop() {
    let (interp, acc) = with_list("acc");
    let source = "\
for: :outer i :in range: 3
  for: j :in range: 3
    if: operator..eq: j 1
      :then: break: :outer
    .append: acc hebi.bootstrap..entuple: i j
  :else: :finished
";
    let result = run_in(&interp, source).unwrap();
    assert_eq!(result, Value::None);
    assert_eq!(acc, Value::list(vec![pair(0, 0)]));
}

#[test]
fn break_value_becomes_the_loop_result() {
    let source = "\
for: x :in range: 10
  if: operator..eq: x 3
    :then: break: x
";
    assert_eq!(run(source).unwrap(), Value::Int(3));
}

#[test]
fn else_runs_when_the_loop_finishes() {
    let source = "for: x :in range: 2\n  x\n  :else: :done\n";
    assert_eq!(run(source).unwrap(), Value::str(":done"));
}

#[test]
fn continue_skips_the_rest_of_the_body() {
    let (interp, acc) = with_list("acc");
    let source = "\
for: x :in range: 4
  if: operator..eq: x 1
    :then: continue:
  .append: acc x
";
    run_in(&interp, source).unwrap();
    assert_eq!(acc, Value::list(ints(&[0, 2, 3])));
}

#[test]
fn labeled_continue_resumes_the_outer_loop() {
    let (interp, acc) = with_list("acc");
    let source = "\
for: :outer i :in range: 2
  for: j :in range: 3
    if: operator..eq: j 1
      :then: continue: :outer
    .append: acc hebi.bootstrap..entuple: i j
  .append: acc :never
";
    run_in(&interp, source).unwrap();
    assert_eq!(acc, Value::list(vec![pair(0, 0), pair(1, 0)]));
}

#[test]
fn break_outside_a_loop_is_an_error() {
    let err = run("break:\n").unwrap_err();
    assert_eq!(err.error_type(), hebi::ErrorType::Eval);
}

#[test]
fn loop_recurs_without_growing_the_stack() {
    let (interp, acc) = with_list("acc");
    let source = "\
!loop: pass: recur n 0
  if: operator..lt: n 3
    :then:
      .append: acc n
      recur: operator..add: n 1
";
    run_in(&interp, source).unwrap();
    assert_eq!(acc, Value::list(ints(&[0, 1, 2])));
}

// ============================================================================
// CONDITIONS
// ============================================================================

fn with_log_and_dict() -> (Interpreter, Value) {
    let (interp, log) = with_list("log");
    interp.define("d", Value::dict(vec![(":k".to_string(), Value::Int(1))]));
    (interp, log)
}

#[test]
fn handler_catches_by_supertype_and_finally_runs() {
    let (interp, log) = with_log_and_dict();
    let source = "\
try: operator..getitem: d :missing
  :except: LookupError :as e
    .append: log operator..getitem: e.args 0
  :else:
    .append: log :else
  :finally:
    .append: log :finally
";
    run_in(&interp, source).unwrap();
    assert_eq!(log, Value::list(vec![Value::str(":missing"), Value::str(":finally")]));
}

#[test]
fn else_runs_only_on_success() {
    let (interp, log) = with_log_and_dict();
    let source = "\
try: operator..getitem: d :k
  :except: KeyError
    .append: log :handler
  :else:
    .append: log :else
  :finally:
    .append: log :finally
";
    run_in(&interp, source).unwrap();
    assert_eq!(log, Value::list(vec![Value::str(":else"), Value::str(":finally")]));
}

#[test]
fn unmatched_conditions_propagate_after_finally() {
    let (interp, log) = with_log_and_dict();
    let source = "\
try: operator..getitem: d :missing
  :except: TypeError
    .append: log :handler
  :finally:
    .append: log :finally
";
    let err = run_in(&interp, source).unwrap_err();
    assert_eq!(unhandled_type(&err), "KeyError");
    assert_eq!(log, Value::list(vec![Value::str(":finally")]));
}

#[test]
fn bare_raise_reraises_the_handled_condition() {
    let (interp, _) = with_log_and_dict();
    let source = "\
try: operator..getitem: d :missing
  :except: KeyError
    raise:
";
    let err = run_in(&interp, source).unwrap_err();
    assert_eq!(unhandled_type(&err), "KeyError");
}

#[test]
fn raise_constructs_and_chains() {
    let err = run("raise: ValueError: \"bad\"\n").unwrap_err();
    assert_eq!(unhandled_type(&err), "ValueError");
    assert_eq!(err.message(), "bad");

    let source = "\
try: raise: KeyError :from ValueError
  :except: KeyError :as e
    e.__cause__
";
    let cause = run(source).unwrap();
    assert_eq!(cause.to_string(), "ValueError()");
}

#[test]
fn assert_builds_its_message_only_on_failure() {
    assert_eq!(run("assert: True nope\n").unwrap(), Value::None);
    let err = run("assert:\n  operator..eq: 1 2\n  \"math is broken\"\n").unwrap_err();
    assert_eq!(unhandled_type(&err), "AssertionError");
    assert_eq!(err.message(), "math is broken");
}

// ============================================================================
// RESOURCES
// ============================================================================

#[test]
fn with_binds_the_entered_value_and_exits() {
    let (interp, log) = with_list("log");
    let recorder = with_recorder(&interp, "res", Recorder::default());
    run_in(&interp, "with: res :as r\n  .append: log r\n").unwrap();
    assert_eq!(log, Value::list(vec![Value::str("entered")]));
    assert_eq!(recorder.events(), ["enter", "exit"]);
}

#[test]
fn with_exits_on_raise_and_may_suppress() {
    let interp = Interpreter::new();
    let recorder = with_recorder(&interp, "res", Recorder::default());
    let err = run_in(&interp, "with: res\n  raise: KeyError\n").unwrap_err();
    assert_eq!(unhandled_type(&err), "KeyError");
    assert_eq!(recorder.events(), ["enter", "exit raised"]);

    let interp = Interpreter::new();
    let recorder = with_recorder(&interp, "res", Recorder::suppressing());
    assert_eq!(run_in(&interp, "with: res\n  raise: KeyError\n").unwrap(), Value::None);
    assert_eq!(recorder.events(), ["enter", "exit raised"]);
}

#[test]
fn with_exits_when_a_loop_signal_passes_through() {
    let interp = Interpreter::new();
    let recorder = with_recorder(&interp, "res", Recorder::default());
    let source = "for: x :in range: 3\n  with: res\n    break: x\n";
    assert_eq!(run_in(&interp, source).unwrap(), Value::Int(0));
    assert_eq!(recorder.events(), ["enter", "exit"]);
}

// ============================================================================
// BINDINGS
// ============================================================================

#[test]
fn positional_destructuring_with_rest_list() {
    let source = "\
!let: pass: :, a b :list rest
  :be quote:pass: 1 2 3 4
  hebi.bootstrap..entuple: a b rest
";
    assert_eq!(
        run(source).unwrap(),
        Value::tuple(vec![
            Value::Int(1),
            Value::Int(2),
            Value::list(ints(&[3, 4])),
        ])
    );
}

#[test]
fn nested_positional_targets_and_skips() {
    let source = "\
!let: pass: :, _ pass: :, x y :as whole
  :be quote:pass: 0 pass: 5 6
  hebi.bootstrap..entuple: x y whole
";
    let value = run(source).unwrap();
    assert_eq!(value.to_string(), "(5, 6, (5, 6))");
}

#[test]
fn iter_and_positional_as_share_one_source() {
    let source = "\
!let: pass: :, a :iter it :as whole
  :be list: range: 1 4
  hebi.bootstrap..entuple: a list:it whole
";
    let value = run(source).unwrap();
    assert_eq!(value.to_string(), "(1, [2, 3], [1, 2, 3])");
}

#[test]
fn too_few_values_is_a_value_error() {
    let source = "!let: pass: :, a b c\n  :be quote:pass: 1 2\n  a\n";
    assert_eq!(unhandled_type(&run(source).unwrap_err()), "ValueError");
}

#[test]
fn keyed_destructuring_with_defaults() {
    let interp = Interpreter::new();
    interp.define(
        "d",
        Value::dict(vec![
            (":a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
        ]),
    );
    let source = "\
!let:
  pass: := a :a c :c
    pass: :strs b
    pass: :default c 5
  :be d
  hebi.bootstrap..entuple: a c b
";
    let value = run_in(&interp, source).unwrap();
    assert_eq!(value, Value::tuple(ints(&[1, 5, 2])));
}

#[test]
fn missing_key_without_default_names_the_key() {
    let interp = Interpreter::new();
    interp.define("d", Value::dict(Vec::new()));
    let err = run_in(&interp, "!let: pass: := a :zz\n  :be d\n  a\n").unwrap_err();
    assert_eq!(unhandled_type(&err), "KeyError");
    assert!(err.message().contains(":zz"));
}

#[test]
fn for_destructures_each_item() {
    let (interp, acc) = with_list("acc");
    let source = "\
for: pass: :, a b
  :in quote:pass:
    pass: 1 2
    pass: 3 4
  .append: acc operator..add: a b
";
    run_in(&interp, source).unwrap();
    assert_eq!(acc, Value::list(ints(&[3, 7])));
}

#[test]
fn def_binds_globals_and_functions() {
    let interp = Interpreter::new();
    let source = "\
def: factor 2
def: pass: scale x
  \"Multiplies by the factor.\"
  operator..mul: x factor
scale: 21
";
    assert_eq!(run_in(&interp, source).unwrap(), Value::Int(42));
    assert_eq!(interp.global("factor"), Some(Value::Int(2)));
}

// ============================================================================
// CLASSES
// ============================================================================

const POINT: &str = "\
class: pass: Point
  \"A point.\"
  def: .dims 2
  def: pass: .__init__ self x y
    setattr: self quote:x x
    setattr: self quote:y y
  def: pass: .total self
    operator..add: self.x self.y
def: p Point: 3 4
";

#[test]
fn class_body_fills_the_namespace() {
    let interp = Interpreter::new();
    run_in(&interp, POINT).unwrap();
    let value = run_in(
        &interp,
        "hebi.bootstrap..entuple: pass:p.total p.dims Point.__doc__ Point.__name__\n",
    )
    .unwrap();
    assert_eq!(value.to_string(), "(7, 2, 'A point.', 'Point')");
    assert_eq!(run_in(&interp, ".total: p\n").unwrap(), Value::Int(7));
    assert_eq!(run_in(&interp, "isinstance: p Point\n").unwrap(), Value::Bool(true));
}

#[test]
fn subclasses_inherit_and_override() {
    let interp = Interpreter::new();
    run_in(&interp, POINT).unwrap();
    let source = "\
class: pass: Point3 Point
  def: .dims 3
def: q Point3: 1 2
hebi.bootstrap..entuple: pass:q.total q.dims isinstance: q Point
";
    assert_eq!(run_in(&interp, source).unwrap().to_string(), "(3, 3, True)");
    assert_eq!(interp.global("p").map(|p| p.to_string()), Some("<Point object>".into()));
}

#[test]
fn class_without_init_rejects_arguments() {
    let source = "class: pass: Empty\n  def: .x 1\nEmpty: 1\n";
    assert_eq!(unhandled_type(&run(source).unwrap_err()), "TypeError");
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[test]
fn mask_without_unquotes_round_trips() {
    let engine = Engine::new();
    let qual = QualContext::new();
    let original = engine.read("pass: a b pass: c 1\n").unwrap();
    let template = engine.read_expanded("!mask: pass: a b pass: c 1\n", &qual).unwrap();
    let value = Interpreter::new().eval(&template[0]).unwrap();
    assert_eq!(value.to_form(), Some(original[0].clone()));
}

#[test]
fn mask_substitutes_and_splices() {
    let interp = Interpreter::new();
    interp.define("x", Value::Int(7));
    interp.define("ys", Value::list(ints(&[1, 2])));
    let value = run_in(&interp, "!mask: pass: f :,:x :,@:ys z\n").unwrap();
    assert_eq!(value.to_form().unwrap().to_string(), "(f 7 1 2 z)");
}
