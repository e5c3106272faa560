//! API to control the interpreter.

use std::error::Error;
use std::fmt;

use crate::builtins;
use crate::diag::DiagCollector;
use crate::object::ObjRef;
use crate::ops;
use crate::parser;
use crate::value::{Completion, Value};

/// Tree-walk interpreter.
///
/// Holds one builtins environment for its whole lifetime, so top-level
/// definitions persist across calls to [`Interpreter::eval`].
///
/// # Example
///
/// ```
/// use luna::interpreter::{Interpreter, LunaError};
///
/// let mut interp = Interpreter::new();
/// interp.eval("var max = fn(x, y) if x > y x else y")?;
///
/// let v = interp.eval("max(10, 20)")?;
/// assert_eq!(v.to_string(), "20");
/// # Ok::<(), LunaError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter {
    globals: ObjRef,
}

/// Errors the interpreter can raise.
#[derive(Debug)]
pub enum LunaError {
    /// Error occurring during lexical or syntactic analysis. Carries the
    /// collector so the caller can render the full report.
    Parse(DiagCollector),

    /// An exception completion escaped the program, rendered as a string.
    Runtime(String),
}

impl fmt::Display for LunaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LunaError::Parse(diag) => write!(f, "{}", diag.format()),
            LunaError::Runtime(msg) => write!(f, "runtime error: {}", msg),
        }
    }
}

impl Error for LunaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter {
            globals: builtins::builtins(),
        }
    }

    /// Parses and evaluates `code`, returning the last expression's value.
    ///
    /// A `return`/`break`/`continue` completion escaping the top level is
    /// unwrapped to its value; an exception becomes a runtime error.
    pub fn eval(&mut self, code: &str) -> Result<Value, LunaError> {
        let mut diag = DiagCollector::new(code);
        let expr = match parser::parse(code, &mut diag) {
            Ok(expr) => expr,
            Err(_) => return Err(LunaError::Parse(diag)),
        };

        match ops::op_eval(&expr, &self.globals) {
            Ok(value) => Ok(value),
            Err(Completion::Exception(value)) => Err(LunaError::Runtime(value.to_string())),
            Err(completion) => Ok(completion.into_value()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(input: &str) -> Result<Value, LunaError> {
        Interpreter::new().eval(input)
    }

    fn eval_str(input: &str) -> String {
        match eval(input) {
            Ok(v) => v.to_string(),
            Err(e) => panic!("evaluation of {:?} failed: {}", input, e),
        }
    }

    fn eval_runtime_error(input: &str) -> String {
        match eval(input) {
            Err(LunaError::Runtime(msg)) => msg,
            r => panic!("unexpected output for {:?}: {:?}", input, r),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(eval_str("1 - 2 - 3"), "-4");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(eval_str("(1 + 2) * 3"), "9");
    }

    #[test]
    fn not_binds_tighter_than_equality() {
        assert_eq!(eval_str("not 1 == 1"), "false");
    }

    #[test]
    fn integer_and_number_arithmetic() {
        assert_eq!(eval_str("7 / 2"), "3");
        assert_eq!(eval_str("7.0 / 2"), "3.5");
        assert_eq!(eval_str("7 % 3"), "1");
        assert_eq!(eval_str("-3 + 1"), "-2");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let msg = eval_runtime_error("1 / 0");
        assert!(msg.contains("division by zero"));
    }

    #[test]
    fn function_definition_and_call() {
        assert_eq!(eval_str("var sum = fn(a, b) { a + b }; sum(2, 3)"), "5");
    }

    #[test]
    fn named_and_positional_arguments_mix() {
        assert_eq!(eval_str("var f = fn(a, b) a - b; f(b: 1, 2)"), "1");
    }

    #[test]
    fn default_parameters() {
        assert_eq!(eval_str("var f = fn(a, b: 10) a + b; f(1)"), "11");
    }

    #[test]
    fn defaults_evaluate_once_in_the_defining_environment() {
        assert_eq!(eval_str("var x = 5; var f = fn(a: x) a; x = 9; f()"), "5");
    }

    #[test]
    fn missing_required_argument_is_a_runtime_error() {
        let msg = eval_runtime_error("var f = fn(a) a; f()");
        assert!(msg.contains("missing parameter"));
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let prg = r#"
            var make = fn() {
                var n = 0;
                fn() { n = n + 1; n }
            };
            var c = make();
            c();
            c()
        "#;
        assert_eq!(eval_str(prg), "2");
    }

    #[test]
    fn table_access_by_member_and_index() {
        assert_eq!(eval_str("var t = { a: 1, b: 2 }; t.a + t[\"b\"]"), "3");
    }

    #[test]
    fn table_member_access_with_literal_key() {
        assert_eq!(eval_str("var t = { 1: \"one\" }; t.1"), "one");
    }

    #[test]
    fn table_member_assignment() {
        assert_eq!(eval_str("var t = { a: 1 }; t.a = 5; t.a"), "5");
    }

    #[test]
    fn list_index_and_assignment() {
        assert_eq!(eval_str("var xs = [10, 20, 30]; xs[2]"), "30");
        assert_eq!(eval_str("var xs = [1]; xs[0] = 5; xs[0]"), "5");
    }

    #[test]
    fn list_out_of_bounds_is_catchable() {
        assert_eq!(eval_str("try { [1][5] } catch (e) e"), "index out of bound");
    }

    #[test]
    fn try_catch_yields_the_thrown_value() {
        assert_eq!(eval_str("try { throw \"boom\" } catch (e) e"), "boom");
    }

    #[test]
    fn while_loop_with_counter() {
        assert_eq!(eval_str("var i = 0; while i < 3 { i = i + 1 }; i"), "3");
    }

    #[test]
    fn break_value_escapes_the_loop() {
        assert_eq!(eval_str("while true { break 7 }"), "7");
    }

    #[test]
    fn continue_skips_to_the_next_iteration() {
        let prg = r#"
            var i = 0;
            var n = 0;
            while i < 5 {
                i = i + 1;
                if i % 2 == 0 continue 0;
                n = n + 1
            };
            n
        "#;
        assert_eq!(eval_str(prg), "3");
    }

    #[test]
    fn top_level_return_is_unwrapped() {
        assert_eq!(eval_str("return 3"), "3");
    }

    #[test]
    fn return_exits_the_function_from_inside_a_loop() {
        let prg = r#"
            var f = fn() {
                while true { return 9 };
                1
            };
            f()
        "#;
        assert_eq!(eval_str(prg), "9");
    }

    #[test]
    fn block_introduces_a_scope() {
        assert_eq!(eval_str("{ var x = 1; x }"), "1");
        let msg = eval_runtime_error("{ var x = 1; x }; x");
        assert!(msg.contains("not defined"));
    }

    #[test]
    fn top_level_has_no_own_scope() {
        let mut interp = Interpreter::new();
        interp.eval("var x = 1").expect("declaration failed");
        let v = interp.eval("x").expect("lookup failed");
        assert_eq!(v.to_string(), "1");
    }

    #[test]
    fn shadowed_variable_restores_after_block() {
        assert_eq!(eval_str("var foo = 42; { var foo = 24; foo }"), "24");
        assert_eq!(eval_str("var foo = 42; { var foo = 24 }; foo"), "42");
    }

    #[test]
    fn assignment_reaches_the_outer_scope() {
        assert_eq!(eval_str("var foo = 2; { foo = foo + 1 }; foo"), "3");
    }

    #[test]
    fn assignment_is_right_associative() {
        let mut interp = Interpreter::new();
        interp
            .eval("var a = 1; var b = 2; var c = 3; a = b = c")
            .expect("assignment failed");
        assert_eq!(interp.eval("b").expect("lookup failed").to_string(), "3");
        // Assignments evaluate to none, so `a` received the inner result.
        assert!(matches!(interp.eval("a").expect("lookup failed"), Value::None));
    }

    #[test]
    fn var_declaration_evaluates_to_the_bound_value() {
        assert_eq!(eval_str("var x = 42"), "42");
    }

    #[test]
    fn assignment_evaluates_to_none() {
        assert!(matches!(
            eval("var x = 1; x = 2").expect("program failed"),
            Value::None
        ));
    }

    #[test]
    fn and_does_not_short_circuit() {
        let prg = r#"
            var t = { n: 0 };
            var f = fn() { t.n = 1 };
            false and f();
            t.n
        "#;
        assert_eq!(eval_str(prg), "1");
    }

    #[test]
    fn or_does_not_short_circuit() {
        let prg = r#"
            var t = { n: 0 };
            var f = fn() { t.n = 1 };
            true or f();
            t.n
        "#;
        assert_eq!(eval_str(prg), "1");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval_str("\"foo\" + 1"), "foo1");
        assert_eq!(eval_str("1 + \"foo\""), "1foo");
    }

    #[test]
    fn string_escapes_reach_the_value() {
        assert_eq!(eval_str("\"a\\nb\""), "a\nb");
    }

    #[test]
    fn typeof_names_the_kind() {
        assert_eq!(eval_str("typeof 3.5"), "number");
        assert_eq!(eval_str("typeof \"s\""), "string");
        assert_eq!(eval_str("typeof none"), "none");
        assert_eq!(eval_str("typeof [1]"), "object");
    }

    #[test]
    fn quote_captures_unevaluated() {
        assert_eq!(eval_str("typeof #foo"), "symbol");
        assert_eq!(eval_str("typeof #(1 + 2)"), "object");
    }

    #[test]
    fn is_and_as_operate_on_type_symbols() {
        assert_eq!(eval_str("3 is #integer"), "true");
        assert_eq!(eval_str("3 is #number"), "false");
        assert_eq!(eval_str("3.9 as #integer"), "3");
        let msg = eval_runtime_error("\"x\" as #number");
        assert!(msg.contains("could not convert"));
    }

    #[test]
    fn assert_passes_through_truthy_values() {
        assert_eq!(eval_str("assert 1 == 1"), "true");
    }

    #[test]
    fn assert_failure_reports_the_expression() {
        let msg = eval_runtime_error("assert 1 == 2");
        assert!(msg.contains("assertion failed"));
    }

    #[test]
    fn builtin_type_constructors_are_callable() {
        assert_eq!(eval_str("integer(from: 2.9)"), "2");
        assert_eq!(eval_str("string(from: 42)"), "42");
        assert_eq!(eval_str("boolean(from: \"\")"), "false");
        assert_eq!(eval_str("number(from: true)"), "1");
    }

    #[test]
    fn builtin_len_is_callable() {
        assert_eq!(eval_str("len(of: [1, 2, 3])"), "3");
        assert_eq!(eval_str("len(of: { a: 1 })"), "1");
    }

    #[test]
    fn empty_program_is_none() {
        assert!(matches!(eval("").expect("empty program"), Value::None));
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let msg = eval_runtime_error("nosuchthing");
        assert!(msg.contains("not defined"));
    }

    #[test]
    fn parse_errors_carry_the_collector() {
        match eval("var x 42") {
            Err(LunaError::Parse(diag)) => assert!(diag.has_code("E0103")),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn reevaluating_a_program_yields_the_same_value() {
        let prg = "var xs = [1, 2]; xs[0] + xs[1]";
        assert_eq!(eval_str(prg), eval_str(prg));
    }
}
