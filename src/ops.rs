//! Coercions and the primitive operations the evaluator is built from.
//!
//! `op_eval` is the single evaluation entry point: literals return
//! themselves, symbols are looked up in the environment, objects delegate to
//! their own `eval`.

use std::rc::Rc;

use crate::interner::Symbol;
use crate::object::ObjRef;
use crate::value::{sym, Completion, Eval, Value};

// MARK: Type predicates

pub fn type_of(v: &Value) -> Symbol {
    match v {
        Value::None => sym::none(),
        Value::Boolean(_) => sym::boolean(),
        Value::Integer(_) => sym::integer(),
        Value::Number(_) => sym::number(),
        Value::Symbol(_) => sym::symbol(),
        Value::String(_) => sym::string(),
        Value::Object(_) => sym::object(),
    }
}

pub fn is_none(v: &Value) -> bool {
    matches!(v, Value::None)
}

pub fn is_integer(v: &Value) -> bool {
    matches!(v, Value::Integer(_))
}

pub fn is_index(v: &Value) -> bool {
    is_integer(v)
}

pub fn is_number(v: &Value) -> bool {
    matches!(v, Value::Number(_))
}

pub fn is_scalar(v: &Value) -> bool {
    matches!(
        v,
        Value::None | Value::Boolean(_) | Value::Integer(_) | Value::Number(_)
    )
}

pub fn is_symbol(v: &Value) -> bool {
    matches!(v, Value::Symbol(_))
}

pub fn is_string(v: &Value) -> bool {
    matches!(v, Value::String(_))
}

pub fn is_object(v: &Value) -> bool {
    matches!(v, Value::Object(_))
}

/// `v is tag`: does the runtime kind of `v` match the type symbol?
pub fn is(v: &Value, tag: &Symbol) -> bool {
    *tag == type_of(v)
}

// MARK: Coercions

pub fn as_none(v: &Value) -> Eval {
    match v {
        Value::None => Ok(Value::None),
        _ => Err(Completion::exception("could not convert to none")),
    }
}

pub fn as_boolean(v: &Value) -> Eval<bool> {
    match v {
        Value::None => Ok(false),
        Value::Boolean(b) => Ok(*b),
        Value::Integer(i) => Ok(*i != 0),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Symbol(_) => Ok(true),
        Value::String(s) => Ok(!s.is_empty()),
        Value::Object(o) => o.boolean(),
    }
}

pub fn as_integer(v: &Value) -> Eval<i64> {
    match v {
        Value::None => Ok(0),
        Value::Boolean(b) => Ok(*b as i64),
        Value::Integer(i) => Ok(*i),
        Value::Number(n) => Ok(*n as i64),
        _ => Err(Completion::exception("could not convert to integer")),
    }
}

pub fn as_index(v: &Value) -> Eval<i64> {
    if !is_index(v) {
        return Err(Completion::exception("not a valid index"));
    }
    as_integer(v)
}

pub fn as_number(v: &Value) -> Eval<f64> {
    match v {
        Value::None => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Integer(i) => Ok(*i as f64),
        Value::Number(n) => Ok(*n),
        _ => Err(Completion::exception("could not convert to number")),
    }
}

pub fn as_string(v: &Value) -> Eval<Rc<str>> {
    match v {
        Value::None => Ok(Rc::from("none")),
        Value::Boolean(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
        Value::Integer(i) => Ok(Rc::from(i.to_string().as_str())),
        Value::Number(n) => Ok(Rc::from(n.to_string().as_str())),
        Value::Symbol(s) => Ok(Rc::from(s.name())),
        Value::String(s) => Ok(s.clone()),
        Value::Object(o) => match o.string()? {
            Value::String(s) => Ok(s),
            _ => Err(Completion::exception("expected string")),
        },
    }
}

pub fn as_symbol(v: &Value) -> Eval<Symbol> {
    match v {
        Value::Symbol(s) => Ok(s.clone()),
        _ => Err(Completion::exception("could not convert to symbol")),
    }
}

pub fn as_object(v: &Value) -> Eval<ObjRef> {
    match v {
        Value::Object(o) => Ok(o.clone()),
        _ => Err(Completion::exception("could not convert to object")),
    }
}

/// `v as tag`: convert according to the target type symbol.
pub fn as_type(v: &Value, tag: &Symbol) -> Eval {
    if *tag == sym::none() {
        as_none(v)
    } else if *tag == sym::boolean() {
        Ok(Value::Boolean(as_boolean(v)?))
    } else if *tag == sym::integer() {
        Ok(Value::Integer(as_integer(v)?))
    } else if *tag == sym::number() {
        Ok(Value::Number(as_number(v)?))
    } else if *tag == sym::symbol() {
        Ok(Value::Symbol(as_symbol(v)?))
    } else if *tag == sym::string() {
        Ok(Value::String(as_string(v)?))
    } else if *tag == sym::object() {
        Ok(Value::Object(as_object(v)?))
    } else {
        Err(Completion::exception("could not convert"))
    }
}

// MARK: Operations

pub fn op_eq(lhs: &Value, rhs: &Value) -> Eval<bool> {
    if let Value::Object(o) = lhs {
        return o.eq(rhs);
    }

    if let Value::Object(o) = rhs {
        return o.eq(lhs);
    }

    if is_number(lhs) || is_number(rhs) {
        return Ok(as_number(lhs)? == as_number(rhs)?);
    }

    Ok(as_integer(lhs)? == as_integer(rhs)?)
}

fn ordering_symbol<T: PartialOrd>(lhs: T, rhs: T) -> Symbol {
    match lhs.partial_cmp(&rhs) {
        Some(std::cmp::Ordering::Less) => sym::less(),
        Some(std::cmp::Ordering::Equal) => sym::equivalent(),
        Some(std::cmp::Ordering::Greater) => sym::greater(),
        None => sym::unordered(),
    }
}

pub fn op_cmp(lhs: &Value, rhs: &Value) -> Eval<Symbol> {
    if let Value::Object(o) = lhs {
        return o.cmp(rhs);
    }

    if is_string(lhs) || is_string(rhs) {
        return Ok(ordering_symbol(as_string(lhs)?, as_string(rhs)?));
    }

    if is_number(lhs) || is_number(rhs) {
        return Ok(ordering_symbol(as_number(lhs)?, as_number(rhs)?));
    }

    Ok(ordering_symbol(as_integer(lhs)?, as_integer(rhs)?))
}

pub fn op_and(lhs: &Value, rhs: &Value) -> Eval {
    Ok(Value::Boolean(as_boolean(lhs)? && as_boolean(rhs)?))
}

pub fn op_or(lhs: &Value, rhs: &Value) -> Eval {
    Ok(Value::Boolean(as_boolean(lhs)? || as_boolean(rhs)?))
}

pub fn op_not(v: &Value) -> Eval {
    Ok(Value::Boolean(!as_boolean(v)?))
}

pub fn op_get(target: &Value, key: &Value) -> Eval {
    as_object(target)?.get(key)
}

pub fn op_set(target: &Value, key: Value, value: Value) -> Eval<()> {
    as_object(target)?.set(key, value)
}

pub fn op_decl(target: &Value, key: Value, value: Value) -> Eval {
    as_object(target)?.decl(key, value.clone())?;
    Ok(value)
}

pub fn op_has(target: &Value, key: &Value) -> Eval<bool> {
    as_object(target)?.has(key)
}

pub fn op_len(target: &Value) -> Eval {
    Ok(Value::Integer(as_object(target)?.len()?))
}

/// Invoke a callable. `return`/`break`/`continue` completions escaping the
/// body are unwrapped to their value at this boundary; exceptions propagate.
pub fn op_call(target: &Value, params: &ObjRef) -> Eval {
    match as_object(target)?.call(params) {
        Ok(v) => Ok(v),
        Err(Completion::Exception(v)) => Err(Completion::Exception(v)),
        Err(completion) => Ok(completion.into_value()),
    }
}

pub fn op_neg(v: &Value) -> Eval {
    match v {
        Value::None => Ok(Value::Integer(0)),
        Value::Boolean(b) => Ok(Value::Integer(-(*b as i64))),
        Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
        Value::Number(n) => Ok(Value::Number(-n)),
        _ => Err(Completion::exception("scalar operation on non scalar")),
    }
}

/// `+` concatenates when either side is a string (result is a string) or a
/// symbol (result is a symbol); otherwise it is numeric with the usual
/// integer-to-number promotion.
pub fn op_add(lhs: &Value, rhs: &Value) -> Eval {
    if is_string(lhs) || is_string(rhs) {
        return Ok(Value::string(format!(
            "{}{}",
            as_string(lhs)?,
            as_string(rhs)?
        )));
    }

    if is_symbol(lhs) || is_symbol(rhs) {
        return Ok(Value::Symbol(Symbol::intern(&format!(
            "{}{}",
            as_string(lhs)?,
            as_string(rhs)?
        ))));
    }

    if is_number(lhs) || is_number(rhs) {
        return Ok(Value::Number(as_number(lhs)? + as_number(rhs)?));
    }

    Ok(Value::Integer(as_integer(lhs)?.wrapping_add(as_integer(rhs)?)))
}

fn check_scalars(lhs: &Value, rhs: &Value) -> Eval<()> {
    if !is_scalar(lhs) || !is_scalar(rhs) {
        return Err(Completion::exception("scalar operation on non scalar"));
    }
    Ok(())
}

pub fn op_sub(lhs: &Value, rhs: &Value) -> Eval {
    check_scalars(lhs, rhs)?;

    if is_number(lhs) || is_number(rhs) {
        return Ok(Value::Number(as_number(lhs)? - as_number(rhs)?));
    }

    Ok(Value::Integer(as_integer(lhs)?.wrapping_sub(as_integer(rhs)?)))
}

pub fn op_mul(lhs: &Value, rhs: &Value) -> Eval {
    check_scalars(lhs, rhs)?;

    if is_number(lhs) || is_number(rhs) {
        return Ok(Value::Number(as_number(lhs)? * as_number(rhs)?));
    }

    Ok(Value::Integer(as_integer(lhs)?.wrapping_mul(as_integer(rhs)?)))
}

pub fn op_div(lhs: &Value, rhs: &Value) -> Eval {
    check_scalars(lhs, rhs)?;

    if is_number(lhs) || is_number(rhs) {
        return Ok(Value::Number(as_number(lhs)? / as_number(rhs)?));
    }

    let divisor = as_integer(rhs)?;
    if divisor == 0 {
        return Err(Completion::exception("division by zero"));
    }
    Ok(Value::Integer(as_integer(lhs)?.wrapping_div(divisor)))
}

pub fn op_mod(lhs: &Value, rhs: &Value) -> Eval {
    check_scalars(lhs, rhs)?;

    if is_number(lhs) || is_number(rhs) {
        return Ok(Value::Number(as_number(lhs)? % as_number(rhs)?));
    }

    let divisor = as_integer(rhs)?;
    if divisor == 0 {
        return Err(Completion::exception("division by zero"));
    }
    Ok(Value::Integer(as_integer(lhs)?.wrapping_rem(divisor)))
}

pub fn op_bin_not(v: &Value) -> Eval {
    Ok(Value::Integer(!as_integer(v)?))
}

pub fn op_bin_and(lhs: &Value, rhs: &Value) -> Eval {
    Ok(Value::Integer(as_integer(lhs)? & as_integer(rhs)?))
}

pub fn op_bin_or(lhs: &Value, rhs: &Value) -> Eval {
    Ok(Value::Integer(as_integer(lhs)? | as_integer(rhs)?))
}

// MARK: Evaluation

/// Evaluate any value: literals are themselves, symbols look up in the
/// environment, objects delegate to their `eval`.
pub fn op_eval(v: &Value, env: &ObjRef) -> Eval {
    match v {
        Value::Symbol(_) => env.get(v),
        Value::Object(o) => o.eval(env),
        _ => Ok(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Environment, List, Table};

    #[test]
    fn type_of_covers_all_kinds() {
        assert_eq!(type_of(&Value::None), sym::none());
        assert_eq!(type_of(&Value::Boolean(true)), sym::boolean());
        assert_eq!(type_of(&Value::Integer(1)), sym::integer());
        assert_eq!(type_of(&Value::Number(1.0)), sym::number());
        assert_eq!(type_of(&Value::Symbol(Symbol::intern("s"))), sym::symbol());
        assert_eq!(type_of(&Value::string("s")), sym::string());
        assert_eq!(type_of(&Value::Object(Table::create())), sym::object());
    }

    #[test]
    fn boolean_coercion() -> Eval<()> {
        assert!(!as_boolean(&Value::None)?);
        assert!(!as_boolean(&Value::Integer(0))?);
        assert!(as_boolean(&Value::Integer(-3))?);
        assert!(!as_boolean(&Value::Number(0.0))?);
        assert!(as_boolean(&Value::Number(0.5))?);
        assert!(as_boolean(&Value::Symbol(Symbol::intern("s")))?);
        assert!(!as_boolean(&Value::string(""))?);
        assert!(as_boolean(&Value::string("x"))?);
        assert!(!as_boolean(&Value::Object(Table::create()))?);
        assert!(as_boolean(&Value::Object(List::create(vec![Value::None])))?);
        Ok(())
    }

    #[test]
    fn integer_coercion() -> Eval<()> {
        assert_eq!(as_integer(&Value::None)?, 0);
        assert_eq!(as_integer(&Value::Boolean(true))?, 1);
        assert_eq!(as_integer(&Value::Number(2.9))?, 2);
        Ok(())
    }

    #[test]
    fn string_coercion_is_idempotent() -> Eval<()> {
        for v in [
            Value::None,
            Value::Boolean(false),
            Value::Integer(42),
            Value::Number(2.5),
            Value::string("hi"),
        ] {
            let once = as_string(&v)?;
            let twice = as_string(&Value::String(once.clone()))?;
            assert_eq!(once, twice);
        }
        Ok(())
    }

    #[test]
    fn integer_coercion_rejects_strings() {
        match as_integer(&Value::string("7")) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn add_promotes_to_number() -> Eval<()> {
        match op_add(&Value::Integer(1), &Value::Number(0.5))? {
            Value::Number(n) => assert_eq!(n, 1.5),
            v => panic!("unexpected value: {:?}", v),
        }
        Ok(())
    }

    #[test]
    fn add_concatenates_strings() -> Eval<()> {
        match op_add(&Value::string("a"), &Value::Integer(1))? {
            Value::String(s) => assert_eq!(&*s, "a1"),
            v => panic!("unexpected value: {:?}", v),
        }
        Ok(())
    }

    #[test]
    fn add_concatenates_symbols() -> Eval<()> {
        match op_add(
            &Value::Symbol(Symbol::intern("ab")),
            &Value::Symbol(Symbol::intern("cd")),
        )? {
            Value::Symbol(s) => assert_eq!(s, Symbol::intern("abcd")),
            v => panic!("unexpected value: {:?}", v),
        }
        Ok(())
    }

    #[test]
    fn sub_rejects_non_scalars() {
        match op_sub(&Value::string("a"), &Value::Integer(1)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn integer_division_by_zero_raises() {
        match op_div(&Value::Integer(1), &Value::Integer(0)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
        match op_mod(&Value::Integer(1), &Value::Integer(0)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn number_modulo_uses_ieee_remainder() -> Eval<()> {
        match op_mod(&Value::Number(5.5), &Value::Integer(2))? {
            Value::Number(n) => assert_eq!(n, 1.5),
            v => panic!("unexpected value: {:?}", v),
        }
        Ok(())
    }

    #[test]
    fn neg_promotes_scalars() -> Eval<()> {
        assert!(op_eq(&op_neg(&Value::None)?, &Value::Integer(0))?);
        assert!(op_eq(&op_neg(&Value::Boolean(true))?, &Value::Integer(-1))?);
        assert!(op_eq(&op_neg(&Value::Number(1.5))?, &Value::Number(-1.5))?);
        Ok(())
    }

    #[test]
    fn eq_compares_across_numeric_kinds() -> Eval<()> {
        assert!(op_eq(&Value::Integer(1), &Value::Number(1.0))?);
        assert!(op_eq(&Value::Boolean(true), &Value::Integer(1))?);
        assert!(!op_eq(&Value::Integer(1), &Value::Integer(2))?);
        Ok(())
    }

    #[test]
    fn cmp_orders_strings_numbers_integers() -> Eval<()> {
        assert_eq!(op_cmp(&Value::string("a"), &Value::string("b"))?, sym::less());
        assert_eq!(op_cmp(&Value::Number(2.0), &Value::Integer(1))?, sym::greater());
        assert_eq!(op_cmp(&Value::Integer(3), &Value::Integer(3))?, sym::equivalent());
        Ok(())
    }

    #[test]
    fn cmp_reports_unordered_for_nan() -> Eval<()> {
        assert_eq!(
            op_cmp(&Value::Number(f64::NAN), &Value::Integer(1))?,
            sym::unordered()
        );
        Ok(())
    }

    #[test]
    fn bitwise_operations_coerce_to_integer() -> Eval<()> {
        assert!(op_eq(&op_bin_and(&Value::Integer(6), &Value::Integer(3))?, &Value::Integer(2))?);
        assert!(op_eq(&op_bin_or(&Value::Integer(6), &Value::Integer(3))?, &Value::Integer(7))?);
        assert!(op_eq(&op_bin_not(&Value::Integer(0))?, &Value::Integer(-1))?);
        Ok(())
    }

    #[test]
    fn as_type_dispatches_on_tag() -> Eval<()> {
        assert!(op_eq(&as_type(&Value::Number(2.9), &sym::integer())?, &Value::Integer(2))?);
        match as_type(&Value::string("x"), &sym::number()) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
        Ok(())
    }

    #[test]
    fn is_matches_runtime_kind() {
        assert!(is(&Value::Integer(1), &sym::integer()));
        assert!(!is(&Value::Integer(1), &sym::number()));
    }

    #[test]
    fn eval_dispatches_literals_symbols_objects() -> Eval<()> {
        let env = Environment::create(Value::None);
        env.decl(Value::Symbol(Symbol::intern("x")), Value::Integer(9))?;

        assert!(op_eq(&op_eval(&Value::Integer(5), &env)?, &Value::Integer(5))?);
        assert!(op_eq(
            &op_eval(&Value::Symbol(Symbol::intern("x")), &env)?,
            &Value::Integer(9)
        )?);
        Ok(())
    }

    #[test]
    fn eval_of_undefined_symbol_raises() {
        let env = Environment::create(Value::None);
        match op_eval(&Value::Symbol(Symbol::intern("ghost")), &env) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
