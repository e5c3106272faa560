//! Host builtins.
//!
//! Builds the initial environment a program runs in: `len`, `println`,
//! `input`, `exit`, and the type constructors exposing the value coercions.

use std::io;
use std::io::prelude::*;
use std::process;

use crate::interner::Symbol;
use crate::object::{Code, Environment, Func, NativeFn, ObjRef, Param};
use crate::ops;
use crate::value::{sym, Completion, Eval, Value};

/// Creates a fresh builtins environment.
pub fn builtins() -> ObjRef {
    let env = Environment::create(Value::None);

    decl_native(&env, "len", &[sym::of()], native_len);
    decl_native(&env, "println", &[Symbol::intern("fmt")], native_println);
    decl_native(&env, "input", &[Symbol::intern("prompt")], native_input);
    decl_native(&env, "exit", &[], native_exit);

    decl_native(&env, "boolean", &[sym::from()], native_boolean);
    decl_native(&env, "integer", &[sym::from()], native_integer);
    decl_native(&env, "number", &[sym::from()], native_number);
    decl_native(&env, "symbol", &[sym::from()], native_symbol);
    decl_native(&env, "string", &[sym::from()], native_string);

    env
}

fn decl_native(env: &ObjRef, name: &str, params: &[Symbol], body: NativeFn) {
    let sig = params.iter().cloned().map(Param::required).collect();
    let func = Func::create(env.clone(), sig, Code::Native(body));
    env.decl(
        Value::Symbol(Symbol::intern(name)),
        Value::Object(func),
    )
    .expect("error when binding builtin function");
}

fn native_len(params: &ObjRef) -> Eval {
    let of = params.get(&Value::Symbol(sym::of()))?;
    ops::op_len(&of)
}

fn native_println(params: &ObjRef) -> Eval {
    let fmt = params.get(&Value::Symbol(Symbol::intern("fmt")))?;
    println!("{}", ops::as_string(&fmt)?);
    Ok(Value::None)
}

fn native_input(params: &ObjRef) -> Eval {
    let prompt = params.get(&Value::Symbol(Symbol::intern("prompt")))?;
    print!("{}", ops::as_string(&prompt)?);
    io::stdout()
        .flush()
        .map_err(|_| Completion::exception("failed to write prompt"))?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|_| Completion::exception("failed to read input"))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::string(line))
}

fn native_exit(_params: &ObjRef) -> Eval {
    process::exit(0);
}

fn native_boolean(params: &ObjRef) -> Eval {
    let from = params.get(&Value::Symbol(sym::from()))?;
    Ok(Value::Boolean(ops::as_boolean(&from)?))
}

fn native_integer(params: &ObjRef) -> Eval {
    let from = params.get(&Value::Symbol(sym::from()))?;
    Ok(Value::Integer(ops::as_integer(&from)?))
}

fn native_number(params: &ObjRef) -> Eval {
    let from = params.get(&Value::Symbol(sym::from()))?;
    Ok(Value::Number(ops::as_number(&from)?))
}

fn native_symbol(params: &ObjRef) -> Eval {
    let from = params.get(&Value::Symbol(sym::from()))?;
    Ok(Value::Symbol(ops::as_symbol(&from)?))
}

fn native_string(params: &ObjRef) -> Eval {
    let from = params.get(&Value::Symbol(sym::from()))?;
    Ok(Value::String(ops::as_string(&from)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{List, Table};

    fn call_builtin(name: &str, args: &[(Value, Value)]) -> Eval {
        let env = builtins();
        let func = env.get(&Value::Symbol(Symbol::intern(name)))?;
        let params = Table::create();
        for (key, value) in args {
            params.set(key.clone(), value.clone())?;
        }
        ops::op_call(&func, &params)
    }

    #[test]
    fn len_of_list() -> Eval<()> {
        let list = List::create(vec![Value::Integer(1), Value::Integer(2)]);
        let res = call_builtin("len", &[(Value::Symbol(sym::of()), Value::Object(list))])?;
        assert!(ops::op_eq(&res, &Value::Integer(2))?);
        Ok(())
    }

    #[test]
    fn len_accepts_positional_argument() -> Eval<()> {
        let list = List::create(vec![Value::Integer(1)]);
        let res = call_builtin("len", &[(Value::Integer(0), Value::Object(list))])?;
        assert!(ops::op_eq(&res, &Value::Integer(1))?);
        Ok(())
    }

    #[test]
    fn len_of_scalar_raises() {
        match call_builtin("len", &[(Value::Symbol(sym::of()), Value::Integer(1))]) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn type_constructors_expose_coercions() -> Eval<()> {
        let res = call_builtin(
            "integer",
            &[(Value::Symbol(sym::from()), Value::Number(2.9))],
        )?;
        assert!(ops::op_eq(&res, &Value::Integer(2))?);

        let res = call_builtin(
            "string",
            &[(Value::Symbol(sym::from()), Value::Integer(42))],
        )?;
        match res {
            Value::String(s) => assert_eq!(&*s, "42"),
            v => panic!("unexpected value: {:?}", v),
        }

        let res = call_builtin(
            "boolean",
            &[(Value::Symbol(sym::from()), Value::string(""))],
        )?;
        assert!(ops::op_eq(&res, &Value::Boolean(false))?);
        Ok(())
    }

    #[test]
    fn missing_argument_raises() {
        match call_builtin("integer", &[]) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
