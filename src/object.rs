//! The object protocol and the built-in heap objects.
//!
//! Every heap entity implements [`Object`]; operations it does not support
//! fall through to defaults that raise the protocol exceptions. Mutation goes
//! through `&self` with interior mutability so objects can be shared freely
//! behind [`ObjRef`] handles.

use std::any::Any;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::interner::Symbol;
use crate::ops;
use crate::value::{Completion, Eval, Value};

/// Shared handle to an object.
pub type ObjRef = Rc<dyn Object>;

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Object + 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The uniform set of operations a heap object may support.
#[allow(unused_variables)]
pub trait Object: fmt::Debug + AsAny {
    fn get(&self, key: &Value) -> Eval {
        Err(Completion::exception("not indexable"))
    }

    fn set(&self, key: Value, value: Value) -> Eval<()> {
        Err(Completion::exception("not indexable"))
    }

    fn decl(&self, key: Value, value: Value) -> Eval<()> {
        Err(Completion::exception("not indexable"))
    }

    fn has(&self, key: &Value) -> Eval<bool> {
        Err(Completion::exception("not indexable"))
    }

    fn eq(&self, rhs: &Value) -> Eval<bool> {
        Err(Completion::exception("not equatable"))
    }

    fn cmp(&self, rhs: &Value) -> Eval<Symbol> {
        Err(Completion::exception("not comparable"))
    }

    fn eval(&self, env: &ObjRef) -> Eval {
        Err(Completion::exception("not evaluable"))
    }

    fn call(&self, params: &ObjRef) -> Eval {
        Err(Completion::exception("not callable"))
    }

    fn string(&self) -> Eval {
        Ok(Value::string("{}"))
    }

    fn boolean(&self) -> Eval<bool> {
        Ok(true)
    }

    fn len(&self) -> Eval<i64> {
        Err(Completion::exception("can't len"))
    }

    /// Hash code used when the object itself is a table key. Containers hash
    /// structurally; everything else may collide, identity equality still
    /// disambiguates.
    fn hash(&self) -> u64 {
        0
    }
}

// MARK: Table

/// Insertion-ordered map from value to value.
#[derive(Debug, Default)]
pub struct Table {
    fields: RefCell<IndexMap<Value, Value>>,
}

impl Table {
    pub fn create() -> ObjRef {
        Rc::new(Table::default())
    }
}

impl Object for Table {
    fn get(&self, key: &Value) -> Eval {
        self.fields
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| Completion::exception("key not found"))
    }

    fn set(&self, key: Value, value: Value) -> Eval<()> {
        self.fields.borrow_mut().insert(key, value);
        Ok(())
    }

    fn decl(&self, key: Value, value: Value) -> Eval<()> {
        self.set(key, value)
    }

    fn has(&self, key: &Value) -> Eval<bool> {
        Ok(self.fields.borrow().contains_key(key))
    }

    fn eq(&self, rhs: &Value) -> Eval<bool> {
        if !ops::is_object(rhs) {
            return Ok(false);
        }

        if self.len()? != ops::as_integer(&ops::op_len(rhs)?)? {
            return Ok(false);
        }

        let fields = self.fields.borrow();
        for (k, v) in fields.iter() {
            if !ops::op_has(rhs, k)? {
                return Ok(false);
            }
            if !ops::op_eq(v, &ops::op_get(rhs, k)?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn string(&self) -> Eval {
        let mut out = String::from("{");
        let mut first = true;
        for (k, v) in self.fields.borrow().iter() {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&ops::as_string(k)?);
            out.push(':');
            out.push_str(&ops::as_string(v)?);
        }
        out.push('}');
        Ok(Value::string(out))
    }

    fn boolean(&self) -> Eval<bool> {
        Ok(!self.fields.borrow().is_empty())
    }

    fn len(&self) -> Eval<i64> {
        Ok(self.fields.borrow().len() as i64)
    }

    fn hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        for (k, v) in self.fields.borrow().iter() {
            k.hash(&mut h);
            v.hash(&mut h);
        }
        h.finish()
    }
}

// MARK: List

/// Dense sequence of values.
#[derive(Debug, Default)]
pub struct List {
    items: RefCell<Vec<Value>>,
}

impl List {
    pub fn create(items: Vec<Value>) -> ObjRef {
        Rc::new(List {
            items: RefCell::new(items),
        })
    }
}

impl Object for List {
    fn get(&self, key: &Value) -> Eval {
        let index = ops::as_index(key)?;
        let items = self.items.borrow();
        if 0 <= index && (index as usize) < items.len() {
            return Ok(items[index as usize].clone());
        }
        Err(Completion::exception("index out of bound"))
    }

    fn set(&self, key: Value, value: Value) -> Eval<()> {
        let index = ops::as_index(&key)?;
        let mut items = self.items.borrow_mut();
        if 0 <= index && (index as usize) < items.len() {
            items[index as usize] = value;
            return Ok(());
        }
        Err(Completion::exception("index out of bound"))
    }

    fn decl(&self, key: Value, value: Value) -> Eval<()> {
        self.set(key, value)
    }

    fn has(&self, key: &Value) -> Eval<bool> {
        if !ops::is_index(key) {
            return Ok(false);
        }
        let index = ops::as_index(key)?;
        Ok(0 <= index && (index as usize) < self.items.borrow().len())
    }

    fn eq(&self, rhs: &Value) -> Eval<bool> {
        if !ops::is_object(rhs) {
            return Ok(false);
        }

        if self.len()? != ops::as_integer(&ops::op_len(rhs)?)? {
            return Ok(false);
        }

        let items = self.items.borrow();
        for (index, v) in items.iter().enumerate() {
            let key = Value::Integer(index as i64);
            if !ops::op_has(rhs, &key)? {
                return Ok(false);
            }
            if !ops::op_eq(v, &ops::op_get(rhs, &key)?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn string(&self) -> Eval {
        let mut out = String::from("[");
        let mut first = true;
        for v in self.items.borrow().iter() {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&ops::as_string(v)?);
        }
        out.push(']');
        Ok(Value::string(out))
    }

    fn boolean(&self) -> Eval<bool> {
        Ok(!self.items.borrow().is_empty())
    }

    fn len(&self) -> Eval<i64> {
        Ok(self.items.borrow().len() as i64)
    }

    fn hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        for v in self.items.borrow().iter() {
            v.hash(&mut h);
        }
        h.finish()
    }
}

// MARK: Environment

/// A lexical scope: local bindings plus an optional parent.
///
/// The parent is a value so the outermost scope can simply hold `none`.
#[derive(Debug)]
pub struct Environment {
    parent: Value,
    decls: ObjRef,
}

impl Environment {
    pub fn create(parent: Value) -> ObjRef {
        Rc::new(Environment {
            parent,
            decls: Table::create(),
        })
    }
}

impl Object for Environment {
    fn get(&self, key: &Value) -> Eval {
        if self.decls.has(key)? {
            return self.decls.get(key);
        }

        if ops::as_boolean(&self.parent)? {
            return ops::op_get(&self.parent, key);
        }

        Err(Completion::exception("not defined"))
    }

    fn set(&self, key: Value, value: Value) -> Eval<()> {
        if self.decls.has(&key)? {
            return self.decls.set(key, value);
        }

        if ops::as_boolean(&self.parent)? && ops::op_has(&self.parent, &key)? {
            return ops::op_set(&self.parent, key, value);
        }

        self.decls.set(key, value)
    }

    fn decl(&self, key: Value, value: Value) -> Eval<()> {
        self.decls.set(key, value)
    }

    fn has(&self, key: &Value) -> Eval<bool> {
        if self.decls.has(key)? {
            return Ok(true);
        }

        if ops::as_boolean(&self.parent)? {
            return ops::op_has(&self.parent, key);
        }

        Ok(false)
    }
}

// MARK: Func

/// One parameter of a function signature.
#[derive(Debug, Clone)]
pub struct Param {
    pub key: Symbol,
    pub value: Value,
    pub required: bool,
}

impl Param {
    pub fn required(key: Symbol) -> Param {
        Param {
            key,
            value: Value::None,
            required: true,
        }
    }
}

/// A host callable takes the bound locals environment and produces a value.
pub type NativeFn = fn(&ObjRef) -> Eval;

/// Function body: an unevaluated expression or a native callable.
pub enum Code {
    Expr(Value),
    Native(NativeFn),
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Expr(e) => f.debug_tuple("Expr").field(e).finish(),
            Code::Native(_) => f.debug_tuple("Native").finish(),
        }
    }
}

/// A closure: defining environment, signature, body.
pub struct Func {
    env: ObjRef,
    sig: Vec<Param>,
    code: Code,
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("sig", &self.sig)
            .field("code", &self.code)
            .finish()
    }
}

impl Func {
    pub fn create(env: ObjRef, sig: Vec<Param>, code: Code) -> ObjRef {
        Rc::new(Func { env, sig, code })
    }
}

impl Object for Func {
    fn call(&self, params: &ObjRef) -> Eval {
        let locals = Environment::create(Value::Object(self.env.clone()));

        let mut index: i64 = 0;
        for p in &self.sig {
            let name = Value::Symbol(p.key.clone());
            if params.has(&name)? {
                locals.decl(name.clone(), params.get(&name)?)?;
            } else if params.has(&Value::Integer(index))? {
                locals.decl(name, params.get(&Value::Integer(index))?)?;
                index += 1;
            } else if !p.required {
                locals.decl(name, p.value.clone())?;
            } else {
                return Err(Completion::exception("missing parameter"));
            }
        }

        match &self.code {
            Code::Expr(expr) => ops::op_eval(expr, &locals),
            Code::Native(native) => native(&locals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Value {
        Value::Symbol(Symbol::intern(name))
    }

    #[test]
    fn table_keeps_insertion_order() -> Eval<()> {
        let t = Table::create();
        t.set(sym("b"), Value::Integer(2))?;
        t.set(sym("a"), Value::Integer(1))?;
        t.set(sym("c"), Value::Integer(3))?;
        assert_eq!(ops::as_string(&t.string()?)?.as_ref(), "{b:2, a:1, c:3}");
        Ok(())
    }

    #[test]
    fn table_gets_by_string_what_was_set_by_symbol() -> Eval<()> {
        let t = Table::create();
        t.set(sym("a"), Value::Integer(1))?;
        assert!(ops::op_eq(&t.get(&Value::string("a"))?, &Value::Integer(1))?);
        Ok(())
    }

    #[test]
    fn table_supports_integer_keys() -> Eval<()> {
        let t = Table::create();
        t.set(Value::Integer(4), Value::string("sparse"))?;
        assert!(t.has(&Value::Integer(4))?);
        assert!(!t.has(&Value::Integer(0))?);
        Ok(())
    }

    #[test]
    fn missing_table_key_raises() {
        let t = Table::create();
        match t.get(&sym("nope")) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn list_get_set_in_range() -> Eval<()> {
        let l = List::create(vec![Value::Integer(10), Value::Integer(20)]);
        assert!(ops::op_eq(&l.get(&Value::Integer(1))?, &Value::Integer(20))?);
        l.set(Value::Integer(0), Value::Integer(11))?;
        assert!(ops::op_eq(&l.get(&Value::Integer(0))?, &Value::Integer(11))?);
        Ok(())
    }

    #[test]
    fn list_rejects_out_of_bound_index() {
        let l = List::create(vec![Value::Integer(10)]);
        match l.get(&Value::Integer(1)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn list_rejects_non_integer_index() {
        let l = List::create(vec![Value::Integer(10)]);
        match l.get(&Value::Number(0.0)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn env_get_walks_the_chain() -> Eval<()> {
        let outer = Environment::create(Value::None);
        outer.decl(sym("x"), Value::Integer(1))?;
        let inner = Environment::create(Value::Object(outer));
        assert!(ops::op_eq(&inner.get(&sym("x"))?, &Value::Integer(1))?);
        Ok(())
    }

    #[test]
    fn env_set_updates_innermost_defining_scope() -> Eval<()> {
        let outer = Environment::create(Value::None);
        outer.decl(sym("x"), Value::Integer(1))?;
        let inner = Environment::create(Value::Object(outer.clone()));
        inner.set(sym("x"), Value::Integer(2))?;
        assert!(ops::op_eq(&outer.get(&sym("x"))?, &Value::Integer(2))?);
        Ok(())
    }

    #[test]
    fn env_set_of_unknown_name_creates_local_binding() -> Eval<()> {
        let outer = Environment::create(Value::None);
        let inner = Environment::create(Value::Object(outer.clone()));
        inner.set(sym("y"), Value::Integer(3))?;
        assert!(inner.has(&sym("y"))?);
        assert!(!outer.has(&sym("y"))?);
        Ok(())
    }

    #[test]
    fn env_decl_shadows_parent_binding() -> Eval<()> {
        let outer = Environment::create(Value::None);
        outer.decl(sym("x"), Value::Integer(1))?;
        let inner = Environment::create(Value::Object(outer.clone()));
        inner.decl(sym("x"), Value::Integer(2))?;
        assert!(ops::op_eq(&inner.get(&sym("x"))?, &Value::Integer(2))?);
        assert!(ops::op_eq(&outer.get(&sym("x"))?, &Value::Integer(1))?);
        Ok(())
    }

    #[test]
    fn env_get_of_undefined_name_raises() {
        let env = Environment::create(Value::None);
        match env.get(&sym("ghost")) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    fn native_first(params: &ObjRef) -> Eval {
        params.get(&Value::Symbol(Symbol::intern("a")))
    }

    #[test]
    fn func_binds_positional_arguments() -> Eval<()> {
        let env = Environment::create(Value::None);
        let f = Func::create(
            env,
            vec![Param::required(Symbol::intern("a"))],
            Code::Native(native_first),
        );
        let params = Table::create();
        params.set(Value::Integer(0), Value::Integer(42))?;
        assert!(ops::op_eq(&f.call(&params)?, &Value::Integer(42))?);
        Ok(())
    }

    #[test]
    fn func_binds_named_arguments() -> Eval<()> {
        let env = Environment::create(Value::None);
        let f = Func::create(
            env,
            vec![Param::required(Symbol::intern("a"))],
            Code::Native(native_first),
        );
        let params = Table::create();
        params.set(sym("a"), Value::Integer(7))?;
        assert!(ops::op_eq(&f.call(&params)?, &Value::Integer(7))?);
        Ok(())
    }

    #[test]
    fn func_falls_back_to_default_value() -> Eval<()> {
        let env = Environment::create(Value::None);
        let f = Func::create(
            env,
            vec![Param {
                key: Symbol::intern("a"),
                value: Value::Integer(5),
                required: false,
            }],
            Code::Native(native_first),
        );
        let params = Table::create();
        assert!(ops::op_eq(&f.call(&params)?, &Value::Integer(5))?);
        Ok(())
    }

    #[test]
    fn func_missing_required_parameter_raises() {
        let env = Environment::create(Value::None);
        let f = Func::create(
            env,
            vec![Param::required(Symbol::intern("a"))],
            Code::Native(native_first),
        );
        let params = Table::create();
        match f.call(&params) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn default_protocol_operations_raise() {
        let env = Environment::create(Value::None);
        let f = Func::create(env, vec![], Code::Native(native_first));
        match f.cmp(&Value::Integer(1)) {
            Err(Completion::Exception(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
