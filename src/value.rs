//! The uniform tagged value and the non-local control-flow channel.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::interner::Symbol;
use crate::object::ObjRef;
use crate::ops;

/// A Luna value.
///
/// Values are cheap to copy: a tag plus an inline scalar or a shared handle.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Symbol(Symbol),
    String(Rc<str>),
    Object(ObjRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Rc::from(s.as_ref()))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Value {
        Value::Symbol(s)
    }
}

impl From<ObjRef> for Value {
    fn from(o: ObjRef) -> Value {
        Value::Object(o)
    }
}

/// Key-level equality, used by table storage.
///
/// Strict per kind, with one exception: a symbol and a string with the same
/// text name the same key, so `t.a` and `t["a"]` address the same slot.
/// Objects compare by identity; the language-level relation with coercions
/// is [`ops::op_eq`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::String(b)) => a.name() == &**b,
            (Value::String(a), Value::Symbol(b)) => &**a == b.name(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::None => 0u8.hash(state),
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Number(n) => {
                3u8.hash(state);
                n.to_bits().hash(state);
            }
            // Symbols and strings share a tag so that equal keys hash equally.
            Value::Symbol(s) => {
                4u8.hash(state);
                s.name().hash(state);
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Object(o) => {
                5u8.hash(state);
                state.write_u64(o.hash());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ops::as_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "<exception>"),
        }
    }
}

/// Non-local control flow raised during evaluation.
///
/// Produced on the error channel, distinct from `Ok(Value)`. Every evaluator
/// arm propagates these; `while`, `try` and the top-level driver inspect the
/// kind.
#[derive(Debug, Clone)]
pub enum Completion {
    Return(Value),
    Continue(Value),
    Break(Value),
    Exception(Value),
}

impl Completion {
    pub fn exception(msg: impl AsRef<str>) -> Completion {
        Completion::Exception(Value::string(msg))
    }

    /// The value carried by the completion, whatever its kind.
    pub fn into_value(self) -> Value {
        match self {
            Completion::Return(v)
            | Completion::Continue(v)
            | Completion::Break(v)
            | Completion::Exception(v) => v,
        }
    }
}

/// Result of evaluating anything: a value, or a completion unwinding past us.
pub type Eval<T = Value> = Result<T, Completion>;

/// Well-known symbols.
pub mod sym {
    use crate::interner::Symbol;

    pub fn less() -> Symbol {
        Symbol::intern("less")
    }

    pub fn equivalent() -> Symbol {
        Symbol::intern("equivalent")
    }

    pub fn greater() -> Symbol {
        Symbol::intern("greater")
    }

    pub fn unordered() -> Symbol {
        Symbol::intern("unordered")
    }

    pub fn none() -> Symbol {
        Symbol::intern("none")
    }

    pub fn boolean() -> Symbol {
        Symbol::intern("boolean")
    }

    pub fn integer() -> Symbol {
        Symbol::intern("integer")
    }

    pub fn number() -> Symbol {
        Symbol::intern("number")
    }

    pub fn symbol() -> Symbol {
        Symbol::intern("symbol")
    }

    pub fn string() -> Symbol {
        Symbol::intern("string")
    }

    pub fn object() -> Symbol {
        Symbol::intern("object")
    }

    pub fn from() -> Symbol {
        Symbol::intern("from")
    }

    pub fn of() -> Symbol {
        Symbol::intern("of")
    }
}
