//! Syntax tree nodes.
//!
//! Every node is an object whose `eval` implements its semantics; nodes
//! also render a source-like form through `string`, which `assert` uses for
//! its failure messages. Constructors return ready-made [`Value`]s so the
//! parser can mix nodes and literals freely.

use std::rc::Rc;

use crate::interner::Symbol;
use crate::object::{Code, Environment, Func, List, ObjRef, Object, Param, Table};
use crate::ops;
use crate::value::{sym, Completion, Eval, Value};

/// `assert expr`
#[derive(Debug)]
pub struct AssertExpr {
    expr: Value,
}

impl AssertExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(AssertExpr { expr }))
    }
}

impl Object for AssertExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let res = ops::op_eval(&self.expr, env)?;
        if !ops::as_boolean(&res)? {
            return Err(Completion::Exception(Value::string(format!(
                "assertion failed {}",
                self.expr
            ))));
        }
        Ok(res)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("assert {}", self.expr)))
    }
}

/// `lhs == rhs`
#[derive(Debug)]
pub struct EqExpr {
    lhs: Value,
    rhs: Value,
}

impl EqExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(EqExpr { lhs, rhs }))
    }
}

impl Object for EqExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        Ok(Value::Boolean(ops::op_eq(&lhs, &rhs)?))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} == {}", self.lhs, self.rhs)))
    }
}

/// `lhs != rhs`
#[derive(Debug)]
pub struct NEqExpr {
    lhs: Value,
    rhs: Value,
}

impl NEqExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(NEqExpr { lhs, rhs }))
    }
}

impl Object for NEqExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        Ok(Value::Boolean(!ops::op_eq(&lhs, &rhs)?))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} != {}", self.lhs, self.rhs)))
    }
}

/// `lhs < rhs`
#[derive(Debug)]
pub struct LtExpr {
    lhs: Value,
    rhs: Value,
}

impl LtExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(LtExpr { lhs, rhs }))
    }
}

impl Object for LtExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        let order = ops::op_cmp(&lhs, &rhs)?;
        Ok(Value::Boolean(order == sym::less()))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} < {}", self.lhs, self.rhs)))
    }
}

/// `lhs <= rhs`
#[derive(Debug)]
pub struct LtEqExpr {
    lhs: Value,
    rhs: Value,
}

impl LtEqExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(LtEqExpr { lhs, rhs }))
    }
}

impl Object for LtEqExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        let order = ops::op_cmp(&lhs, &rhs)?;
        Ok(Value::Boolean(order == sym::less() || order == sym::equivalent()))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} <= {}", self.lhs, self.rhs)))
    }
}

/// `lhs > rhs`
#[derive(Debug)]
pub struct GtExpr {
    lhs: Value,
    rhs: Value,
}

impl GtExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(GtExpr { lhs, rhs }))
    }
}

impl Object for GtExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        let order = ops::op_cmp(&lhs, &rhs)?;
        Ok(Value::Boolean(order == sym::greater()))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} > {}", self.lhs, self.rhs)))
    }
}

/// `lhs >= rhs`
#[derive(Debug)]
pub struct GtEqExpr {
    lhs: Value,
    rhs: Value,
}

impl GtEqExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(GtEqExpr { lhs, rhs }))
    }
}

impl Object for GtEqExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        let order = ops::op_cmp(&lhs, &rhs)?;
        Ok(Value::Boolean(
            order == sym::greater() || order == sym::equivalent(),
        ))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} >= {}", self.lhs, self.rhs)))
    }
}

/// `lhs and rhs`
#[derive(Debug)]
pub struct AndExpr {
    lhs: Value,
    rhs: Value,
}

impl AndExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(AndExpr { lhs, rhs }))
    }
}

impl Object for AndExpr {
    // Both sides always evaluate; `and` does not short-circuit.
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_and(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} and {}", self.lhs, self.rhs)))
    }
}

/// `lhs or rhs`
#[derive(Debug)]
pub struct OrExpr {
    lhs: Value,
    rhs: Value,
}

impl OrExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(OrExpr { lhs, rhs }))
    }
}

impl Object for OrExpr {
    // Both sides always evaluate; `or` does not short-circuit.
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_or(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} or {}", self.lhs, self.rhs)))
    }
}

/// `not expr`
#[derive(Debug)]
pub struct NotExpr {
    expr: Value,
}

impl NotExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(NotExpr { expr }))
    }
}

impl Object for NotExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let expr = ops::op_eval(&self.expr, env)?;
        ops::op_not(&expr)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("not {}", self.expr)))
    }
}

/// `-expr`
#[derive(Debug)]
pub struct NegExpr {
    expr: Value,
}

impl NegExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(NegExpr { expr }))
    }
}

impl Object for NegExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let expr = ops::op_eval(&self.expr, env)?;
        ops::op_neg(&expr)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("-{}", self.expr)))
    }
}

/// `lhs + rhs`
#[derive(Debug)]
pub struct AddExpr {
    lhs: Value,
    rhs: Value,
}

impl AddExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(AddExpr { lhs, rhs }))
    }
}

impl Object for AddExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_add(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} + {}", self.lhs, self.rhs)))
    }
}

/// `lhs - rhs`
#[derive(Debug)]
pub struct SubExpr {
    lhs: Value,
    rhs: Value,
}

impl SubExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(SubExpr { lhs, rhs }))
    }
}

impl Object for SubExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_sub(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} - {}", self.lhs, self.rhs)))
    }
}

/// `lhs * rhs`
#[derive(Debug)]
pub struct MulExpr {
    lhs: Value,
    rhs: Value,
}

impl MulExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(MulExpr { lhs, rhs }))
    }
}

impl Object for MulExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_mul(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} * {}", self.lhs, self.rhs)))
    }
}

/// `lhs / rhs`
#[derive(Debug)]
pub struct DivExpr {
    lhs: Value,
    rhs: Value,
}

impl DivExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(DivExpr { lhs, rhs }))
    }
}

impl Object for DivExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_div(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} / {}", self.lhs, self.rhs)))
    }
}

/// `lhs % rhs`
#[derive(Debug)]
pub struct ModExpr {
    lhs: Value,
    rhs: Value,
}

impl ModExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(ModExpr { lhs, rhs }))
    }
}

impl Object for ModExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_mod(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} % {}", self.lhs, self.rhs)))
    }
}

/// `~expr`
#[derive(Debug)]
pub struct BinNotExpr {
    expr: Value,
}

impl BinNotExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(BinNotExpr { expr }))
    }
}

impl Object for BinNotExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let expr = ops::op_eval(&self.expr, env)?;
        ops::op_bin_not(&expr)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("~{}", self.expr)))
    }
}

/// `lhs & rhs`
#[derive(Debug)]
pub struct BinAndExpr {
    lhs: Value,
    rhs: Value,
}

impl BinAndExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(BinAndExpr { lhs, rhs }))
    }
}

impl Object for BinAndExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_bin_and(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} & {}", self.lhs, self.rhs)))
    }
}

/// `lhs | rhs`
#[derive(Debug)]
pub struct BinOrExpr {
    lhs: Value,
    rhs: Value,
}

impl BinOrExpr {
    pub fn new(lhs: Value, rhs: Value) -> Value {
        Value::Object(Rc::new(BinOrExpr { lhs, rhs }))
    }
}

impl Object for BinOrExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let lhs = ops::op_eval(&self.lhs, env)?;
        let rhs = ops::op_eval(&self.rhs, env)?;
        ops::op_bin_or(&lhs, &rhs)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} | {}", self.lhs, self.rhs)))
    }
}

/// `target.key` / `target[key]`
#[derive(Debug)]
pub struct GetExpr {
    pub(crate) target: Value,
    pub(crate) key: Value,
}

impl GetExpr {
    pub fn new(target: Value, key: Value) -> Value {
        Value::Object(Rc::new(GetExpr { target, key }))
    }
}

impl Object for GetExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let target = ops::op_eval(&self.target, env)?;
        let key = ops::op_eval(&self.key, env)?;
        ops::op_get(&target, &key)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{}[{}]", self.target, self.key)))
    }
}

/// `target.key = value` / `target[key] = value`
#[derive(Debug)]
pub struct SetExpr {
    target: Value,
    key: Value,
    value: Value,
}

impl SetExpr {
    pub fn new(target: Value, key: Value, value: Value) -> Value {
        Value::Object(Rc::new(SetExpr { target, key, value }))
    }
}

impl Object for SetExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let target = ops::op_eval(&self.target, env)?;
        let key = ops::op_eval(&self.key, env)?;
        let value = ops::op_eval(&self.value, env)?;
        ops::op_set(&target, key, value)?;
        Ok(Value::None)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!(
            "{}[{}] = {}",
            self.target, self.key, self.value
        )))
    }
}

/// `name = value`: stores through the environment's `set` rule.
#[derive(Debug)]
pub struct SetEnvExpr {
    key: Value,
    value: Value,
}

impl SetEnvExpr {
    pub fn new(key: Value, value: Value) -> Value {
        Value::Object(Rc::new(SetEnvExpr { key, value }))
    }
}

impl Object for SetEnvExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let key = ops::op_eval(&self.key, env)?;
        let value = ops::op_eval(&self.value, env)?;
        env.set(key, value)?;
        Ok(Value::None)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} = {}", self.key, self.value)))
    }
}

/// `var name = value`: always declares in the current scope.
#[derive(Debug)]
pub struct DeclExpr {
    key: Value,
    value: Value,
}

impl DeclExpr {
    pub fn new(key: Value, value: Value) -> Value {
        Value::Object(Rc::new(DeclExpr { key, value }))
    }
}

impl Object for DeclExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let value = ops::op_eval(&self.value, env)?;
        env.decl(self.key.clone(), value.clone())?;
        Ok(value)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("var {} = {}", self.key, self.value)))
    }
}

/// `expr is type`
#[derive(Debug)]
pub struct IsExpr {
    expr: Value,
    ty: Value,
}

impl IsExpr {
    pub fn new(expr: Value, ty: Value) -> Value {
        Value::Object(Rc::new(IsExpr { expr, ty }))
    }
}

impl Object for IsExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let ty = ops::op_eval(&self.ty, env)?;
        let expr = ops::op_eval(&self.expr, env)?;
        Ok(Value::Boolean(ops::is(&expr, &ops::as_symbol(&ty)?)))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} is {}", self.expr, self.ty)))
    }
}

/// `expr as type`
#[derive(Debug)]
pub struct AsExpr {
    expr: Value,
    ty: Value,
}

impl AsExpr {
    pub fn new(expr: Value, ty: Value) -> Value {
        Value::Object(Rc::new(AsExpr { expr, ty }))
    }
}

impl Object for AsExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let ty = ops::op_eval(&self.ty, env)?;
        let expr = ops::op_eval(&self.expr, env)?;
        ops::as_type(&expr, &ops::as_symbol(&ty)?)
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("{} as {}", self.expr, self.ty)))
    }
}

/// `typeof expr`
#[derive(Debug)]
pub struct TypeOfExpr {
    expr: Value,
}

impl TypeOfExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(TypeOfExpr { expr }))
    }
}

impl Object for TypeOfExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        Ok(Value::Symbol(ops::type_of(&ops::op_eval(&self.expr, env)?)))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("typeof({})", self.expr)))
    }
}

/// `#value`: the captured value, unevaluated.
#[derive(Debug)]
pub struct QuoteExpr {
    value: Value,
}

impl QuoteExpr {
    pub fn new(value: Value) -> Value {
        Value::Object(Rc::new(QuoteExpr { value }))
    }
}

impl Object for QuoteExpr {
    fn eval(&self, _env: &ObjRef) -> Eval {
        Ok(self.value.clone())
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("#{}", self.value)))
    }
}

/// `return expr`
#[derive(Debug)]
pub struct ReturnExpr {
    expr: Value,
}

impl ReturnExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(ReturnExpr { expr }))
    }
}

impl Object for ReturnExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let value = ops::op_eval(&self.expr, env)?;
        Err(Completion::Return(value))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("return {}", self.expr)))
    }
}

/// `continue expr`
#[derive(Debug)]
pub struct ContinueExpr {
    expr: Value,
}

impl ContinueExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(ContinueExpr { expr }))
    }
}

impl Object for ContinueExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let value = ops::op_eval(&self.expr, env)?;
        Err(Completion::Continue(value))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("continue {}", self.expr)))
    }
}

/// `break expr`
#[derive(Debug)]
pub struct BreakExpr {
    expr: Value,
}

impl BreakExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(BreakExpr { expr }))
    }
}

impl Object for BreakExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let value = ops::op_eval(&self.expr, env)?;
        Err(Completion::Break(value))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("break {}", self.expr)))
    }
}

/// `throw expr`
#[derive(Debug)]
pub struct ThrowExpr {
    expr: Value,
}

impl ThrowExpr {
    pub fn new(expr: Value) -> Value {
        Value::Object(Rc::new(ThrowExpr { expr }))
    }
}

impl Object for ThrowExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let value = ops::op_eval(&self.expr, env)?;
        Err(Completion::Exception(value))
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("throw {}", self.expr)))
    }
}

/// `{ expr; ... }`
///
/// The top-level program is an unscoped block; every other block introduces
/// a child scope.
#[derive(Debug)]
pub struct BlockExpr {
    exprs: Vec<Value>,
    scoped: bool,
}

impl BlockExpr {
    pub fn new(exprs: Vec<Value>) -> Value {
        Value::Object(Rc::new(BlockExpr {
            exprs,
            scoped: true,
        }))
    }

    pub fn unscoped(exprs: Vec<Value>) -> Value {
        Value::Object(Rc::new(BlockExpr {
            exprs,
            scoped: false,
        }))
    }
}

impl Object for BlockExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let inner = if self.scoped {
            Environment::create(Value::Object(env.clone()))
        } else {
            env.clone()
        };

        let mut last = Value::None;
        for expr in &self.exprs {
            last = ops::op_eval(expr, &inner)?;
        }
        Ok(last)
    }

    fn string(&self) -> Eval {
        let mut out = String::from("{");
        let mut first = true;
        for expr in &self.exprs {
            if !first {
                out.push_str("; ");
            }
            first = false;
            out.push_str(&format!("{}", expr));
        }
        out.push('}');
        Ok(Value::string(out))
    }
}

/// `{ key: expr, ... }`: keys come straight from the parser (symbols or
/// literal values) and are not evaluated.
#[derive(Debug)]
pub struct TableExpr {
    entries: Vec<(Value, Value)>,
}

impl TableExpr {
    pub fn new(entries: Vec<(Value, Value)>) -> Value {
        Value::Object(Rc::new(TableExpr { entries }))
    }
}

impl Object for TableExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let table = Table::create();
        for (key, vexpr) in &self.entries {
            let value = ops::op_eval(vexpr, env)?;
            table.set(key.clone(), value)?;
        }
        Ok(Value::Object(table))
    }

    fn string(&self) -> Eval {
        let mut out = String::from("{");
        let mut first = true;
        for (key, vexpr) in &self.entries {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&format!("{}: {}", key, vexpr));
        }
        out.push('}');
        Ok(Value::string(out))
    }
}

/// `[expr, ...]`
#[derive(Debug)]
pub struct ListExpr {
    exprs: Vec<Value>,
}

impl ListExpr {
    pub fn new(exprs: Vec<Value>) -> Value {
        Value::Object(Rc::new(ListExpr { exprs }))
    }
}

impl Object for ListExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let mut items = Vec::with_capacity(self.exprs.len());
        for expr in &self.exprs {
            items.push(ops::op_eval(expr, env)?);
        }
        Ok(Value::Object(List::create(items)))
    }

    fn string(&self) -> Eval {
        let mut out = String::from("[");
        let mut first = true;
        for expr in &self.exprs {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&format!("{}", expr));
        }
        out.push(']');
        Ok(Value::string(out))
    }
}

/// `if cond then [else els]`; a missing else arm is `none`.
#[derive(Debug)]
pub struct IfExpr {
    cond: Value,
    then: Value,
    els: Value,
}

impl IfExpr {
    pub fn new(cond: Value, then: Value, els: Value) -> Value {
        Value::Object(Rc::new(IfExpr { cond, then, els }))
    }
}

impl Object for IfExpr {
    fn eval(&self, env: &ObjRef) -> Eval {
        let cond = ops::op_eval(&self.cond, env)?;
        let branch = if ops::as_boolean(&cond)? {
            &self.then
        } else {
            &self.els
        };
        ops::op_eval(branch, env)
    }

    fn string(&self) -> Eval {
        if ops::is_none(&self.els) {
            Ok(Value::string(format!("if ({}) {}", self.cond, self.then)))
        } else {
            Ok(Value::string(format!(
                "if ({}) {} else {}",
                self.cond, self.then, self.els
            )))
        }
    }
}

/// `while cond body`
#[derive(Debug)]
pub struct WhileExpr {
    cond: Value,
    body: Value,
}

impl WhileExpr {
    pub fn new(cond: Value, body: Value) -> Value {
        Value::Object(Rc::new(WhileExpr { cond, body }))
    }
}

impl Object for WhileExpr {
    // The result is the last normally-evaluated body value, or the break
    // payload when a break exits the loop. Return and exception completions
    // unwind past the loop.
    fn eval(&self, env: &ObjRef) -> Eval {
        let mut res = Value::None;
        loop {
            let cond = ops::op_eval(&self.cond, env)?;
            if !ops::as_boolean(&cond)? {
                return Ok(res);
            }

            match ops::op_eval(&self.body, env) {
                Ok(value) => res = value,
                Err(Completion::Continue(_)) => (),
                Err(Completion::Break(value)) => return Ok(value),
                Err(completion) => return Err(completion),
            }
        }
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!("while ({}) {}", self.cond, self.body)))
    }
}

/// `try expr catch (ident) expr`
#[derive(Debug)]
pub struct TryExpr {
    try_arm: Value,
    err_ident: Value,
    catch_arm: Value,
}

impl TryExpr {
    pub fn new(try_arm: Value, err_ident: Value, catch_arm: Value) -> Value {
        Value::Object(Rc::new(TryExpr {
            try_arm,
            err_ident,
            catch_arm,
        }))
    }
}

impl Object for TryExpr {
    // Only exceptions are caught; other completions unwind past the try.
    fn eval(&self, env: &ObjRef) -> Eval {
        match ops::op_eval(&self.try_arm, env) {
            Ok(value) => Ok(value),
            Err(Completion::Exception(value)) => {
                let catch_env = Environment::create(Value::Object(env.clone()));
                catch_env.decl(self.err_ident.clone(), value)?;
                ops::op_eval(&self.catch_arm, &catch_env)
            }
            Err(completion) => Err(completion),
        }
    }

    fn string(&self) -> Eval {
        Ok(Value::string(format!(
            "try {} catch ({}) {}",
            self.try_arm, self.err_ident, self.catch_arm
        )))
    }
}

/// One parameter in a function literal, default not yet evaluated.
#[derive(Debug, Clone)]
pub struct ParamExpr {
    pub key: Symbol,
    pub value: Option<Value>,
}

/// `fn (params) expr`
#[derive(Debug)]
pub struct FuncExpr {
    sig: Vec<ParamExpr>,
    code: Value,
}

impl FuncExpr {
    pub fn new(sig: Vec<ParamExpr>, code: Value) -> Value {
        Value::Object(Rc::new(FuncExpr { sig, code }))
    }
}

impl Object for FuncExpr {
    // Defaults are evaluated once, in the defining environment.
    fn eval(&self, env: &ObjRef) -> Eval {
        let mut sig = Vec::with_capacity(self.sig.len());
        for s in &self.sig {
            let mut p = Param::required(s.key.clone());
            if let Some(default) = &s.value {
                p.value = ops::op_eval(default, env)?;
                p.required = false;
            }
            sig.push(p);
        }
        Ok(Value::Object(Func::create(
            env.clone(),
            sig,
            Code::Expr(self.code.clone()),
        )))
    }

    fn string(&self) -> Eval {
        let mut out = String::from("fn (");
        let mut first = true;
        for s in &self.sig {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(s.key.name());
            if let Some(default) = &s.value {
                out.push_str(&format!(": {}", default));
            }
        }
        out.push_str(") ");
        out.push_str(&format!("{}", self.code));
        Ok(Value::string(out))
    }
}

/// One call argument: named when `key` is present, positional otherwise.
#[derive(Debug, Clone)]
pub struct ArgExpr {
    pub key: Option<Symbol>,
    pub expr: Value,
}

/// `callee(args...)`
#[derive(Debug)]
pub struct CallExpr {
    func: Value,
    args: Vec<ArgExpr>,
}

impl CallExpr {
    pub fn new(func: Value, args: Vec<ArgExpr>) -> Value {
        Value::Object(Rc::new(CallExpr { func, args }))
    }
}

impl Object for CallExpr {
    // Arguments evaluate left to right; positional arguments are keyed by
    // 0-based integers, named arguments by their symbol.
    fn eval(&self, env: &ObjRef) -> Eval {
        let func = ops::op_eval(&self.func, env)?;
        let params = Table::create();

        let mut index: i64 = 0;
        for arg in &self.args {
            let value = ops::op_eval(&arg.expr, env)?;
            match &arg.key {
                Some(key) => params.set(Value::Symbol(key.clone()), value)?,
                None => {
                    params.set(Value::Integer(index), value)?;
                    index += 1;
                }
            }
        }

        ops::op_call(&func, &params)
    }

    fn string(&self) -> Eval {
        let mut out = format!("{}(", self.func);
        let mut first = true;
        for arg in &self.args {
            if !first {
                out.push_str(", ");
            }
            first = false;
            match &arg.key {
                Some(key) => out.push_str(&format!("{}: {}", key, arg.expr)),
                None => out.push_str(&format!("{}", arg.expr)),
            }
        }
        out.push(')');
        Ok(Value::string(out))
    }
}
