//! The standard classes and their instances for native values.
//!
//! Class hierarchy: `Ord` requires `Eq`, `Monad` requires `Applicative`,
//! which requires `Functor`. `Show` and `Eq` can be derived for ADTs.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::classes::{ClassDecl, ClassId, MethodRecord, Registry};
use crate::engine::Engine;
use crate::error::{ClassError, RuntimeError};
use crate::types::TypeCon;
use crate::values::{MethodValue, Value};

#[derive(Debug, Clone, Copy)]
pub struct Prelude {
    pub show: ClassId,
    pub eq: ClassId,
    pub ord: ClassId,
    pub num: ClassId,
    pub functor: ClassId,
    pub applicative: ClassId,
    pub monad: ClassId,
}

impl Prelude {
    /// A fresh registry holding the standard classes and native instances.
    pub fn standard() -> Result<(Registry, Prelude), ClassError> {
        let mut registry = Registry::new();
        let prelude = Prelude::install(&mut registry)?;
        Ok((registry, prelude))
    }

    pub fn install(registry: &mut Registry) -> Result<Self, ClassError> {
        let show = registry.declare(
            ClassDecl::new("Show")
                .method("show")
                .deriving(|_, _| Ok(show_record())),
        )?;
        let eq = registry.declare(
            ClassDecl::new("Eq")
                .method("eq")
                .deriving(|_, _| Ok(eq_record())),
        )?;
        let ord = registry.declare(ClassDecl::new("Ord").superclass(eq).method("compare"))?;
        let num = registry.declare(
            ClassDecl::new("Num")
                .method("add")
                .method("sub")
                .method("mul")
                .method("negate"),
        )?;
        let functor = registry.declare(ClassDecl::new("Functor").method("fmap"))?;
        let applicative = registry.declare(
            ClassDecl::new("Applicative")
                .superclass(functor)
                .method("pure")
                .method("ap"),
        )?;
        let monad =
            registry.declare(ClassDecl::new("Monad").superclass(applicative).method("bind"))?;

        let prelude = Prelude {
            show,
            eq,
            ord,
            num,
            functor,
            applicative,
            monad,
        };
        prelude.register_natives(registry)?;
        Ok(prelude)
    }

    fn register_natives(&self, registry: &mut Registry) -> Result<(), ClassError> {
        let data = [
            TypeCon::unit(),
            TypeCon::bool(),
            TypeCon::int(),
            TypeCon::float(),
            TypeCon::text(),
            TypeCon::list(),
            TypeCon::tuple(),
        ];
        for ty in &data {
            registry.register_instance(self.show, ty, show_record())?;
            registry.register_instance(self.eq, ty, eq_record())?;
        }
        for ty in [
            TypeCon::bool(),
            TypeCon::int(),
            TypeCon::float(),
            TypeCon::text(),
        ] {
            registry.register_instance(self.ord, &ty, ord_record())?;
        }
        for ty in [TypeCon::int(), TypeCon::float()] {
            registry.register_instance(self.num, &ty, num_record())?;
        }

        let list = TypeCon::list();
        registry.register_instance(
            self.functor,
            &list,
            MethodRecord::new().with("fmap", Value::builtin("fmap", 2, list_fmap)),
        )?;
        registry.register_instance(
            self.applicative,
            &list,
            MethodRecord::new()
                .with(
                    "pure",
                    Value::builtin("pure", 1, |args, _| Ok(Value::list(args))),
                )
                .with("ap", Value::builtin("ap", 2, list_ap)),
        )?;
        registry.register_instance(
            self.monad,
            &list,
            MethodRecord::new().with("bind", Value::builtin("bind", 2, list_bind)),
        )?;
        Ok(())
    }

    /// `fmap f container`, dispatched on the container.
    pub fn fmap(&self) -> Value {
        method(self.functor, "fmap", 2, 1)
    }

    /// `bind container continuation`, dispatched on the container.
    pub fn bind(&self) -> Value {
        method(self.monad, "bind", 2, 0)
    }

    pub fn ap(&self) -> Value {
        method(self.applicative, "ap", 2, 0)
    }

    pub fn show(&self) -> Value {
        method(self.show, "show", 1, 0)
    }

    pub fn eq(&self) -> Value {
        method(self.eq, "eq", 2, 0)
    }

    pub fn compare(&self) -> Value {
        method(self.ord, "compare", 2, 0)
    }

    pub fn add(&self) -> Value {
        method(self.num, "add", 2, 0)
    }

    /// `pure` cannot be dispatched on an argument, so the target type is explicit.
    pub fn pure(
        &self,
        engine: &mut Engine,
        ty: &TypeCon,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        engine.call_instance(self.applicative, ty, "pure", vec![value])
    }
}

fn method(class: ClassId, name: &str, arity: usize, dispatch_on: usize) -> Value {
    Value::Method(MethodValue {
        class,
        name: Rc::from(name),
        arity,
        dispatch_on,
        args: Vec::new(),
    })
}

fn take<const N: usize>(args: Vec<Value>, ctx: &str) -> Result<[Value; N], RuntimeError> {
    let found = args.len();
    args.try_into()
        .map_err(|_| RuntimeError::Message(format!("{ctx} expects {N} argument(s), got {found}")))
}

fn show_record() -> MethodRecord {
    MethodRecord::new().with(
        "show",
        Value::builtin("show", 1, |args, _| {
            let [value] = take(args, "show")?;
            Ok(Value::Text(value.to_string()))
        }),
    )
}

fn eq_record() -> MethodRecord {
    MethodRecord::new().with(
        "eq",
        Value::builtin("eq", 2, |args, _| {
            let [left, right] = take(args, "eq")?;
            Ok(Value::Bool(left == right))
        }),
    )
}

fn ord_record() -> MethodRecord {
    MethodRecord::new().with(
        "compare",
        Value::builtin("compare", 2, |args, _| {
            let [left, right] = take(args, "compare")?;
            let ordering = compare_values(&left, &right)?;
            Ok(Value::Int(ordering as i64))
        }),
    )
}

fn compare_values(left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.ok_or_else(|| RuntimeError::Message(format!("cannot compare {left} with {right}")))
}

fn num_record() -> MethodRecord {
    MethodRecord::new()
        .with("add", arith("add", i64::checked_add, |a, b| a + b))
        .with("sub", arith("sub", i64::checked_sub, |a, b| a - b))
        .with("mul", arith("mul", i64::checked_mul, |a, b| a * b))
        .with(
            "negate",
            Value::builtin("negate", 1, |args, _| {
                let [value] = take(args, "negate")?;
                match value {
                    Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
                    Value::Float(x) => Ok(Value::Float(-x)),
                    other => Err(RuntimeError::Message(format!(
                        "negate expects a number, got {other}"
                    ))),
                }
            }),
        )
}

fn arith(
    name: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    Value::builtin(name, 2, move |args, _| {
        let [left, right] = take(args, name)?;
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_op(a, b).map(Value::Int).ok_or_else(overflow),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(a, b))),
            (a, b) => Err(RuntimeError::Message(format!(
                "{name} expects two numbers of one type, got {a} and {b}"
            ))),
        }
    })
}

fn overflow() -> RuntimeError {
    RuntimeError::Message("integer overflow".to_string())
}

fn expect_list(value: Value, ctx: &str) -> Result<Rc<Vec<Value>>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(RuntimeError::Message(format!("{ctx} expects List, got {other}"))),
    }
}

fn list_fmap(args: Vec<Value>, engine: &mut Engine) -> Result<Value, RuntimeError> {
    let [func, container] = take(args, "fmap")?;
    let items = expect_list(container, "fmap")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items.iter().cloned() {
        out.push(engine.apply(func.clone(), vec![item])?);
    }
    Ok(Value::list(out))
}

fn list_ap(args: Vec<Value>, engine: &mut Engine) -> Result<Value, RuntimeError> {
    let [funcs, container] = take(args, "ap")?;
    let funcs = expect_list(funcs, "ap")?;
    let items = expect_list(container, "ap")?;
    let mut out = Vec::new();
    for func in funcs.iter() {
        for item in items.iter().cloned() {
            out.push(engine.apply(func.clone(), vec![item])?);
        }
    }
    Ok(Value::list(out))
}

fn list_bind(args: Vec<Value>, engine: &mut Engine) -> Result<Value, RuntimeError> {
    let [container, continuation] = take(args, "bind")?;
    let items = expect_list(container, "bind")?;
    let mut out = Vec::new();
    for item in items.iter().cloned() {
        let produced = engine.apply(continuation.clone(), vec![item])?;
        out.extend(expect_list(produced, "bind continuation")?.iter().cloned());
    }
    Ok(Value::list(out))
}
