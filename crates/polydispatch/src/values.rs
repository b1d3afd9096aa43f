use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::classes::ClassId;
use crate::engine::Engine;
use crate::error::RuntimeError;
use crate::typed_fn::TypedFunc;
use crate::types::{Type, TypeCon, TypeVar, VarSupply};

pub type BuiltinFunc = dyn Fn(Vec<Value>, &mut Engine) -> Result<Value, RuntimeError>;

#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    Adt(Rc<AdtValue>),
    Builtin(BuiltinValue),
    Typed(TypedFunc),
    Method(MethodValue),
    Opaque(Rc<dyn Describe>),
}

/// An untyped host function, curried over `arity` arguments.
pub struct BuiltinImpl {
    pub name: String,
    pub arity: usize,
    pub func: Rc<BuiltinFunc>,
}

#[derive(Clone)]
pub struct BuiltinValue {
    pub imp: Rc<BuiltinImpl>,
    pub args: Vec<Value>,
}

impl BuiltinValue {
    pub fn remaining(&self) -> usize {
        self.imp.arity.saturating_sub(self.args.len())
    }
}

/// A reference to a class method; the argument at `dispatch_on` picks the instance.
#[derive(Clone)]
pub struct MethodValue {
    pub class: ClassId,
    pub name: Rc<str>,
    pub arity: usize,
    pub dispatch_on: usize,
    pub args: Vec<Value>,
}

impl MethodValue {
    pub fn remaining(&self) -> usize {
        self.arity.saturating_sub(self.args.len())
    }
}

/// Capability for host types that take part in inference with their own type.
pub trait Describe {
    fn type_con(&self) -> TypeCon;

    fn describe(&self, _supply: &mut VarSupply) -> Type {
        Type::con(self.type_con())
    }

    fn render(&self) -> String {
        format!("<{}>", self.type_con())
    }

    fn as_any(&self) -> &dyn Any;
}

pub struct VariantDecl {
    pub name: String,
    /// Field types, written over the declaration's parameters.
    pub fields: Vec<Type>,
}

impl VariantDecl {
    pub fn new(name: &str, fields: Vec<Type>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }
}

/// Type descriptor of an algebraic data type: its constructor, parameters and variants.
pub struct AdtDecl {
    pub con: TypeCon,
    pub params: Vec<TypeVar>,
    pub variants: Vec<VariantDecl>,
}

/// An instance of an [`AdtDecl`]; only [`AdtDecl::construct`] builds one, so
/// `variant` always indexes `decl.variants`.
pub struct AdtValue {
    decl: Rc<AdtDecl>,
    variant: usize,
    fields: Vec<Value>,
}

impl AdtValue {
    pub fn decl(&self) -> &Rc<AdtDecl> {
        &self.decl
    }

    pub fn variant_decl(&self) -> &VariantDecl {
        &self.decl.variants[self.variant]
    }

    pub fn variant_name(&self) -> &str {
        &self.variant_decl().name
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }
}

impl AdtDecl {
    /// Declares a fresh type constructor with `params` parameters; `variants`
    /// receives the parameter types to build field templates from.
    pub fn new(
        name: &str,
        params: usize,
        variants: impl FnOnce(&[Type]) -> Vec<VariantDecl>,
    ) -> Rc<Self> {
        let mut supply = VarSupply::new();
        let params: Vec<TypeVar> = (0..params).map(|_| supply.fresh()).collect();
        let param_types: Vec<Type> = params.iter().cloned().map(Type::Var).collect();
        Rc::new(Self {
            con: TypeCon::declare(name),
            params,
            variants: variants(&param_types),
        })
    }

    pub fn variant(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|variant| variant.name == name)
    }

    pub fn construct(
        self: &Rc<Self>,
        variant: &str,
        fields: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let index = self.variant(variant).ok_or_else(|| {
            RuntimeError::Message(format!("{} has no constructor {variant}", self.con))
        })?;
        let expected = self.variants[index].fields.len();
        if fields.len() != expected {
            return Err(RuntimeError::ArityMismatch {
                expected,
                found: fields.len(),
            });
        }
        Ok(Value::Adt(Rc::new(AdtValue {
            decl: self.clone(),
            variant: index,
            fields,
        })))
    }
}

impl Value {
    pub fn builtin(
        name: &str,
        arity: usize,
        func: impl Fn(Vec<Value>, &mut Engine) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Value::Builtin(BuiltinValue {
            imp: Rc::new(BuiltinImpl {
                name: name.to_string(),
                arity,
                func: Rc::new(func),
            }),
            args: Vec::new(),
        })
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn text(text: &str) -> Self {
        Value::Text(text.to_string())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Builtin(_) | Value::Typed(_) | Value::Method(_)
        )
    }
}

/// Data values compare structurally; functions and opaque values never compare equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Adt(a), Value::Adt(b)) => {
                a.decl.con == b.decl.con && a.variant == b.variant && a.fields == b.fields
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self, false))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self, false))
    }
}

fn format_value(value: &Value, nested: bool) -> String {
    match value {
        Value::Unit => "Unit".to_string(),
        Value::Bool(value) => {
            if *value {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        Value::Int(value) => value.to_string(),
        Value::Float(value) => format!("{value:?}"),
        Value::Text(value) => value.clone(),
        Value::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| format_value(item, false))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Tuple(items) => format!(
            "({})",
            items
                .iter()
                .map(|item| format_value(item, false))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Adt(adt) => {
            if adt.fields().is_empty() {
                return adt.variant_name().to_string();
            }
            let mut text = adt.variant_name().to_string();
            for field in adt.fields() {
                text.push(' ');
                text.push_str(&format_value(field, true));
            }
            if nested {
                format!("({text})")
            } else {
                text
            }
        }
        Value::Builtin(builtin) => format!("<builtin:{}>", builtin.imp.name),
        Value::Typed(typed) => format!("<typed:{}>", typed.name()),
        Value::Method(method) => format!("<method:{}>", method.name),
        Value::Opaque(opaque) => opaque.render(),
    }
}
