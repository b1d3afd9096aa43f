use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::{trace_enabled, TraceConcern};
use crate::error::TypeError;
use crate::types::{prune, Type, TypeOp, TypeVar, VarSupply};


/// Identity of a binding in a [`TypeEnv`]: an argument slot, a function, a let name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(Rc<str>);

impl Ident {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident(Rc::from(name))
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident(Rc::from(name))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Var {
        name: Ident,
    },
    App {
        func: Box<Expr>,
        arg: Box<Expr>,
    },
    Lambda {
        param: Ident,
        body: Box<Expr>,
    },
    /// Always recursive: `name` is in scope inside `defn`.
    Let {
        name: Ident,
        defn: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<Ident>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn app(func: Expr, arg: Expr) -> Self {
        Expr::App {
            func: Box::new(func),
            arg: Box::new(arg),
        }
    }

    pub fn lambda(param: impl Into<Ident>, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            body: Box::new(body),
        }
    }

    pub fn let_in(name: impl Into<Ident>, defn: Expr, body: Expr) -> Self {
        Expr::Let {
            name: name.into(),
            defn: Box::new(defn),
            body: Box::new(body),
        }
    }
}

/// Insertion-ordered typing environment. Extending returns a new scope and
/// leaves the receiver untouched.
#[derive(Clone, Default)]
pub struct TypeEnv {
    bindings: im::Vector<(Ident, Type)>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, name: impl Into<Ident>, ty: Type) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.push_back((name.into(), ty));
        Self { bindings }
    }

    pub fn get(&self, name: &Ident) -> Option<&Type> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, ty)| ty)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &Type)> {
        self.bindings.iter().map(|(name, ty)| (name, ty))
    }
}

/// Variables that must be shared, not copied, by [`fresh`].
#[derive(Clone, Default)]
pub struct NonGeneric {
    vars: im::Vector<TypeVar>,
}

impl NonGeneric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, var: TypeVar) -> Self {
        let mut vars = self.vars.clone();
        vars.push_back(var);
        Self { vars }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<TypeVar> for NonGeneric {
    fn from_iter<I: IntoIterator<Item = TypeVar>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

pub fn unify(left: &Type, right: &Type) -> Result<(), TypeError> {
    let left = prune(left);
    let right = prune(right);
    if trace_enabled(TraceConcern::Unify) {
        tracing::trace!(target: "polydispatch::unify", left = %left, right = %right, "unify");
    }
    match (&left, &right) {
        (Type::Var(var), _) => {
            if let Type::Var(other) = &right {
                if var == other {
                    return Ok(());
                }
            }
            if occurs_in_type(var, &right) {
                return Err(TypeError::RecursiveUnification {
                    var: left.to_string(),
                    ty: right.to_string(),
                });
            }
            var.bind(right.clone());
            Ok(())
        }
        (Type::Op(_), Type::Var(_)) => unify(&right, &left),
        (Type::Op(a), Type::Op(b)) => {
            if a.con != b.con || a.args.len() != b.args.len() {
                return Err(TypeError::TypeMismatch {
                    expected: left.to_string(),
                    found: right.to_string(),
                });
            }
            for (x, y) in a.args.iter().zip(b.args.iter()) {
                unify(x, y)?;
            }
            Ok(())
        }
    }
}

/// Whether `var` appears in `ty`, looking through bound variables.
pub fn occurs_in_type(var: &TypeVar, ty: &Type) -> bool {
    match prune(ty) {
        Type::Var(other) => other == *var,
        Type::Op(op) => occurs_in(var, &op.args),
    }
}

pub fn occurs_in<'a>(var: &TypeVar, types: impl IntoIterator<Item = &'a Type>) -> bool {
    types.into_iter().any(|ty| occurs_in_type(var, ty))
}

pub fn is_generic(var: &TypeVar, non_generic: &NonGeneric) -> bool {
    !non_generic
        .vars
        .iter()
        .any(|bound| occurs_in_type(var, &Type::Var(bound.clone())))
}

/// Copies `ty`, replacing every generic variable with a new one.
pub fn fresh(ty: &Type, non_generic: &NonGeneric, supply: &mut VarSupply) -> Type {
    let mut mapping = HashMap::new();
    fresh_mapped(ty, non_generic, supply, &mut mapping)
}

/// [`fresh`] with a caller-owned mapping, so several terms can be copied
/// consistently and the caller can see where each generic variable went.
pub fn fresh_mapped(
    ty: &Type,
    non_generic: &NonGeneric,
    supply: &mut VarSupply,
    mapping: &mut HashMap<TypeVar, TypeVar>,
) -> Type {
    match prune(ty) {
        Type::Var(var) => {
            if !is_generic(&var, non_generic) {
                return Type::Var(var);
            }
            let copy = mapping
                .entry(var)
                .or_insert_with(|| supply.fresh())
                .clone();
            Type::Var(copy)
        }
        Type::Op(op) => Type::Op(TypeOp {
            con: op.con.clone(),
            args: op
                .args
                .iter()
                .map(|arg| fresh_mapped(arg, non_generic, supply, mapping))
                .collect(),
        }),
    }
}

pub fn analyze(
    expr: &Expr,
    env: &TypeEnv,
    non_generic: &NonGeneric,
    supply: &mut VarSupply,
) -> Result<Type, TypeError> {
    match expr {
        Expr::Var { name } => {
            let ty = env
                .get(name)
                .ok_or_else(|| TypeError::UndefinedSymbol(name.to_string()))?;
            Ok(fresh(ty, non_generic, supply))
        }
        Expr::App { func, arg } => {
            let func_ty = analyze(func, env, non_generic, supply)?;
            let arg_ty = analyze(arg, env, non_generic, supply)?;
            let result = supply.fresh_type();
            unify(&Type::function(arg_ty, result.clone()), &func_ty)?;
            Ok(result)
        }
        Expr::Lambda { param, body } => {
            let param_var = supply.fresh();
            let param_ty = Type::Var(param_var.clone());
            let scope = env.extend(param.clone(), param_ty.clone());
            let body_ty = analyze(body, &scope, &non_generic.with(param_var), supply)?;
            Ok(Type::function(param_ty, body_ty))
        }
        Expr::Let { name, defn, body } => {
            let bound_var = supply.fresh();
            let bound_ty = Type::Var(bound_var.clone());
            let scope = env.extend(name.clone(), bound_ty.clone());
            let defn_ty = analyze(defn, &scope, &non_generic.with(bound_var), supply)?;
            unify(&bound_ty, &defn_ty)?;
            analyze(body, &scope, non_generic, supply)
        }
    }
}
