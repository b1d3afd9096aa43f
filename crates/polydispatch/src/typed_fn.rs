use std::collections::HashMap;
use std::rc::Rc;

use crate::classes::{ClassId, Registry};
use crate::config::{trace_enabled, TraceConcern};
use crate::engine::Engine;
use crate::error::{ClassError, RuntimeError, TypeError};
use crate::infer::{analyze, fresh, fresh_mapped, unify, Expr, Ident, NonGeneric, TypeEnv};
use crate::typeof_bridge::type_of;
use crate::types::{prune, Type, TypeVar, VarSupply};
use crate::values::{BuiltinFunc, Value};

#[cfg(test)]
mod tests;

/// `(class var) =>` requirement on a signature variable.
#[derive(Clone)]
pub struct Constraint {
    pub class: ClassId,
    pub var: TypeVar,
}

/// A declared function type split into argument slots and a return type.
#[derive(Clone)]
pub struct Signature {
    params: Vec<Type>,
    ret: Type,
    constraints: Vec<Constraint>,
}

impl Signature {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret,
            constraints: Vec::new(),
        }
    }

    /// Splits a chain of function operators; every domain becomes an argument slot.
    pub fn from_type(ty: &Type) -> Self {
        let mut params = Vec::new();
        let mut rest = prune(ty);
        while let Some((domain, codomain)) = rest.as_function() {
            params.push(domain);
            rest = prune(&codomain);
        }
        Self::new(params, rest)
    }

    pub fn constrain(mut self, class: ClassId, var: &TypeVar) -> Self {
        self.constraints.push(Constraint {
            class,
            var: var.clone(),
        });
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn ret(&self) -> &Type {
        &self.ret
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn to_type(&self) -> Type {
        Type::function_chain(&self.params, self.ret.clone())
    }
}

struct TypedInner {
    name: String,
    signature: Signature,
    declared: Type,
    callable: Rc<BuiltinFunc>,
}

/// A host callable checked against its declared signature at call time.
#[derive(Clone)]
pub struct TypedFunc {
    inner: Rc<TypedInner>,
    bound: Vec<Value>,
}

pub enum CallOutcome {
    Partial(TypedFunc),
    Applied(Value),
}

impl CallOutcome {
    pub fn into_value(self) -> Value {
        match self {
            CallOutcome::Partial(partial) => Value::Typed(partial),
            CallOutcome::Applied(value) => value,
        }
    }
}

impl TypedFunc {
    pub fn new(
        name: &str,
        signature: Signature,
        callable: impl Fn(Vec<Value>, &mut Engine) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        let declared = signature.to_type();
        Self {
            inner: Rc::new(TypedInner {
                name: name.to_string(),
                signature,
                declared,
                callable: Rc::new(callable),
            }),
            bound: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn arity(&self) -> usize {
        self.inner.signature.arity()
    }

    pub fn bound(&self) -> &[Value] {
        &self.bound
    }

    pub fn declared_type(&self) -> &Type {
        &self.inner.declared
    }

    /// Argument types still to be supplied.
    pub fn remaining(&self) -> &[Type] {
        &self.inner.signature.params()[self.bound.len()..]
    }

    /// The type of the not yet applied part of the signature. Bound arguments
    /// are inferred against a fresh copy of the declared type, so whatever they
    /// fix carries into the remaining parameters and the return type.
    pub fn type_of(&self, supply: &mut VarSupply) -> Result<Type, TypeError> {
        if self.bound.is_empty() {
            return Ok(fresh(&self.inner.declared, &NonGeneric::new(), supply));
        }
        let (remaining, _) = self.infer_application(&self.bound, supply)?;
        Ok(remaining)
    }

    pub fn call(&self, args: Vec<Value>, engine: &mut Engine) -> Result<CallOutcome, RuntimeError> {
        let _trace = engine.trace_scope();
        let arity = self.arity();
        let total = self.bound.len() + args.len();
        if total > arity {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                found: total,
            });
        }
        let mut bound = self.bound.clone();
        bound.extend(args);

        if total < arity {
            if trace_enabled(TraceConcern::Calls) {
                tracing::debug!(
                    target: "polydispatch::call",
                    func = %self.inner.name,
                    bound = total,
                    arity,
                    "partial application"
                );
            }
            return Ok(CallOutcome::Partial(TypedFunc {
                inner: self.inner.clone(),
                bound,
            }));
        }

        let registry = engine.registry_handle();
        let check_constraints = engine.config().typed_fn.check_constraints;
        let (ret, mapping) = self.infer_application(&bound, engine.supply())?;

        // Constraints on variables only the result can fix wait for the result.
        let mut pending = Vec::new();
        if check_constraints {
            for constraint in self.inner.signature.constraints() {
                let var = mapping
                    .get(&constraint.var)
                    .cloned()
                    .unwrap_or_else(|| constraint.var.clone());
                if !check_constraint(&registry, constraint.class, &var)? {
                    pending.push((constraint.class, var));
                }
            }
        }

        let result = (self.inner.callable)(bound, engine)?;
        if engine.config().typed_fn.check_result {
            let actual = type_of(&result, engine.supply())?;
            unify(&actual, &ret)?;
            for (class, var) in &pending {
                check_constraint(&registry, *class, var)?;
            }
        }
        if trace_enabled(TraceConcern::Calls) {
            tracing::debug!(
                target: "polydispatch::call",
                func = %self.inner.name,
                ret = %ret,
                "applied"
            );
        }
        Ok(CallOutcome::Applied(result))
    }

    /// Infers `f a1 .. ak` against a fresh copy of the declared type. Returns
    /// the inferred type together with where each declared variable went.
    fn infer_application(
        &self,
        args: &[Value],
        supply: &mut VarSupply,
    ) -> Result<(Type, HashMap<TypeVar, TypeVar>), TypeError> {
        let mut mapping = HashMap::new();
        let declared = fresh_mapped(&self.inner.declared, &NonGeneric::new(), supply, &mut mapping);
        let non_generic: NonGeneric = declared.free_vars().into_iter().collect();

        let func = Ident::from(format!("{}#fn", self.inner.name));
        let mut env = TypeEnv::new().extend(func.clone(), declared);
        let mut expr = Expr::var(func);
        for (index, arg) in args.iter().enumerate() {
            let slot = Ident::from(format!("{}#{index}", self.inner.name));
            env = env.extend(slot.clone(), type_of(arg, supply)?);
            expr = Expr::app(expr, Expr::var(slot));
        }

        let inferred = analyze(&expr, &env, &non_generic, supply)?;
        let ret = supply.fresh_type();
        unify(&inferred, &ret)?;
        Ok((ret, mapping))
    }
}

/// Looks up the instance a constraint variable needs once it is bound to an
/// operator. Returns `false` while the variable is still unbound.
fn check_constraint(
    registry: &Registry,
    class: ClassId,
    var: &TypeVar,
) -> Result<bool, ClassError> {
    match prune(&Type::Var(var.clone())) {
        Type::Op(op) => registry.lookup(class, &op.con).map(|_| true),
        Type::Var(_) => Ok(false),
    }
}
