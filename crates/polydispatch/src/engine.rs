use std::rc::Rc;

use crate::classes::{ClassId, Registry};
use crate::config::{enter_trace, trace_enabled, EngineConfig, TraceConcern, TraceScope};
use crate::error::{ClassError, RuntimeError, TypeError};
use crate::infer::{analyze, Expr, NonGeneric, TypeEnv};
use crate::typeof_bridge::{type_con_of, type_of};
use crate::types::{Type, TypeCon, VarSupply};
use crate::values::{BuiltinValue, MethodValue, Value};


/// One inference session: owns the variable supply and shares a sealed registry.
pub struct Engine {
    supply: VarSupply,
    registry: Rc<Registry>,
    config: EngineConfig,
}

impl Engine {
    /// Seals `registry` and starts a session with the environment's configuration.
    pub fn new(mut registry: Registry) -> Self {
        registry.seal();
        Self::shared(Rc::new(registry), EngineConfig::from_env())
    }

    pub fn shared(registry: Rc<Registry>, config: EngineConfig) -> Self {
        Self {
            supply: VarSupply::new(),
            registry,
            config,
        }
    }

    pub fn supply(&mut self) -> &mut VarSupply {
        &mut self.supply
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_handle(&self) -> Rc<Registry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Makes this engine's trace switches current until the scope is dropped.
    pub(crate) fn trace_scope(&self) -> TraceScope {
        enter_trace(self.config.trace)
    }

    pub fn type_of(&mut self, value: &Value) -> Result<Type, TypeError> {
        let _trace = self.trace_scope();
        type_of(value, &mut self.supply)
    }

    pub fn analyze(&mut self, expr: &Expr, env: &TypeEnv) -> Result<Type, TypeError> {
        let _trace = self.trace_scope();
        analyze(expr, env, &NonGeneric::new(), &mut self.supply)
    }

    /// A first-class reference to `class`'s method `name`.
    pub fn method(
        &self,
        class: ClassId,
        name: &str,
        arity: usize,
        dispatch_on: usize,
    ) -> Result<Value, ClassError> {
        let typeclass = self.registry.class(class)?;
        if !typeclass.has_method(name) {
            return Err(ClassError::UnknownMethod {
                class: typeclass.name.clone(),
                method: name.to_string(),
            });
        }
        Ok(Value::Method(MethodValue {
            class,
            name: Rc::from(name),
            arity,
            dispatch_on,
            args: Vec::new(),
        }))
    }

    pub fn apply(&mut self, func: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let _trace = self.trace_scope();
        match func {
            Value::Builtin(builtin) => self.apply_builtin(builtin, args),
            Value::Typed(typed) => Ok(typed.call(args, self)?.into_value()),
            Value::Method(method) => self.apply_method(method, args),
            other => Err(RuntimeError::NotCallable(other.to_string())),
        }
    }

    fn apply_builtin(
        &mut self,
        builtin: BuiltinValue,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let arity = builtin.imp.arity;
        let total = builtin.args.len() + args.len();
        if total > arity {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                found: total,
            });
        }
        let mut bound = builtin.args;
        bound.extend(args);
        if total == arity {
            (builtin.imp.func)(bound, self)
        } else {
            Ok(Value::Builtin(BuiltinValue {
                imp: builtin.imp,
                args: bound,
            }))
        }
    }

    fn apply_method(&mut self, method: MethodValue, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let total = method.args.len() + args.len();
        if total > method.arity {
            return Err(RuntimeError::ArityMismatch {
                expected: method.arity,
                found: total,
            });
        }
        let mut bound = method.args;
        bound.extend(args);
        if total < method.arity {
            return Ok(Value::Method(MethodValue {
                args: bound,
                ..method
            }));
        }
        self.call_method(method.class, &method.name, bound, method.dispatch_on)
    }

    /// Runs `class`'s `name` for the runtime type of `args[dispatch_on]`.
    pub fn call_method(
        &mut self,
        class: ClassId,
        name: &str,
        args: Vec<Value>,
        dispatch_on: usize,
    ) -> Result<Value, RuntimeError> {
        let target = args.get(dispatch_on).ok_or(RuntimeError::ArityMismatch {
            expected: dispatch_on + 1,
            found: args.len(),
        })?;
        let ty = type_con_of(target);
        self.call_instance(class, &ty, name, args)
    }

    /// Runs `class`'s `name` from the instance registered for `ty`.
    pub fn call_instance(
        &mut self,
        class: ClassId,
        ty: &TypeCon,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let _trace = self.trace_scope();
        let record = self.registry.lookup(class, ty)?;
        let imp = record.get(name).cloned().ok_or_else(|| ClassError::UnknownMethod {
            class: self
                .registry
                .class(class)
                .map(|typeclass| typeclass.name.clone())
                .unwrap_or_default(),
            method: name.to_string(),
        })?;
        if trace_enabled(TraceConcern::Dispatch) {
            tracing::debug!(
                target: "polydispatch::dispatch",
                method = name,
                ty = %ty,
                "dispatch"
            );
        }
        self.apply(imp, args)
    }
}
