use std::cell::Cell;

use super::*;
use crate::config::EngineConfig;
use crate::error::{ClassError, TypeError};
use crate::prelude::Prelude;

fn engine_with(config: EngineConfig) -> (Engine, Prelude) {
    let (mut registry, prelude) = Prelude::standard().expect("prelude");
    registry.seal();
    (Engine::shared(Rc::new(registry), config), prelude)
}

fn engine() -> (Engine, Prelude) {
    engine_with(EngineConfig::default())
}

/// `a -> a -> a` returning its first argument, counting invocations.
fn first_of(calls: Rc<Cell<usize>>, constraint: Option<ClassId>) -> TypedFunc {
    let mut template = VarSupply::new();
    let a = template.fresh();
    let ty = Type::Var(a.clone());
    let mut signature = Signature::new(vec![ty.clone(), ty.clone()], ty);
    if let Some(class) = constraint {
        signature = signature.constrain(class, &a);
    }
    TypedFunc::new("first", signature, move |mut args, _| {
        calls.set(calls.get() + 1);
        Ok(args.remove(0))
    })
}

#[test]
fn signature_splits_function_chains() {
    let ty = Type::function_chain(&[Type::int(), Type::bool()], Type::text());
    let signature = Signature::from_type(&ty);
    assert_eq!(signature.arity(), 2);
    assert_eq!(signature.params(), &[Type::int(), Type::bool()]);
    assert_eq!(signature.ret(), &Type::text());
    assert_eq!(signature.to_type(), ty);

    assert_eq!(Signature::from_type(&Type::int()).arity(), 0);
}

#[test]
fn partial_application_does_not_invoke() {
    let (mut engine, _) = engine();
    let calls = Rc::new(Cell::new(0));
    let func = first_of(calls.clone(), None);

    let CallOutcome::Partial(partial) = func.call(vec![Value::Int(1)], &mut engine).expect("call")
    else {
        panic!("expected a partial application");
    };
    assert_eq!(calls.get(), 0);
    assert_eq!(partial.bound().len(), 1);
    assert_eq!(partial.remaining().len(), 1);
    assert!(func.bound().is_empty());

    let result = partial
        .call(vec![Value::Int(2)], &mut engine)
        .expect("call")
        .into_value();
    assert_eq!(result, Value::Int(1));
    assert_eq!(calls.get(), 1);
}

#[test]
fn too_many_arguments_fail_before_unification() {
    let (mut engine, _) = engine();
    let calls = Rc::new(Cell::new(0));
    let func = first_of(calls.clone(), None);
    let allocated = engine.supply().allocated();

    let err = func
        .call(
            vec![Value::Int(1), Value::text("x"), Value::Unit],
            &mut engine,
        )
        .map(|_| ())
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ArityMismatch {
            expected: 2,
            found: 3,
        }
    );
    assert_eq!(engine.supply().allocated(), allocated);
    assert_eq!(calls.get(), 0);
}

#[test]
fn mismatched_arguments_never_reach_the_callable() {
    let (mut engine, _) = engine();
    let calls = Rc::new(Cell::new(0));
    let func = first_of(calls.clone(), None);
    let err = func
        .call(vec![Value::Int(1), Value::text("x")], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::Type(TypeError::TypeMismatch { .. })),
        "{err}"
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn each_call_instantiates_the_signature_afresh() {
    let (mut engine, _) = engine();
    let func = first_of(Rc::new(Cell::new(0)), None);
    func.call(vec![Value::Int(1), Value::Int(2)], &mut engine)
        .expect("ints");
    func.call(vec![Value::text("a"), Value::text("b")], &mut engine)
        .expect("texts");
    assert_eq!(func.declared_type().to_string(), "a -> a -> a");
}

#[test]
fn constraints_require_an_instance() {
    let (mut engine, prelude) = engine();
    let func = first_of(Rc::new(Cell::new(0)), Some(prelude.num));
    func.call(vec![Value::Int(1), Value::Int(2)], &mut engine)
        .expect("Num Int");
    let err = func
        .call(vec![Value::text("a"), Value::text("b")], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Class(ClassError::MissingInstance {
            class: "Num".to_string(),
            ty: "Text".to_string(),
        })
    );
}

#[test]
fn constraint_checks_can_be_disabled() {
    let mut config = EngineConfig::default();
    config.typed_fn.check_constraints = false;
    let (mut engine, prelude) = engine_with(config);
    let func = first_of(Rc::new(Cell::new(0)), Some(prelude.num));
    func.call(vec![Value::text("a"), Value::text("b")], &mut engine)
        .expect("unchecked");
}

fn liar() -> TypedFunc {
    TypedFunc::new(
        "liar",
        Signature::new(vec![Type::int()], Type::int()),
        |_, _| Ok(Value::text("not a number")),
    )
}

#[test]
fn wrong_result_type_is_detected_after_invocation() {
    let (mut engine, _) = engine();
    let err = liar()
        .call(vec![Value::Int(1)], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::Type(TypeError::TypeMismatch { .. })),
        "{err}"
    );
}

#[test]
fn result_checks_can_be_disabled() {
    let mut config = EngineConfig::default();
    config.typed_fn.check_result = false;
    let (mut engine, _) = engine_with(config);
    let result = liar()
        .call(vec![Value::Int(1)], &mut engine)
        .expect("unchecked")
        .into_value();
    assert_eq!(result, Value::text("not a number"));
}

#[test]
fn typed_functions_report_their_remaining_type() {
    let (mut engine, _) = engine();
    let func = first_of(Rc::new(Cell::new(0)), None);
    let unapplied = engine.type_of(&Value::Typed(func.clone())).expect("type");
    assert_eq!(unapplied.to_string(), "a -> a -> a");

    let partial = func
        .call(vec![Value::Int(1)], &mut engine)
        .expect("call")
        .into_value();
    let ty = engine.type_of(&partial).expect("type");
    assert_eq!(ty.to_string(), "Int -> Int");
    assert!(unify(&ty, &Type::function(Type::text(), Type::text())).is_err());
}

#[test]
fn returning_a_partial_application_checks_what_it_bound() {
    let (mut engine, _) = engine();
    let returns_first = move |int_first: bool| {
        TypedFunc::new(
            "make",
            Signature::new(
                vec![Type::unit()],
                Type::function(Type::text(), Type::text()),
            ),
            move |_, engine| {
                let seed = if int_first {
                    Value::Int(1)
                } else {
                    Value::text("seed")
                };
                let partial = first_of(Rc::new(Cell::new(0)), None).call(vec![seed], engine)?;
                Ok(partial.into_value())
            },
        )
    };

    let err = returns_first(true)
        .call(vec![Value::Unit], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::Type(TypeError::TypeMismatch { .. })),
        "{err}"
    );

    let ok = returns_first(false)
        .call(vec![Value::Unit], &mut engine)
        .expect("Text -> Text")
        .into_value();
    assert!(ok.is_callable());
}

#[test]
fn constraints_fixed_only_by_the_result_are_checked_after_invocation() {
    let (mut engine, prelude) = engine();
    let calls = Rc::new(Cell::new(0));
    let make = |result: Value| {
        let calls = calls.clone();
        let mut template = VarSupply::new();
        let a = template.fresh();
        let signature =
            Signature::new(vec![Type::int()], Type::Var(a.clone())).constrain(prelude.num, &a);
        TypedFunc::new("convert", signature, move |_, _| {
            calls.set(calls.get() + 1);
            Ok(result.clone())
        })
    };

    let value = make(Value::Float(2.0))
        .call(vec![Value::Int(2)], &mut engine)
        .expect("Num Float")
        .into_value();
    assert_eq!(value, Value::Float(2.0));

    let err = make(Value::text("oops"))
        .call(vec![Value::Int(2)], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Class(ClassError::MissingInstance {
            class: "Num".to_string(),
            ty: "Text".to_string(),
        })
    );
    assert_eq!(calls.get(), 2);
}

#[test]
fn typed_function_arguments_unify_with_function_slots() {
    let (mut engine, _) = engine();
    let mut template = VarSupply::new();
    let a = Type::Var(template.fresh());
    let b = Type::Var(template.fresh());
    let apply_fn = TypedFunc::new(
        "apply",
        Signature::new(
            vec![Type::function(a.clone(), b.clone()), a],
            b,
        ),
        |mut args, engine| {
            let arg = args.pop().ok_or_else(|| RuntimeError::Message("arg".into()))?;
            let func = args.pop().ok_or_else(|| RuntimeError::Message("func".into()))?;
            engine.apply(func, vec![arg])
        },
    );
    let succ = TypedFunc::new(
        "succ",
        Signature::new(vec![Type::int()], Type::int()),
        |args, _| match args.as_slice() {
            [Value::Int(n)] => Ok(Value::Int(n + 1)),
            _ => Err(RuntimeError::Message("succ expects Int".into())),
        },
    );

    let result = apply_fn
        .call(vec![Value::Typed(succ.clone()), Value::Int(41)], &mut engine)
        .expect("apply")
        .into_value();
    assert_eq!(result, Value::Int(42));

    let err = apply_fn
        .call(vec![Value::Typed(succ), Value::text("x")], &mut engine)
        .map(|_| ())
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::Type(TypeError::TypeMismatch { .. })),
        "{err}"
    );
}
