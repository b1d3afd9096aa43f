use polydispatch::{fresh, prune, unify, NonGeneric, Type, TypeCon, TypeError, VarSupply};

/// Builds a pair of terms over a fresh supply so each direction starts unbound.
type PairBuilder = fn(&mut VarSupply) -> (Type, Type);

fn var_with_int(s: &mut VarSupply) -> (Type, Type) {
    (s.fresh_type(), Type::int())
}

fn int_with_int(_: &mut VarSupply) -> (Type, Type) {
    (Type::int(), Type::int())
}

fn int_with_bool(_: &mut VarSupply) -> (Type, Type) {
    (Type::int(), Type::bool())
}

fn two_vars(s: &mut VarSupply) -> (Type, Type) {
    (s.fresh_type(), s.fresh_type())
}

fn list_var_with_list_int(s: &mut VarSupply) -> (Type, Type) {
    (Type::list(s.fresh_type()), Type::list(Type::int()))
}

fn list_with_tuple(s: &mut VarSupply) -> (Type, Type) {
    (Type::list(s.fresh_type()), Type::tuple(vec![s.fresh_type()]))
}

fn tuple_arity(_: &mut VarSupply) -> (Type, Type) {
    (
        Type::tuple(vec![Type::int()]),
        Type::tuple(vec![Type::int(), Type::int()]),
    )
}

fn shared_var_conflict(s: &mut VarSupply) -> (Type, Type) {
    let a = s.fresh_type();
    (
        Type::function(a.clone(), a),
        Type::function(Type::int(), Type::bool()),
    )
}

fn var_inside_own_list(s: &mut VarSupply) -> (Type, Type) {
    let a = s.fresh_type();
    (a.clone(), Type::list(a))
}

fn crossed_functions(s: &mut VarSupply) -> (Type, Type) {
    (
        Type::function(s.fresh_type(), Type::bool()),
        Type::function(Type::int(), s.fresh_type()),
    )
}

fn sample_pairs() -> Vec<(&'static str, PairBuilder)> {
    vec![
        ("var with int", var_with_int as PairBuilder),
        ("int with int", int_with_int as PairBuilder),
        ("int with bool", int_with_bool as PairBuilder),
        ("two vars", two_vars as PairBuilder),
        ("list var with list int", list_var_with_list_int as PairBuilder),
        ("list with tuple", list_with_tuple as PairBuilder),
        ("tuple arity", tuple_arity as PairBuilder),
        ("shared var conflict", shared_var_conflict as PairBuilder),
        ("var inside its own list", var_inside_own_list as PairBuilder),
        ("crossed functions", crossed_functions as PairBuilder),
    ]
}

#[test]
fn unification_success_is_symmetric() {
    for (label, build) in sample_pairs() {
        let mut supply = VarSupply::new();
        let (left, right) = build(&mut supply);
        let forward = unify(&left, &right).is_ok();

        let mut supply = VarSupply::new();
        let (left, right) = build(&mut supply);
        let backward = unify(&right, &left).is_ok();

        assert_eq!(forward, backward, "asymmetric result for {label}");
    }
}

#[test]
fn prune_is_idempotent() {
    for (_, build) in sample_pairs() {
        let mut supply = VarSupply::new();
        let (left, right) = build(&mut supply);
        let _ = unify(&left, &right);
        for ty in [&left, &right] {
            let once = prune(ty);
            assert_eq!(prune(&once), once);
        }
    }
}

#[test]
fn fresh_copies_unify_independently() {
    let mut supply = VarSupply::new();
    let a = supply.fresh_type();
    let identity = Type::function(a.clone(), a);
    let non_generic = NonGeneric::new();

    let first = fresh(&identity, &non_generic, &mut supply);
    let second = fresh(&identity, &non_generic, &mut supply);
    assert_ne!(first, second);

    unify(&first, &Type::function(Type::int(), Type::int())).expect("first at Int");
    unify(&second, &Type::function(Type::text(), Type::text())).expect("second at Text");
    assert_eq!(first.to_string(), "Int -> Int");
    assert_eq!(second.to_string(), "Text -> Text");
    assert_eq!(identity.to_string(), "a -> a");
}

#[test]
fn occurs_check_rejects_nested_self_reference() {
    let mut supply = VarSupply::new();
    let v = supply.fresh_type();
    let maybe = TypeCon::declare("Maybe");
    let nested = Type::function(
        Type::int(),
        Type::op(maybe, vec![Type::list(v.clone())]),
    );
    let err = unify(&v, &nested).unwrap_err();
    assert!(matches!(err, TypeError::RecursiveUnification { .. }), "{err}");

    let err = unify(&nested, &v).unwrap_err();
    assert!(matches!(err, TypeError::RecursiveUnification { .. }), "{err}");
}

#[test]
fn occurs_check_looks_through_bindings() {
    let mut supply = VarSupply::new();
    let a = supply.fresh_type();
    let b = supply.fresh_type();
    unify(&b, &Type::list(a.clone())).expect("bind b");
    let err = unify(&a, &Type::tuple(vec![b])).unwrap_err();
    assert!(matches!(err, TypeError::RecursiveUnification { .. }), "{err}");
}

#[test]
fn crossed_function_unification_binds_both_variables() {
    let mut supply = VarSupply::new();
    let v1 = supply.fresh_type();
    let v2 = supply.fresh_type();
    unify(
        &Type::function(v1.clone(), Type::bool()),
        &Type::function(Type::int(), v2.clone()),
    )
    .expect("unify");
    assert_eq!(prune(&v1), Type::int());
    assert_eq!(prune(&v2), Type::bool());
}

#[test]
fn mismatch_names_both_operators() {
    let err = unify(&Type::list(Type::int()), &Type::list(Type::text())).unwrap_err();
    assert_eq!(
        err,
        TypeError::TypeMismatch {
            expected: "Int".to_string(),
            found: "Text".to_string(),
        }
    );
}
