use std::collections::HashMap;

use crate::error::TypeError;
use crate::infer::{fresh_mapped, unify, NonGeneric};
use crate::types::{Type, TypeCon, VarSupply};
use crate::values::{AdtValue, Value};

/// Maps a runtime value to a type term.
pub fn type_of(value: &Value, supply: &mut VarSupply) -> Result<Type, TypeError> {
    match value {
        Value::Unit => Ok(Type::unit()),
        Value::Bool(_) => Ok(Type::bool()),
        Value::Int(_) => Ok(Type::int()),
        Value::Float(_) => Ok(Type::float()),
        Value::Text(_) => Ok(Type::text()),
        Value::List(items) => {
            let elem = match items.first() {
                Some(first) => type_of(first, supply)?,
                None => supply.fresh_type(),
            };
            for item in items.iter().skip(1) {
                unify(&elem, &type_of(item, supply)?)?;
            }
            Ok(Type::list(elem))
        }
        Value::Tuple(items) => {
            let items = items
                .iter()
                .map(|item| type_of(item, supply))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Type::tuple(items))
        }
        Value::Adt(adt) => adt_type(adt, supply),
        Value::Builtin(builtin) => Ok(opaque_function(builtin.remaining(), supply)),
        Value::Method(method) => Ok(opaque_function(method.remaining(), supply)),
        Value::Typed(typed) => typed.type_of(supply),
        Value::Opaque(opaque) => Ok(opaque.describe(supply)),
    }
}

/// The constructor whose instances serve `value` at dispatch time. ADT values
/// resolve to their type constructor, never to the variant.
pub fn type_con_of(value: &Value) -> TypeCon {
    match value {
        Value::Unit => TypeCon::unit(),
        Value::Bool(_) => TypeCon::bool(),
        Value::Int(_) => TypeCon::int(),
        Value::Float(_) => TypeCon::float(),
        Value::Text(_) => TypeCon::text(),
        Value::List(_) => TypeCon::list(),
        Value::Tuple(_) => TypeCon::tuple(),
        Value::Adt(adt) => adt.decl().con.clone(),
        Value::Builtin(_) | Value::Typed(_) | Value::Method(_) => TypeCon::function(),
        Value::Opaque(opaque) => opaque.type_con(),
    }
}

fn adt_type(adt: &AdtValue, supply: &mut VarSupply) -> Result<Type, TypeError> {
    let decl = adt.decl();
    let mut mapping = HashMap::new();
    let none = NonGeneric::new();
    let params: Vec<Type> = decl
        .params
        .iter()
        .map(|param| fresh_mapped(&Type::Var(param.clone()), &none, supply, &mut mapping))
        .collect();
    for (template, field) in adt.variant_decl().fields.iter().zip(adt.fields()) {
        let expected = fresh_mapped(template, &none, supply, &mut mapping);
        unify(&expected, &type_of(field, supply)?)?;
    }
    Ok(Type::op(decl.con.clone(), params))
}

fn opaque_function(arity: usize, supply: &mut VarSupply) -> Type {
    let params: Vec<Type> = (0..arity).map(|_| supply.fresh_type()).collect();
    Type::function_chain(&params, supply.fresh_type())
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::rc::Rc;

    use super::*;
    use crate::values::{AdtDecl, Describe, VariantDecl};

    fn maybe() -> Rc<AdtDecl> {
        AdtDecl::new("Maybe", 1, |params| {
            vec![
                VariantDecl::new("Nothing", vec![]),
                VariantDecl::new("Just", vec![params[0].clone()]),
            ]
        })
    }

    #[test]
    fn natives_map_to_nullary_operators() {
        let mut supply = VarSupply::new();
        assert_eq!(type_of(&Value::Int(1), &mut supply).unwrap(), Type::int());
        assert_eq!(type_of(&Value::Float(1.0), &mut supply).unwrap(), Type::float());
        assert_eq!(type_of(&Value::text("x"), &mut supply).unwrap(), Type::text());
        assert_eq!(type_of(&Value::Unit, &mut supply).unwrap(), Type::unit());
    }

    #[test]
    fn lists_unify_every_element_with_the_first() {
        let mut supply = VarSupply::new();
        let ints = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(type_of(&ints, &mut supply).unwrap().to_string(), "List Int");

        let mixed = Value::list(vec![Value::Int(1), Value::text("x")]);
        let err = type_of(&mixed, &mut supply).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }), "{err}");

        let empty = type_of(&Value::list(vec![]), &mut supply).unwrap();
        assert!(matches!(empty.free_vars().as_slice(), [_]));
    }

    #[test]
    fn adt_values_resolve_to_their_type_constructor() {
        let decl = maybe();
        let mut supply = VarSupply::new();
        let just = decl.construct("Just", vec![Value::Int(3)]).unwrap();
        let nothing = decl.construct("Nothing", vec![]).unwrap();

        assert_eq!(type_of(&just, &mut supply).unwrap().to_string(), "Maybe Int");
        let nothing_ty = type_of(&nothing, &mut supply).unwrap();
        assert!(nothing_ty.to_string().starts_with("Maybe "));
        assert_eq!(type_con_of(&just), decl.con);
        assert_eq!(type_con_of(&nothing), decl.con);
    }

    #[test]
    fn adt_type_does_not_leak_between_values() {
        let decl = maybe();
        let mut supply = VarSupply::new();
        let first = decl.construct("Just", vec![Value::Int(3)]).unwrap();
        let second = decl.construct("Just", vec![Value::text("x")]).unwrap();
        assert_eq!(type_of(&first, &mut supply).unwrap().to_string(), "Maybe Int");
        assert_eq!(type_of(&second, &mut supply).unwrap().to_string(), "Maybe Text");
    }

    struct Celsius;

    impl Describe for Celsius {
        fn type_con(&self) -> TypeCon {
            thread_local! {
                static CON: TypeCon = TypeCon::declare("Celsius");
            }
            CON.with(TypeCon::clone)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn opaque_values_describe_themselves() {
        let mut supply = VarSupply::new();
        let value = Value::Opaque(Rc::new(Celsius));
        assert_eq!(type_of(&value, &mut supply).unwrap().to_string(), "Celsius");
        assert_eq!(type_con_of(&value), Celsius.type_con());
    }

    #[test]
    fn builtins_type_as_a_function_of_their_remaining_arity() {
        let mut supply = VarSupply::new();
        let add = Value::builtin("add", 2, |_, _| Ok(Value::Unit));
        let ty = type_of(&add, &mut supply).unwrap();
        assert_eq!(ty.to_string(), "a -> b -> c");
    }
}
