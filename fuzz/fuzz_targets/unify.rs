#![no_main]

use libfuzzer_sys::fuzz_target;
use polydispatch::{prune, unify, Type, VarSupply};

const POOL: usize = 4;
const MAX_DEPTH: usize = 6;

fn decode(bytes: &mut std::slice::Iter<'_, u8>, pool: &[Type], depth: usize) -> Type {
    let Some(&byte) = bytes.next() else {
        return Type::int();
    };
    let leaf = depth >= MAX_DEPTH;
    match byte % 6 {
        0 | 1 => pool[(byte as usize / 6) % pool.len()].clone(),
        2 => Type::int(),
        3 => Type::bool(),
        4 if !leaf => {
            let domain = decode(bytes, pool, depth + 1);
            let codomain = decode(bytes, pool, depth + 1);
            Type::function(domain, codomain)
        }
        5 if !leaf => Type::list(decode(bytes, pool, depth + 1)),
        _ => Type::text(),
    }
}

fn build(data: &[u8]) -> (Type, Type) {
    let mut supply = VarSupply::new();
    let pool: Vec<Type> = (0..POOL).map(|_| supply.fresh_type()).collect();
    let mut bytes = data.iter();
    let left = decode(&mut bytes, &pool, 0);
    let right = decode(&mut bytes, &pool, 0);
    (left, right)
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 {
        return;
    }
    let (left, right) = build(data);
    let forward = unify(&left, &right).is_ok();
    let (left_again, right_again) = build(data);
    let backward = unify(&right_again, &left_again).is_ok();
    assert_eq!(forward, backward);

    if forward {
        assert!(prune(&left) == prune(&right));
    }
    let once = prune(&left);
    assert!(prune(&once) == once);
});
