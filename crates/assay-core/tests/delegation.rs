//! Lookups through chains of delegating environments.

use assay_core::{qualify, Environment, Expr, Expression, ProtocolError, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn lookups_reach_any_ancestor(depth in 1usize..8, target in 0usize..8) {
        let target = target % depth;
        let mut chain = vec![Environment::new()];
        for _ in 1..depth {
            let parent = chain.last().unwrap().clone();
            chain.push(Environment::delegating_to(&parent));
        }
        chain[target].define("x", Value::Number(target as f64)).unwrap();

        let innermost = chain.last().unwrap();
        prop_assert_eq!(innermost.lookup("x").unwrap(), Value::Number(target as f64));
        // Environments outside the defining one cannot see it.
        for env in &chain[..target] {
            prop_assert!(!env.has_name("x"));
        }
    }

    #[test]
    fn nearest_binding_shadows(depth in 2usize..6) {
        let root = Environment::new();
        root.define("v", Value::Number(0.0)).unwrap();
        let mut env = root.clone();
        for level in 1..depth {
            env = Environment::delegating_to(&env);
            env.define("v", Value::Number(level as f64)).unwrap();
        }
        prop_assert_eq!(env.lookup("v").unwrap(), Value::Number((depth - 1) as f64));
    }
}

#[test]
fn qualified_names_resolve_through_parent_delegatees() {
    let results = Environment::new();
    results.define("V", Value::Number(1.5)).unwrap();
    let library = Environment::new();
    library.set_delegatee("sim", Some(results));
    let post = Environment::delegating_to(&library);

    let e = Expr::name(qualify("sim", "V")).times(Expr::num(2.0));
    assert_eq!(e.evaluate(&post).unwrap(), Value::Number(3.0));
    assert!(matches!(
        Expr::name("sim:W").evaluate(&post),
        Err(ProtocolError::UnknownName { name }) if name == "sim:W"
    ));
}
