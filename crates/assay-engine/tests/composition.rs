//! Combined simulations and embedded sub-protocols.

use assay_core::{
    share, BoxedExpression, Environment, Expr, Expression, FnExpr, Location, ProtocolError, Value,
};
use assay_engine::{
    ApplyWhen, CombinedMode, Experiment, Modifier, ModifierCollection, SharedStateCollection,
    Simulation, StateCollection,
};
use assay_stepper::Stepper;
use assay_test_utils::CounterModel;

fn timecourse(points: usize) -> Simulation {
    let end = (points - 1) as f64;
    Simulation::timecourse(Stepper::uniform("t", "", 0.0, end, 1.0).unwrap()).unwrap()
}

fn counts(results: &Environment, name: &str) -> Vec<f64> {
    results.lookup(name).unwrap().as_array().unwrap().to_vec()
}

/// `a` saves its final state; `b` starts from it.
fn warm_start_pair(mode: CombinedMode, states: &SharedStateCollection) -> Simulation {
    let save: ModifierCollection = [Modifier::save(ApplyWhen::AtEnd, "warm", states.clone())]
        .into_iter()
        .collect();
    let restore: ModifierCollection =
        [Modifier::reset(ApplyWhen::AtStartOnly, Some("warm"), states.clone())]
            .into_iter()
            .collect();
    let a = timecourse(3).with_prefix("a").with_modifiers(save);
    let b = timecourse(2)
        .with_prefix("b")
        .with_modifiers(restore)
        .with_location(Location::from("b.txt:3"));
    Simulation::combined(mode, vec![a, b])
}

#[test]
fn sequential_children_run_in_order() {
    let states = StateCollection::shared();
    let mut root = warm_start_pair(CombinedMode::Sequential, &states);
    root.set_model(share(CounterModel::new()));

    let results = root.run(None).unwrap();
    assert_eq!(counts(&results, "a:count"), vec![0.0, 1.0, 2.0]);
    assert_eq!(counts(&results, "b:count"), vec![2.0, 3.0]);
    assert_eq!(states.borrow().get("warm"), Some(&[2.0][..]));
}

#[test]
fn parallel_children_run_in_reverse() {
    let states = StateCollection::shared();
    let mut root = warm_start_pair(CombinedMode::Parallel, &states);
    root.set_model(share(CounterModel::new()));

    let err = root.run(None).unwrap_err();
    assert_eq!(err.location(), Some(&Location::from("b.txt:3")));
    assert_eq!(
        err.root(),
        &ProtocolError::MissingState {
            name: "warm".into()
        }
    );
}

#[test]
fn combined_inside_a_loop_gains_a_dimension() {
    let reset: ModifierCollection =
        [Modifier::reset(ApplyWhen::AtStartOnly, None, StateCollection::shared())]
            .into_iter()
            .collect();
    let child = timecourse(3).with_prefix("a").with_modifiers(reset);
    let combined = Simulation::combined(CombinedMode::Sequential, vec![child]);
    let outer = Stepper::vector("i", "", vec![0.0, 1.0]).unwrap();
    let mut root = Simulation::nested(outer, combined).unwrap();
    root.set_model(share(CounterModel::new()));

    let results = root.run(None).unwrap();
    let count = results.lookup("a:count").unwrap();
    assert_eq!(count.shape().as_slice(), &[2, 3]);
    assert_eq!(counts(&results, "a:count"), vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
}

/// A protocol whose output `v` is `[1, 2, …, n]`.
fn ramp_protocol() -> Experiment {
    let mut protocol = Experiment::new("ramp");
    protocol.declare_input("n", Value::Number(1.0)).unwrap();
    let ramp = FnExpr::new("1..=n", |env: &Environment| {
        let n = env.lookup("n")?.expect_number("n must be a number")?;
        let data: Vec<Expr> = (1..=n as usize).map(|k| Expr::num(k as f64)).collect();
        Expr::Array(data).evaluate(env)
    });
    protocol.add_post_processing("v", Box::new(ramp));
    protocol.add_output("v", "v", None);
    protocol
}

fn ramp_scan(sizes: Vec<f64>) -> Simulation {
    let inputs: Vec<(String, BoxedExpression)> = vec![("n".into(), Box::new(Expr::name("n")))];
    let sub = Simulation::sub_protocol(Box::new(ramp_protocol()), inputs, vec!["v".into()])
        .unwrap();
    Simulation::nested(Stepper::vector("n", "", sizes).unwrap(), sub).unwrap()
}

#[test]
fn sub_protocol_outputs_are_stacked() {
    let mut root = ramp_scan(vec![2.0, 2.0, 2.0]);
    let results = root.run(None).unwrap();
    let v = results.lookup("v").unwrap();
    assert_eq!(v.shape().as_slice(), &[3, 2]);
    assert_eq!(counts(&results, "v"), vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
}

#[test]
fn sub_protocol_output_changing_shape_is_an_error() {
    let mut root = ramp_scan(vec![2.0, 3.0]);
    let err = root.run(None).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::OutputShape {
            name: "v".into(),
            expected: vec![2],
            found: vec![3],
        }
    );
}

#[test]
fn sub_protocol_must_keep_an_output() {
    let err = Simulation::sub_protocol(Box::new(ramp_protocol()), Vec::new(), Vec::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No results are being retained from the nested protocol."
    );
}
