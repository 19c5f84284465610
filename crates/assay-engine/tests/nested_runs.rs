//! Result shapes, modifiers and output folders of nested loop runs.

use std::fs;

use assay_array::NdArray;
use assay_core::{share, Environment, Expr, FnExpr, ProtocolError, Value};
use assay_engine::{
    ApplyWhen, Modifier, ModifierCollection, Partition, Simulation, StateCollection,
};
use assay_stepper::Stepper;
use assay_test_utils::CounterModel;
use simplelog::{Config, LevelFilter, TestLogger};

fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

fn outer(values: &[f64]) -> Stepper {
    Stepper::vector("i", "", values.to_vec()).unwrap()
}

fn three_point_timecourse() -> Simulation {
    Simulation::timecourse(Stepper::uniform("t", "ms", 0.0, 2.0, 1.0).unwrap()).unwrap()
}

fn array(results: &Environment, name: &str) -> NdArray<f64> {
    results.lookup(name).unwrap().as_array().unwrap().clone()
}

fn reset_every_loop() -> ModifierCollection {
    [Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())]
        .into_iter()
        .collect()
}

#[test]
fn nested_results_have_loop_then_natural_shape() {
    init_logging();
    let mut root = Simulation::nested(outer(&[0.0, 1.0, 2.0, 3.0]), three_point_timecourse())
        .unwrap()
        .with_prefix("scan");
    root.set_model(share(CounterModel::new().with_levels(2)));

    let results = root.run(None).unwrap();
    let count = array(&results, "count");
    assert_eq!(count.shape().as_slice(), &[4, 3]);
    // No reset: the counter keeps running across outer iterations.
    assert_eq!(
        count.to_vec(),
        vec![0.0, 1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0, 6.0, 7.0, 8.0]
    );
    assert_eq!(array(&results, "time").get(&[3, 2]), 2.0);

    let levels = array(&results, "levels");
    assert_eq!(levels.shape().as_slice(), &[4, 3, 2]);
    assert_eq!(levels.get(&[1, 2, 1]), 8.0);
}

#[test]
fn every_loop_reset_restarts_each_iteration() {
    let mut root = Simulation::nested(outer(&[0.0, 1.0, 2.0]), three_point_timecourse())
        .unwrap()
        .with_modifiers(reset_every_loop());
    let model = CounterModel::new();
    let probe = model.probe();
    root.set_model(share(model));

    let results = root.run(None).unwrap();
    assert_eq!(
        array(&results, "count").to_vec(),
        vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]
    );
    assert_eq!(probe.resets(), 3);
    assert_eq!(probe.solves(), 6);
}

#[test]
fn set_variable_sees_loop_value() {
    let modifiers: ModifierCollection = [
        Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared()),
        Modifier::set_variable(ApplyWhen::EveryLoop, "increment", Box::new(Expr::name("i"))),
    ]
    .into_iter()
    .collect();
    let mut root = Simulation::nested(outer(&[1.0, 2.0, 3.0]), three_point_timecourse())
        .unwrap()
        .with_modifiers(modifiers);
    let model = CounterModel::new();
    let probe = model.probe();
    root.set_model(share(model));

    let results = root.run(None).unwrap();
    assert_eq!(
        array(&results, "count").to_vec(),
        vec![0.0, 1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 3.0, 6.0]
    );
    // The first iteration sets the increment to its current value.
    assert_eq!(probe.invalidations(), 2);
}

#[test]
fn inner_loop_bounds_may_use_outer_loop() {
    let inner = Stepper::uniform_from(
        "t",
        "",
        Box::new(Expr::num(0.0)),
        Box::new(Expr::name("i")),
        Box::new(Expr::num(1.0)),
    );
    let leaf = Simulation::timecourse(inner).unwrap();
    let mut root = Simulation::nested(outer(&[3.0]), leaf).unwrap();
    root.set_model(share(CounterModel::new()));
    let results = root.run(None).unwrap();
    assert_eq!(array(&results, "time").to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn rerunning_clears_previous_results() {
    let mut root = Simulation::nested(outer(&[0.0, 1.0]), three_point_timecourse())
        .unwrap()
        .with_modifiers(reset_every_loop());
    root.set_model(share(CounterModel::new()));
    let first = root.run(None).unwrap().lookup("count").unwrap();
    let second = root.run(None).unwrap().lookup("count").unwrap();
    assert_eq!(first.as_array().unwrap().to_vec(), second.as_array().unwrap().to_vec());
}

#[test]
fn while_loop_must_be_outermost() {
    let condition = Expr::name("n").lt(Expr::num(3.0));
    let leaf = Simulation::timecourse(Stepper::while_loop("n", "", Box::new(condition))).unwrap();
    let err = Simulation::nested(outer(&[0.0, 1.0]), leaf).unwrap_err();
    assert_eq!(
        err.to_string(),
        "A while loop may only be the outermost loop for a simulation."
    );
}

#[test]
fn standalone_functional_loop_is_rejected() {
    let stepper = Stepper::functional("f", "", Box::new(Expr::num(1.0)));
    let err = Simulation::timecourse(stepper).unwrap_err();
    assert!(matches!(err.root(), ProtocolError::Definition { .. }));
}

#[test]
fn multiple_stepper_drives_functional_member() {
    let doubled = FnExpr::new("2i", |env: &Environment| {
        let i = env.lookup("t")?.expect_number("t must be a number")?;
        Ok(Value::Number(2.0 * i))
    });
    let stepper = Stepper::multiple(vec![
        Stepper::vector("t", "", vec![0.0, 1.0, 2.0]).unwrap(),
        Stepper::functional("twice", "", Box::new(doubled)),
    ])
    .unwrap();
    let mut root = Simulation::timecourse(stepper).unwrap();
    let model = CounterModel::new();
    let probe = model.probe();
    root.set_model(share(model));
    let results = root.run(None).unwrap();
    assert_eq!(array(&results, "time").to_vec(), vec![0.0, 1.0, 2.0]);
    assert_eq!(probe.snapshot().solves, vec![1.0, 2.0]);
}

#[test]
fn missing_model_is_a_definition_error() {
    let mut root = three_point_timecourse();
    let err = root.run(None).unwrap_err();
    assert_eq!(err.to_string(), "No model has been set for this simulation.");
}

#[test]
fn nested_iterations_get_numbered_folders() {
    let base = std::env::temp_dir().join(format!("assay-nested-folders-{}", std::process::id()));
    let mut root = Simulation::nested(outer(&[0.0, 1.0]), three_point_timecourse()).unwrap();
    let model = CounterModel::new();
    let probe = model.probe();
    root.set_model(share(model));
    root.set_output_folder(&base);

    root.run(None).unwrap();
    assert_eq!(probe.folders(), vec![base.join("run_1"), base.join("run_2")]);
    assert!(base.join("run_2").is_dir());
    fs::remove_dir_all(&base).unwrap();
}

/// Owns the even iterations of the outermost loop.
struct EvenIterations;

impl Partition for EvenIterations {
    fn level(&self) -> usize {
        0
    }

    fn owns(&self, indices: &[usize]) -> bool {
        indices[0] % 2 == 0
    }
}

#[test]
fn skipped_iterations_stay_zero() {
    let mut root = Simulation::nested(outer(&[0.0, 1.0, 2.0]), three_point_timecourse())
        .unwrap()
        .with_modifiers(reset_every_loop());
    root.set_model(share(CounterModel::new().with_initial_count(1.0)));

    let results = root.run(Some(&EvenIterations)).unwrap();
    assert_eq!(
        array(&results, "count").to_vec(),
        vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]
    );
}
