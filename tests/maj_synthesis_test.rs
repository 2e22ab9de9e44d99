// SPDX-License-Identifier: Apache-2.0

//! Majority-primitive synthesis scenarios.

use exsynth::{
    synthesize, synthesize_parallel, Primitive, Spec, SynthError, SynthOptions, TruthTable,
};

#[test]
fn test_majority_of_three_is_one_step() {
    let target = TruthTable::majority(3);
    let mut spec = Spec::new(target.clone(), Primitive::Maj);
    let chain = synthesize(&mut spec, &SynthOptions::default()).unwrap();
    assert_eq!(chain.nr_steps(), 1);
    assert!(chain.is_maj());
    assert_eq!(chain.simulate()[0], target);
    // The CEGAR loop settles within two minterms: the sentinel plus at most
    // one discriminating counterexample.
    assert!(spec.stats.minterms_added <= 2);
}

#[test]
fn test_majority_of_five_matches_published_optimum() {
    let target = TruthTable::majority(5);
    let mut spec = Spec::new(target.clone(), Primitive::Maj);
    let chain = synthesize(&mut spec, &SynthOptions::default()).unwrap();
    assert_eq!(chain.nr_steps(), 4);
    assert!(chain.is_maj());
    assert_eq!(chain.simulate()[0], target);
}

#[test]
fn test_majority_parallel_agrees_with_sequential() {
    let target = TruthTable::majority(3);
    for workers in [1, 2, 4, 8] {
        let mut spec = Spec::new(target.clone(), Primitive::Maj);
        let chain = synthesize_parallel(&mut spec, workers, &SynthOptions::default()).unwrap();
        assert_eq!(chain.nr_steps(), 1);
        assert_eq!(chain.simulate()[0], target);
    }
}

#[test]
fn test_majority_projection_needs_no_steps() {
    let target = TruthTable::nth_var(3, 2);
    let mut spec = Spec::new(target.clone(), Primitive::Maj);
    let chain = synthesize(&mut spec, &SynthOptions::default()).unwrap();
    assert_eq!(chain.nr_steps(), 0);
    assert_eq!(chain.simulate()[0], target);
}

#[test]
fn test_majority_rejects_constant_true() {
    let mut spec = Spec::new(TruthTable::zero(3).not(), Primitive::Maj);
    let err = synthesize(&mut spec, &SynthOptions::default()).unwrap_err();
    assert!(matches!(err, SynthError::Unrealizable));
}
