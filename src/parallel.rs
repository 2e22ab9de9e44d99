// SPDX-License-Identifier: Apache-2.0

//! The parallel search coordinator.
//!
//! Workers partition the concrete-DAG stream of the current step count
//! through a mutex-guarded cursor; each runs a private solver and encoder on
//! its DAG. The first success fills the result slot and raises a sticky
//! cancel flag that every worker polls between SAT calls. Step counts are
//! separated by a generation barrier (the scoped-thread join), so a larger
//! chain can never be published while a smaller one is still possible —
//! parallel results match sequential step counts exactly.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::chain::Chain;
use crate::dag::{Dag, DagIter};
use crate::fence::{fences_of_size, Fence};
use crate::solver::VarisatSolver;
use crate::spec::{Spec, SynthStats};
use crate::synth::{solve_fence, step_capacity, AttemptOutcome, SynthError, SynthOptions, Topology};

/// Shared cursor over the (fence, DAG) pairs of one generation.
struct DagCursor<'a> {
    spec: &'a Spec,
    units: &'a [Option<Fence>],
    next_unit: usize,
    current: Option<(usize, DagIter)>,
}

impl<'a> DagCursor<'a> {
    fn new(spec: &'a Spec, units: &'a [Option<Fence>]) -> Self {
        Self {
            spec,
            units,
            next_unit: 0,
            current: None,
        }
    }

    fn next(&mut self) -> Option<(usize, Dag)> {
        loop {
            if let Some((unit, iter)) = &mut self.current {
                if let Some(dag) = iter.next() {
                    return Some((*unit, dag));
                }
                self.current = None;
            }
            if self.next_unit >= self.units.len() {
                return None;
            }
            let unit = self.next_unit;
            self.next_unit += 1;
            let layout = self.spec.layout_for(self.units[unit].as_ref());
            self.current = Some((unit, DagIter::new(&layout)));
        }
    }
}

/// Synthesizes a minimum-size chain with `nr_workers` workers (0 = hardware
/// parallelism). Step count and simulated function match the sequential
/// result for the same spec.
pub fn synthesize_parallel(
    spec: &mut Spec,
    nr_workers: usize,
    options: &SynthOptions,
) -> Result<Chain, SynthError> {
    spec.preprocess()?;
    if let Some(chain) = spec.trivial_chain() {
        return Ok(chain);
    }

    let workers = if nr_workers == 0 {
        num_cpus::get()
    } else {
        nr_workers
    };
    let max_steps = step_capacity(spec, options);
    let arity = spec.primitive().fanin_arity();
    let mut total = SynthStats::default();
    let budget_hit = AtomicBool::new(false);

    for nr_steps in spec.initial_steps()..=max_steps {
        spec.nr_steps = nr_steps;
        let units: Vec<Option<Fence>> = match options.topology {
            Topology::Flat => vec![None],
            Topology::Fences => fences_of_size(nr_steps, arity).into_iter().map(Some).collect(),
        };
        total.fences_tried += units.len();
        log::debug!(
            "generation {}: {} topology units, {} workers",
            nr_steps,
            units.len(),
            workers
        );

        let solved = {
            let cursor = Mutex::new(DagCursor::new(spec, &units));
            let found = AtomicBool::new(false);
            let result: Mutex<Option<Chain>> = Mutex::new(None);
            let dags_tried = AtomicUsize::new(0);
            let sat_calls = AtomicUsize::new(0);
            let minterms_added = AtomicUsize::new(0);
            let spec_ref: &Spec = spec;

            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| {
                        let mut solver = VarisatSolver::new();
                        let mut local = SynthStats::default();
                        loop {
                            if found.load(Ordering::SeqCst) {
                                break;
                            }
                            let next = cursor.lock().unwrap().next();
                            let Some((unit, dag)) = next else {
                                break;
                            };
                            local.dags_tried += 1;
                            let fence = units[unit].as_ref();
                            match solve_fence(
                                spec_ref,
                                &mut solver,
                                fence,
                                Some(&dag),
                                options,
                                Some(&found),
                                &mut local,
                            ) {
                                AttemptOutcome::Solved(chain) => {
                                    let mut slot = result.lock().unwrap();
                                    // First success wins; the flag stops the rest.
                                    if slot.is_none() {
                                        *slot = Some(chain);
                                    }
                                    drop(slot);
                                    found.store(true, Ordering::SeqCst);
                                    break;
                                }
                                AttemptOutcome::Infeasible => {}
                                AttemptOutcome::Budget => {
                                    budget_hit.store(true, Ordering::SeqCst);
                                }
                                AttemptOutcome::Cancelled => break,
                            }
                        }
                        dags_tried.fetch_add(local.dags_tried, Ordering::SeqCst);
                        sat_calls.fetch_add(local.sat_calls, Ordering::SeqCst);
                        minterms_added.fetch_add(local.minterms_added, Ordering::SeqCst);
                    });
                }
            });

            total.dags_tried += dags_tried.load(Ordering::SeqCst);
            total.sat_calls += sat_calls.load(Ordering::SeqCst);
            total.minterms_added += minterms_added.load(Ordering::SeqCst);
            result.into_inner().unwrap()
        };

        if let Some(chain) = solved {
            spec.stats = total;
            log::info!(
                "parallel solution with {} steps after {} DAGs",
                chain.nr_steps(),
                spec.stats.dags_tried
            );
            return Ok(chain);
        }
    }

    spec.stats = total;
    if budget_hit.load(Ordering::SeqCst) {
        Err(SynthError::BudgetExhausted)
    } else {
        Err(SynthError::EnumerationExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Primitive;
    use crate::synth::synthesize;
    use crate::tt::TruthTable;

    #[test]
    fn test_parallel_matches_sequential_on_xor() {
        let a = TruthTable::nth_var(2, 0);
        let b = TruthTable::nth_var(2, 1);
        let target = a.xor(&b);
        let options = SynthOptions::default();

        let mut spec = Spec::new(target.clone(), Primitive::Aig);
        let sequential = synthesize(&mut spec, &options).unwrap();

        for workers in [1, 2, 4] {
            let mut spec = Spec::new(target.clone(), Primitive::Aig);
            let chain = synthesize_parallel(&mut spec, workers, &options).unwrap();
            assert_eq!(chain.nr_steps(), sequential.nr_steps());
            assert_eq!(chain.simulate()[0], target);
        }
    }

    #[test]
    fn test_parallel_trivial_target_short_circuits() {
        let mut spec = Spec::new(TruthTable::nth_var(3, 1), Primitive::Aig);
        let chain = synthesize_parallel(&mut spec, 4, &SynthOptions::default()).unwrap();
        assert_eq!(chain.nr_steps(), 0);
    }
}
