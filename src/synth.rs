// SPDX-License-Identifier: Apache-2.0

//! The sequential synthesis driver.
//!
//! The outer loop walks the fence stream in non-decreasing step count; each
//! fence gets a fresh encoder and a restarted solver, and the inner CEGAR
//! loop alternates SAT calls with candidate simulation until the fence is
//! accepted or refuted. The first accepted fence yields a minimum-size chain
//! because every smaller step count was exhausted first.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::chain::Chain;
use crate::dag::Dag;
use crate::encoder::Encoder;
use crate::fence::{fence_stream, Fence};
use crate::layout::MAX_NODES;
use crate::solver::{SatSolver, SolveResult, VarisatSolver};
use crate::spec::{Spec, SynthStats};

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid specification: {0}")]
    InvalidSpec(String),
    #[error("target is not realizable with the selected primitive")]
    Unrealizable,
    #[error("conflict budget exhausted before a verdict")]
    BudgetExhausted,
    #[error("topology enumeration exhausted below the step limit")]
    EnumerationExhausted,
}

/// How candidate topologies are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Walk fences (level profiles) through the po-filtered stream.
    Fences,
    /// No level restrictions; iterate the step count directly.
    Flat,
}

#[derive(Debug, Clone, Copy)]
pub struct SynthOptions {
    pub topology: Topology,
    /// Refuse to look for chains beyond this many steps.
    pub max_steps: Option<usize>,
    /// Conflict budget per SAT call; 0 means unlimited.
    pub conflict_budget: u64,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            topology: Topology::Fences,
            max_steps: None,
            conflict_budget: 0,
        }
    }
}

/// Result of one fence (or DAG) attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Solved(Chain),
    /// No chain matches this topology: advance the enumerator.
    Infeasible,
    /// A SAT call ran out of budget.
    Budget,
    /// The cancel flag was raised by another worker.
    Cancelled,
}

/// Runs the CEGAR loop for one topology candidate. `fence` of `None` selects
/// the flat layout; `dag` additionally pins every fanin. The cancel flag is
/// polled between SAT calls.
pub fn solve_fence<S: SatSolver>(
    spec: &Spec,
    solver: &mut S,
    fence: Option<&Fence>,
    dag: Option<&Dag>,
    options: &SynthOptions,
    cancel: Option<&AtomicBool>,
    stats: &mut SynthStats,
) -> AttemptOutcome {
    solver.restart();
    let mut encoder = Encoder::new(spec, fence, solver);
    let outcome = (|| {
        if !encoder.encode() {
            return AttemptOutcome::Infeasible;
        }
        if let Some(dag) = dag {
            if !encoder.fix_dag(dag) {
                return AttemptOutcome::Infeasible;
            }
        }
        // Minterm 0 is a sentinel forcing at least one solve.
        let mut minterm = 0u64;
        loop {
            if cancel.map_or(false, |c| c.load(Ordering::SeqCst)) {
                return AttemptOutcome::Cancelled;
            }
            if !encoder.add_cnf(minterm) {
                return AttemptOutcome::Infeasible;
            }
            match encoder.solve(options.conflict_budget) {
                SolveResult::Unsat => return AttemptOutcome::Infeasible,
                SolveResult::Timeout => return AttemptOutcome::Budget,
                SolveResult::Sat => {
                    let chain = encoder.extract_chain(spec.out_inv());
                    match encoder.simulate(&chain) {
                        None => return AttemptOutcome::Solved(chain),
                        Some(m) => minterm = m,
                    }
                }
            }
        }
    })();
    stats.sat_calls += encoder.sat_calls();
    stats.minterms_added += encoder.minterms_added();
    outcome
}

/// Step counts above this are beyond the selector store regardless of
/// user-imposed limits.
pub(crate) fn step_capacity(spec: &Spec, options: &SynthOptions) -> usize {
    let cap = MAX_NODES - spec.nr_sources();
    options.max_steps.map_or(cap, |m| m.min(cap))
}

/// Synthesizes a minimum-size chain with the default solver backend.
pub fn synthesize(spec: &mut Spec, options: &SynthOptions) -> Result<Chain, SynthError> {
    let mut solver = VarisatSolver::new();
    synthesize_with_solver(spec, &mut solver, options)
}

pub fn synthesize_with_solver<S: SatSolver>(
    spec: &mut Spec,
    solver: &mut S,
    options: &SynthOptions,
) -> Result<Chain, SynthError> {
    spec.preprocess()?;
    if let Some(chain) = spec.trivial_chain() {
        return Ok(chain);
    }

    let max_steps = step_capacity(spec, options);
    let mut stats = SynthStats::default();
    let mut budget_hit = false;

    let result = match options.topology {
        Topology::Fences => {
            let mut found = None;
            for fence in fence_stream(spec.initial_steps(), spec.primitive().fanin_arity()) {
                if fence.nr_nodes() > max_steps {
                    break;
                }
                spec.nr_steps = fence.nr_nodes();
                stats.fences_tried += 1;
                log::debug!("trying fence {:?}", fence.levels());
                match solve_fence(spec, solver, Some(&fence), None, options, None, &mut stats)
                {
                    AttemptOutcome::Solved(chain) => {
                        found = Some(chain);
                        break;
                    }
                    AttemptOutcome::Infeasible => {}
                    AttemptOutcome::Budget => budget_hit = true,
                    AttemptOutcome::Cancelled => unreachable!("no cancel flag installed"),
                }
            }
            found
        }
        Topology::Flat => {
            let mut found = None;
            for nr_steps in spec.initial_steps()..=max_steps {
                spec.nr_steps = nr_steps;
                log::debug!("trying {} steps, flat layout", nr_steps);
                match solve_fence(spec, solver, None, None, options, None, &mut stats) {
                    AttemptOutcome::Solved(chain) => {
                        found = Some(chain);
                        break;
                    }
                    AttemptOutcome::Infeasible => {}
                    AttemptOutcome::Budget => budget_hit = true,
                    AttemptOutcome::Cancelled => unreachable!("no cancel flag installed"),
                }
            }
            found
        }
    };

    spec.stats = stats;
    match result {
        Some(chain) => {
            log::info!(
                "solution with {} steps after {} SAT calls",
                chain.nr_steps(),
                spec.stats.sat_calls
            );
            Ok(chain)
        }
        None if budget_hit => Err(SynthError::BudgetExhausted),
        None => Err(SynthError::EnumerationExhausted),
    }
}
