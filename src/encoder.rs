// SPDX-License-Identifier: Apache-2.0

//! CNF encoding of one topology attempt.
//!
//! The encoder owns the structural-variable layout for a single fence (or
//! flat) attempt, emits the base constraints once, and then grows the
//! formula one minterm at a time as the CEGAR loop demands. It borrows the
//! solver exclusively for the attempt's duration and hands it back when
//! dropped.
//!
//! Variable ids are dense and allocated in two phases: structural selector
//! variables (plus per-step operator variables for AIG) first, then
//! `arity + 1` simulation shadows per step for every added minterm.

use crate::chain::{Chain, OP_MAJ};
use crate::dag::Dag;
use crate::fence::Fence;
use crate::layout::{StepLayout, MAX_NODES};
use crate::solver::{Lit, SatSolver, SolveResult, Var};
use crate::spec::{Primitive, Spec};
use crate::tt::TruthTable;

/// Contiguous selector-id store: `S[i][k][j]`, id 0 meaning "no variable".
struct SelectorStore {
    marks: Vec<Var>,
}

impl SelectorStore {
    fn new() -> Self {
        Self {
            marks: vec![0; MAX_NODES * 3 * MAX_NODES],
        }
    }

    #[inline]
    fn get(&self, i: usize, k: usize, j: usize) -> Var {
        self.marks[(i * 3 + k) * MAX_NODES + j]
    }

    #[inline]
    fn set(&mut self, i: usize, k: usize, j: usize, var: Var) {
        self.marks[(i * 3 + k) * MAX_NODES + j] = var;
    }
}

pub struct Encoder<'s, S: SatSolver> {
    solver: &'s mut S,
    layout: StepLayout,
    primitive: Primitive,
    target: TruthTable,
    aux: Vec<TruthTable>,
    nr_in: usize,
    balanced_sim: bool,
    /// Input covering is only sound when no auxiliary source can stand in
    /// for a support variable.
    cover_inputs: bool,
    marks: SelectorStore,
    /// Per source, the selector literals that would make it a fanin.
    out_lits: Vec<Vec<Lit>>,
    /// AIG only: per step, the operator table variables for the fanin
    /// combinations 01, 10 and 11.
    op_vars: Vec<[Var; 3]>,
    /// Level-0 source bits under the current minterm.
    var_vals: Vec<bool>,
    next_var: usize,
    minterms_added: usize,
    sat_calls: usize,
}

impl<'s, S: SatSolver> Encoder<'s, S> {
    pub fn new(spec: &Spec, fence: Option<&Fence>, solver: &'s mut S) -> Self {
        let layout = spec.layout_for(fence);
        let nr_nodes = layout.nr_nodes();
        Self {
            solver,
            layout,
            primitive: spec.primitive(),
            target: spec.norm_target().clone(),
            aux: spec.aux().to_vec(),
            nr_in: spec.nr_in(),
            balanced_sim: spec.balanced_sim(),
            cover_inputs: spec.aux().is_empty(),
            marks: SelectorStore::new(),
            out_lits: vec![Vec::new(); nr_nodes],
            op_vars: Vec::new(),
            var_vals: vec![false; spec.nr_sources()],
            next_var: 1,
            minterms_added: 0,
            sat_calls: 0,
        }
    }

    /// Lays out the structural variables and emits the base CNF. A `false`
    /// return means the attempt is already contradictory.
    pub fn encode(&mut self) -> bool {
        self.add_base_variables();
        self.add_base_cnf()
    }

    fn add_base_variables(&mut self) {
        for i in self.layout.first_step()..self.layout.nr_nodes() {
            for k in 0..self.layout.arity() {
                for j in self.layout.slot_sources(i, k) {
                    let var = self.next_var as Var;
                    self.next_var += 1;
                    self.out_lits[j].push(Lit::positive(var));
                    self.marks.set(i, k, j, var);
                }
            }
        }
        if self.primitive == Primitive::Aig {
            for _ in 0..self.layout.nr_steps() {
                let base = self.next_var as Var;
                self.op_vars.push([base, base + 1, base + 2]);
                self.next_var += 3;
            }
        }
        log::debug!("structural variables = {}", self.next_var - 1);
    }

    fn add_base_cnf(&mut self) -> bool {
        self.solver.set_nr_vars(self.next_var);
        let nr_nodes = self.layout.nr_nodes();
        for i in self.layout.first_step()..nr_nodes {
            for k in 0..self.layout.arity() {
                let slot: Vec<Lit> = (0..nr_nodes)
                    .filter_map(|j| match self.marks.get(i, k, j) {
                        0 => None,
                        var => Some(Lit::positive(var)),
                    })
                    .collect();
                // Each slot selects at least one source, and at most one.
                if !self.solver.add_clause(&slot) {
                    return false;
                }
                for n in 0..slot.len() {
                    for m in n + 1..slot.len() {
                        if !self.solver.add_clause(&[!slot[n], !slot[m]]) {
                            return false;
                        }
                    }
                }
                if k + 1 == self.layout.arity() {
                    continue;
                }
                // Ordered fanins: forbid fanin_k <= fanin_{k+1}.
                for j in 0..nr_nodes {
                    if self.marks.get(i, k, j) == 0 {
                        continue;
                    }
                    for n in j..nr_nodes {
                        if self.marks.get(i, k + 1, n) == 0 {
                            continue;
                        }
                        let clause = [
                            Lit::negative(self.marks.get(i, k, j)),
                            Lit::negative(self.marks.get(i, k + 1, n)),
                        ];
                        if !self.solver.add_clause(&clause) {
                            return false;
                        }
                    }
                }
            }
            if self.primitive == Primitive::Aig {
                let [f1, f2, f3] = self.op_vars[i - self.layout.first_step()];
                // Restrict operators to single AIG gates: no constant, no
                // XOR, no projections.
                let banned = [
                    [Lit::positive(f1), Lit::positive(f2), Lit::positive(f3)],
                    [Lit::negative(f1), Lit::negative(f2), Lit::positive(f3)],
                    [Lit::negative(f1), Lit::positive(f2), Lit::negative(f3)],
                    [Lit::positive(f1), Lit::negative(f2), Lit::negative(f3)],
                ];
                for clause in banned {
                    if !self.solver.add_clause(&clause) {
                        return false;
                    }
                }
            }
        }
        // Every non-root step must feed something; support inputs likewise
        // when no auxiliary source could cover for them.
        for j in 0..nr_nodes - 1 {
            if j < self.nr_in {
                if !self.cover_inputs || !self.target.has_var(j) {
                    continue;
                }
            } else if j < self.layout.nr_sources() {
                continue;
            }
            if self.out_lits[j].is_empty() {
                continue;
            }
            let clause = self.out_lits[j].clone();
            if !self.solver.add_clause(&clause) {
                return false;
            }
        }
        true
    }

    /// Pins every selector to the concrete interconnect of `dag`.
    pub fn fix_dag(&mut self, dag: &Dag) -> bool {
        for (s, fanins) in dag.fanins.iter().enumerate() {
            let i = self.layout.first_step() + s;
            for (k, &j) in fanins.iter().enumerate() {
                let var = self.marks.get(i, k, j);
                debug_assert!(var != 0, "DAG fanin outside the slot domain");
                if !self.solver.add_clause(&[Lit::positive(var)]) {
                    return false;
                }
            }
        }
        true
    }

    /// Adds the simulation constraints for one minterm. A `false` return
    /// means the formula became contradictory, i.e. the attempt is
    /// infeasible.
    pub fn add_cnf(&mut self, minterm: u64) -> bool {
        let arity = self.layout.arity();
        let shadow = arity + 1;
        let first = self.layout.first_step();
        let root = self.layout.root();
        let nr_nodes = self.layout.nr_nodes();
        let target_bit = self.target.get_bit(minterm);

        for j in 0..self.layout.nr_sources() {
            self.var_vals[j] = if j < self.nr_in {
                (minterm >> j) & 1 != 0
            } else {
                self.aux[j - self.nr_in].get_bit(minterm)
            };
        }

        let sim_base = self.next_var;
        self.solver
            .set_nr_vars(sim_base + shadow * self.layout.nr_steps());

        for i in first..nr_nodes {
            let base_i = (sim_base + shadow * (i - first)) as Var;

            // Fanin connectivity: a selected fanin shadow equals its
            // source's bit under this minterm.
            for k in 0..arity {
                for j in 0..nr_nodes {
                    let s_var = self.marks.get(i, k, j);
                    if s_var == 0 {
                        continue;
                    }
                    for n in [false, true] {
                        let mut clause =
                            vec![Lit::negative(s_var), Lit::new(base_i + k as Var, n)];
                        if j >= first {
                            let base_j = (sim_base + shadow * (j - first)) as Var;
                            clause.push(Lit::new(base_j + arity as Var, !n));
                        } else if self.var_vals[j] == n {
                            continue;
                        }
                        if !self.solver.add_clause(&clause) {
                            return false;
                        }
                    }
                }
            }

            let is_root = i == root;
            match self.primitive {
                Primitive::Maj => {
                    // If two fanins agree the output follows them; the root's
                    // output literal is folded into the target bit by
                    // suppressing the contradicting polarity.
                    for n in [false, true] {
                        if is_root && n == target_bit {
                            continue;
                        }
                        for omitted in 0..3 {
                            let mut clause = Vec::with_capacity(3);
                            for k in 0..3usize {
                                if k != omitted {
                                    clause.push(Lit::new(base_i + k as Var, n));
                                }
                            }
                            if !is_root {
                                clause.push(Lit::new(base_i + 3, !n));
                            }
                            if !self.solver.add_clause(&clause) {
                                return false;
                            }
                        }
                    }
                }
                Primitive::Aig => {
                    let [f1, f2, f3] = self.op_vars[i - first];
                    let a = base_i;
                    let b = base_i + 1;
                    let o = base_i + 2;
                    // Normality: both fanins zero force a zero output.
                    if is_root {
                        if target_bit
                            && !self.solver.add_clause(&[Lit::positive(a), Lit::positive(b)])
                        {
                            return false;
                        }
                    } else if !self.solver.add_clause(&[
                        Lit::positive(a),
                        Lit::positive(b),
                        Lit::negative(o),
                    ]) {
                        return false;
                    }
                    // Tie the output shadow to the operator bit of the
                    // active fanin combination.
                    for (combo, f) in [(1u32, f1), (2, f2), (3, f3)] {
                        let p = combo & 1 != 0;
                        let q = combo & 2 != 0;
                        if is_root {
                            let f_lit = if target_bit {
                                Lit::positive(f)
                            } else {
                                Lit::negative(f)
                            };
                            if !self
                                .solver
                                .add_clause(&[Lit::new(a, p), Lit::new(b, q), f_lit])
                            {
                                return false;
                            }
                        } else {
                            let up = [
                                Lit::new(a, p),
                                Lit::new(b, q),
                                Lit::negative(o),
                                Lit::positive(f),
                            ];
                            let down = [
                                Lit::new(a, p),
                                Lit::new(b, q),
                                Lit::positive(o),
                                Lit::negative(f),
                            ];
                            if !self.solver.add_clause(&up) || !self.solver.add_clause(&down)
                            {
                                return false;
                            }
                        }
                    }
                }
            }
        }

        self.next_var += shadow * self.layout.nr_steps();
        self.minterms_added += 1;
        true
    }

    pub fn solve(&mut self, conflict_budget: u64) -> SolveResult {
        self.sat_calls += 1;
        log::debug!(
            "iter {:3}: vars = {:5}, clauses = {:6}",
            self.minterms_added,
            self.next_var,
            self.solver.nr_clauses()
        );
        self.solver.solve(conflict_budget)
    }

    fn find_fanin(&self, i: usize, k: usize) -> usize {
        let mut found = None;
        let mut count = 0;
        for j in 0..self.layout.nr_nodes() {
            let var = self.marks.get(i, k, j);
            if var != 0 && self.solver.var_value(var) {
                found = Some(j);
                count += 1;
            }
        }
        assert_eq!(count, 1, "slot ({}, {}) must select exactly one source", i, k);
        found.unwrap()
    }

    /// Decodes the current model into a chain.
    pub fn extract_chain(&self, out_inv: bool) -> Chain {
        let first = self.layout.first_step();
        let mut chain = Chain::new(self.nr_in, self.aux.clone());
        for i in first..self.layout.nr_nodes() {
            let fanins: Vec<usize> = (0..self.layout.arity())
                .map(|k| self.find_fanin(i, k))
                .collect();
            let op = match self.primitive {
                Primitive::Maj => OP_MAJ,
                Primitive::Aig => {
                    let [f1, f2, f3] = self.op_vars[i - first];
                    let mut op = 0u8;
                    if self.solver.var_value(f1) {
                        op |= 1 << 1;
                    }
                    if self.solver.var_value(f2) {
                        op |= 1 << 2;
                    }
                    if self.solver.var_value(f3) {
                        op |= 1 << 3;
                    }
                    op
                }
            };
            chain.add_step(op, fanins);
        }
        chain.set_output(((self.layout.nr_nodes() << 1) as u32) | out_inv as u32);
        chain
    }

    /// Returns the smallest minterm where the candidate disagrees with the
    /// target, or `None` when the candidate matches. For self-dual symmetric
    /// targets the scan restricts itself to weight-balanced minterms.
    pub fn simulate(&self, chain: &Chain) -> Option<u64> {
        let tts = chain.simulate_nodes();
        let out = tts.last().expect("chain has at least one step");
        for m in 1..(1u64 << self.nr_in) {
            if self.balanced_sim {
                let ones = m.count_ones() as usize;
                if ones < self.nr_in / 2 || ones > self.nr_in / 2 + 1 {
                    continue;
                }
            }
            if out.get_bit(m) != self.target.get_bit(m) {
                return Some(m);
            }
        }
        None
    }

    pub fn nr_vars(&self) -> usize {
        self.next_var
    }

    pub fn minterms_added(&self) -> usize {
        self.minterms_added
    }

    pub fn sat_calls(&self) -> usize {
        self.sat_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::VarisatSolver;
    use crate::spec::Spec;

    #[test]
    fn test_flat_majority_variable_count() {
        // Pinned first step contributes 3 selectors; the second step has
        // slot domains of 4, 3 and 2 sources.
        let mut spec = Spec::new(TruthTable::majority(3), Primitive::Maj);
        spec.preprocess().unwrap();
        spec.nr_steps = 2;
        let mut solver = VarisatSolver::new();
        let mut encoder = Encoder::new(&spec, None, &mut solver);
        assert!(encoder.encode());
        assert_eq!(encoder.nr_vars(), 1 + 3 + (4 + 3 + 2));
    }

    #[test]
    fn test_single_fence_attempt_finds_majority() {
        let mut spec = Spec::new(TruthTable::majority(3), Primitive::Maj);
        spec.preprocess().unwrap();
        spec.nr_steps = 1;
        let fence = Fence::new(vec![1]);
        let mut solver = VarisatSolver::new();
        let mut encoder = Encoder::new(&spec, Some(&fence), &mut solver);
        assert!(encoder.encode());
        assert!(encoder.add_cnf(0));
        assert_eq!(encoder.solve(0), SolveResult::Sat);
        let chain = encoder.extract_chain(false);
        assert!(encoder.simulate(&chain).is_none());
        assert_eq!(chain.simulate()[0], TruthTable::majority(3));
    }

    #[test]
    fn test_decoded_slots_are_exactly_one() {
        let a = TruthTable::nth_var(2, 0);
        let b = TruthTable::nth_var(2, 1);
        let mut spec = Spec::new(a.and(&b), Primitive::Aig);
        spec.preprocess().unwrap();
        spec.nr_steps = 1;
        let mut solver = VarisatSolver::new();
        let mut encoder = Encoder::new(&spec, None, &mut solver);
        assert!(encoder.encode());
        assert!(encoder.add_cnf(0));
        assert_eq!(encoder.solve(0), SolveResult::Sat);
        // find_fanin asserts the exactly-one invariant internally.
        let chain = encoder.extract_chain(false);
        assert_eq!(chain.steps()[0].fanins, vec![1, 0]);
    }
}
