// SPDX-License-Identifier: Apache-2.0

//! Concrete interconnect shapes (DAGs) compatible with a fence.
//!
//! A DAG fixes every fanin of every step; operator choice (for primitives
//! with free operators) stays open. The stream is deterministic so parallel
//! workers can partition the search by pulling from a shared cursor without
//! overlap. Shapes whose interior steps feed nothing are skipped: such a
//! chain can never be a minimum-size solution.

use crate::layout::StepLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dag {
    /// `fanins[s][k]` is the source feeding slot `k` of step `s`.
    pub fanins: Vec<Vec<usize>>,
}

/// Enumerates every fanin assignment compatible with a layout, in
/// lexicographic order of per-step tuple choices. Within a step the tuple is
/// strictly descending across slots, matching the encoder's symmetry break.
pub struct DagIter {
    /// Per step, the list of legal fanin tuples in enumeration order.
    step_tuples: Vec<Vec<Vec<usize>>>,
    cursor: Vec<usize>,
    first_step: usize,
    done: bool,
}

impl DagIter {
    pub fn new(layout: &StepLayout) -> Self {
        let mut step_tuples = Vec::with_capacity(layout.nr_steps());
        for i in layout.first_step()..layout.nr_nodes() {
            let domains: Vec<Vec<usize>> =
                (0..layout.arity()).map(|k| layout.slot_sources(i, k)).collect();
            let mut tuples = Vec::new();
            gather_tuples(&domains, 0, usize::MAX, &mut Vec::new(), &mut tuples);
            step_tuples.push(tuples);
        }
        let done = step_tuples.iter().any(|t| t.is_empty());
        let cursor = vec![0; step_tuples.len()];
        Self {
            step_tuples,
            cursor,
            first_step: layout.first_step(),
            done,
        }
    }

    fn current(&self) -> Dag {
        Dag {
            fanins: self
                .step_tuples
                .iter()
                .zip(self.cursor.iter())
                .map(|(tuples, &c)| tuples[c].clone())
                .collect(),
        }
    }

    fn advance(&mut self) {
        for s in (0..self.cursor.len()).rev() {
            self.cursor[s] += 1;
            if self.cursor[s] < self.step_tuples[s].len() {
                return;
            }
            self.cursor[s] = 0;
        }
        self.done = true;
    }

    /// Every step but the root must feed a later step.
    fn is_connected(&self, dag: &Dag) -> bool {
        let nr_steps = dag.fanins.len();
        for s in 0..nr_steps.saturating_sub(1) {
            let index = self.first_step + s;
            let used = dag.fanins[s + 1..]
                .iter()
                .any(|fanins| fanins.contains(&index));
            if !used {
                return false;
            }
        }
        true
    }
}

impl Iterator for DagIter {
    type Item = Dag;

    fn next(&mut self) -> Option<Dag> {
        while !self.done {
            let dag = self.current();
            self.advance();
            if self.is_connected(&dag) {
                return Some(dag);
            }
        }
        None
    }
}

fn gather_tuples(
    domains: &[Vec<usize>],
    slot: usize,
    upper: usize,
    cur: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if slot == domains.len() {
        out.push(cur.clone());
        return;
    }
    for &j in &domains[slot] {
        // Strictly descending fanins within a step.
        if j >= upper {
            continue;
        }
        cur.push(j);
        gather_tuples(domains, slot + 1, j, cur, out);
        cur.pop();
    }
}
