// SPDX-License-Identifier: Apache-2.0

//! Straight-line programs of primitive gates.
//!
//! A chain's fanin space is the unified source index range: primary inputs
//! first, then registered auxiliary functions, then steps in order. Each step
//! stores its operator as a small truth table over its own fanins: bit `c` is
//! the output when fanin `t` carries bit `t` of `c`. Operators are normal
//! (`op & 1 == 0`), so any output inversion lives in the output literal.
//!
//! Output literals follow the `(node << 1) | negated` convention with node 0
//! reserved for constant zero and node `j + 1` denoting source `j`.

use std::fmt;

use crate::tt::TruthTable;

/// `a & b`
pub const OP_AND: u8 = 0x8;
/// `a & !b`
pub const OP_AND_NB: u8 = 0x2;
/// `!a & b`
pub const OP_AND_NA: u8 = 0x4;
/// `a | b`
pub const OP_OR: u8 = 0xE;
/// ternary majority
pub const OP_MAJ: u8 = 0xE8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub op: u8,
    pub fanins: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    nr_in: usize,
    aux: Vec<TruthTable>,
    steps: Vec<Step>,
    outputs: Vec<u32>,
}

impl Chain {
    pub fn new(nr_in: usize, aux: Vec<TruthTable>) -> Self {
        Self {
            nr_in,
            aux,
            steps: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn nr_inputs(&self) -> usize {
        self.nr_in
    }

    pub fn nr_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn outputs(&self) -> &[u32] {
        &self.outputs
    }

    /// Appends a step and returns its source index.
    pub fn add_step(&mut self, op: u8, fanins: Vec<usize>) -> usize {
        let index = self.nr_in + self.aux.len() + self.steps.len();
        debug_assert!(fanins.iter().all(|&f| f < index), "fanin must precede step");
        debug_assert!(op & 1 == 0, "step operators must be normal");
        self.steps.push(Step { op, fanins });
        index
    }

    /// Sets the single output literal: `(node << 1) | negated`, node 0 being
    /// constant zero and node `j + 1` being source `j`.
    pub fn set_output(&mut self, lit: u32) {
        self.outputs = vec![lit];
    }

    /// Truth tables of every source (inputs, auxiliaries, steps) in order.
    pub fn simulate_nodes(&self) -> Vec<TruthTable> {
        let mut tts: Vec<TruthTable> =
            (0..self.nr_in).map(|i| TruthTable::nth_var(self.nr_in, i)).collect();
        tts.extend(self.aux.iter().cloned());
        for step in &self.steps {
            tts.push(eval_step(step, &tts));
        }
        tts
    }

    /// Simulates the chain, returning one table per output.
    pub fn simulate(&self) -> Vec<TruthTable> {
        let tts = self.simulate_nodes();
        self.outputs
            .iter()
            .map(|&lit| {
                let node = (lit >> 1) as usize;
                let tt = if node == 0 {
                    TruthTable::zero(self.nr_in)
                } else {
                    tts[node - 1].clone()
                };
                if lit & 1 != 0 {
                    tt.not()
                } else {
                    tt
                }
            })
            .collect()
    }

    /// True when every step is a single AIG gate (an AND with optional input
    /// inversions, or an OR, which is one AND plus inversions).
    pub fn is_aig(&self) -> bool {
        self.steps.iter().all(|s| {
            s.fanins.len() == 2 && matches!(s.op, OP_AND | OP_AND_NA | OP_AND_NB | OP_OR)
        })
    }

    pub fn is_maj(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.fanins.len() == 3 && s.op == OP_MAJ)
    }

    fn node_name(&self, source: usize) -> String {
        if source < self.nr_in {
            format!("x{}", source)
        } else if source < self.nr_in + self.aux.len() {
            format!("f{}", source - self.nr_in)
        } else {
            format!("n{}", source)
        }
    }
}

fn eval_step(step: &Step, tts: &[TruthTable]) -> TruthTable {
    let nr_vars = tts[0].nr_vars();
    let arity = step.fanins.len();
    let mut out = TruthTable::zero(nr_vars);
    for combo in 1..(1u32 << arity) {
        if step.op >> combo & 1 == 0 {
            continue;
        }
        let mut term = TruthTable::zero(nr_vars).not();
        for (t, &fanin) in step.fanins.iter().enumerate() {
            let tt = &tts[fanin];
            term = if combo >> t & 1 != 0 {
                term.and(tt)
            } else {
                term.and(&tt.not())
            };
        }
        out = out.or(&term);
    }
    out
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            let index = self.nr_in + self.aux.len() + i;
            let op = match step.op {
                OP_AND => "and".to_string(),
                OP_AND_NA => "andc0".to_string(),
                OP_AND_NB => "andc1".to_string(),
                OP_OR => "or".to_string(),
                OP_MAJ => "maj".to_string(),
                other => format!("op{:02x}", other),
            };
            let fanins: Vec<String> =
                step.fanins.iter().map(|&j| self.node_name(j)).collect();
            writeln!(f, "{} := {}({})", self.node_name(index), op, fanins.join(", "))?;
        }
        for &lit in &self.outputs {
            let node = (lit >> 1) as usize;
            let name = if node == 0 {
                "zero".to_string()
            } else {
                self.node_name(node - 1)
            };
            let inv = if lit & 1 != 0 { "!" } else { "" };
            writeln!(f, "out := {}{}", inv, name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_single_and() {
        let mut c = Chain::new(2, vec![]);
        let s = c.add_step(OP_AND, vec![0, 1]);
        c.set_output(((s + 1) << 1) as u32);
        let a = TruthTable::nth_var(2, 0);
        let b = TruthTable::nth_var(2, 1);
        assert_eq!(c.simulate()[0], a.and(&b));
        assert!(c.is_aig());
        assert!(!c.is_maj());
    }

    #[test]
    fn test_simulate_xor_from_three_ands() {
        // x0 ^ x1 built the AIG way: (!x0 & x1) | (x0 & !x1).
        let mut c = Chain::new(2, vec![]);
        let g0 = c.add_step(OP_AND_NA, vec![0, 1]);
        let g1 = c.add_step(OP_AND_NB, vec![0, 1]);
        let g2 = c.add_step(OP_OR, vec![g0, g1]);
        c.set_output(((g2 + 1) << 1) as u32);
        let a = TruthTable::nth_var(2, 0);
        let b = TruthTable::nth_var(2, 1);
        assert_eq!(c.simulate()[0], a.xor(&b));
        assert_eq!(c.nr_steps(), 3);
    }

    #[test]
    fn test_output_literal_inversion_and_constant() {
        let mut c = Chain::new(2, vec![]);
        c.set_output(1);
        assert_eq!(c.simulate()[0], TruthTable::zero(2).not());

        let mut c = Chain::new(2, vec![]);
        // Source 0 with inversion: !x0.
        c.set_output((1 << 1) | 1);
        assert_eq!(c.simulate()[0], TruthTable::nth_var(2, 0).not());
    }

    #[test]
    fn test_aux_sources_feed_steps() {
        let a = TruthTable::nth_var(3, 0);
        let b = TruthTable::nth_var(3, 1);
        let aux = vec![a.not().and(&b), a.and(&b.not())];
        let mut c = Chain::new(3, aux);
        // Sources: x0..x2 are 0..2, aux are 3 and 4.
        let s = c.add_step(OP_OR, vec![3, 4]);
        c.set_output(((s + 1) << 1) as u32);
        assert_eq!(c.simulate()[0], a.xor(&b));
    }

    #[test]
    fn test_majority_step() {
        let mut c = Chain::new(3, vec![]);
        let s = c.add_step(OP_MAJ, vec![2, 1, 0]);
        c.set_output(((s + 1) << 1) as u32);
        assert_eq!(c.simulate()[0], TruthTable::majority(3));
        assert!(c.is_maj());
    }
}
