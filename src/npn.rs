// SPDX-License-Identifier: Apache-2.0

//! NPN canonicalization over small variable counts.
//!
//! NPN equivalence considers input negations (N), input permutations (P) and
//! output negation (N). The canonical representative of a function is the
//! lexicographically smallest table reachable by any of the
//! `nr_vars! * 2^nr_vars * 2` transforms; with `nr_vars <= 4` the full scan
//! is cheap, so no heuristic pruning is attempted.
//!
//! The synthesizer itself never canonicalizes; this module exists so tests
//! can sample one representative per equivalence class instead of sweeping
//! every function.

use crate::tt::TruthTable;

/// An NPN transform: for a new assignment `y`, the original assignment `x`
/// satisfies `x[perm[i]] = y[i] ^ input_negated(i)`, and the transformed
/// output is `f(x) ^ output_neg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpnTransform {
    pub perm: Vec<usize>,
    pub input_neg_mask: u32,
    pub output_neg: bool,
}

impl NpnTransform {
    #[inline]
    pub fn input_negated(&self, i: usize) -> bool {
        (self.input_neg_mask >> i) & 1 != 0
    }

    /// Applies the transform to `tt`, producing the table of `f'`.
    pub fn apply(&self, tt: &TruthTable) -> TruthTable {
        let nr_vars = tt.nr_vars();
        let mut out = TruthTable::zero(nr_vars);
        for y in 0..tt.num_bits() as u64 {
            let mut x = 0u64;
            for i in 0..nr_vars {
                let bit = ((y >> i) & 1 != 0) ^ self.input_negated(i);
                if bit {
                    x |= 1 << self.perm[i];
                }
            }
            out.set_bit(y, tt.get_bit(x) ^ self.output_neg);
        }
        out
    }
}

/// All permutations of `0..n` in a deterministic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut items: Vec<usize> = (0..n).collect();
    heap_permute(&mut items, n, &mut out);
    out
}

fn heap_permute(items: &mut Vec<usize>, k: usize, out: &mut Vec<Vec<usize>>) {
    if k <= 1 {
        out.push(items.clone());
        return;
    }
    for i in 0..k - 1 {
        heap_permute(items, k - 1, out);
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
    heap_permute(items, k - 1, out);
}

/// Returns the canonical NPN representative of `tt`.
pub fn canonicalize(tt: &TruthTable) -> TruthTable {
    let nr_vars = tt.nr_vars();
    assert!(nr_vars <= 4, "exhaustive NPN scan limited to 4 inputs");
    let mut best: Option<TruthTable> = None;
    for perm in permutations(nr_vars) {
        for input_neg_mask in 0..(1u32 << nr_vars) {
            for output_neg in [false, true] {
                let t = NpnTransform {
                    perm: perm.clone(),
                    input_neg_mask,
                    output_neg,
                };
                let cand = t.apply(tt);
                if best.as_ref().map_or(true, |b| cand < *b) {
                    best = Some(cand);
                }
            }
        }
    }
    best.unwrap()
}

/// One canonical representative per NPN class of `nr_vars`-input functions.
pub fn classes(nr_vars: usize) -> Vec<TruthTable> {
    assert!(nr_vars <= 3, "class enumeration sweeps all 2^2^n functions");
    let mut reps = std::collections::BTreeSet::new();
    for word in 0..(1u64 << (1 << nr_vars)) {
        let tt = TruthTable::from_words(nr_vars, &[word]);
        reps.insert(canonicalize(&tt));
    }
    reps.into_iter().collect()
}
