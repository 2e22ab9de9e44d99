// SPDX-License-Identifier: Apache-2.0

//! Synthesis specifications: the target function, primitive family and
//! auxiliary sources, plus everything `preprocess` derives from them.

use crate::chain::Chain;
use crate::fence::Fence;
use crate::layout::{StepLayout, MAX_NODES};
use crate::synth::SynthError;
use crate::tt::TruthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Two-input AND gates with free input/output inversions.
    Aig,
    /// Ternary majority gates, no inversions.
    Maj,
}

impl Primitive {
    pub fn fanin_arity(self) -> usize {
        match self {
            Primitive::Aig => 2,
            Primitive::Maj => 3,
        }
    }
}

/// Counters filled in by the drivers; read by tests and logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthStats {
    pub fences_tried: usize,
    pub dags_tried: usize,
    pub sat_calls: usize,
    pub minterms_added: usize,
}

#[derive(Debug, Clone)]
pub struct Spec {
    nr_in: usize,
    /// Trial step count; mutated only by the drivers.
    pub nr_steps: usize,
    primitive: Primitive,
    targets: Vec<TruthTable>,
    aux: Vec<TruthTable>,

    // Filled in by preprocess.
    out_inv: bool,
    norm: TruthTable,
    trivial: Option<u32>,
    initial_steps: usize,
    symmetric: bool,
    self_dual: bool,

    pub stats: SynthStats,
}

impl Spec {
    pub fn new(target: TruthTable, primitive: Primitive) -> Self {
        let nr_in = target.nr_vars();
        let norm = target.clone();
        Self {
            nr_in,
            nr_steps: 0,
            primitive,
            targets: vec![target],
            aux: Vec::new(),
            out_inv: false,
            norm,
            trivial: None,
            initial_steps: 1,
            symmetric: false,
            self_dual: false,
            stats: SynthStats::default(),
        }
    }

    /// Multi-output entry point; the encoder core is single-output, so
    /// anything but exactly one target is rejected.
    pub fn with_targets(
        targets: Vec<TruthTable>,
        primitive: Primitive,
    ) -> Result<Self, SynthError> {
        match <[TruthTable; 1]>::try_from(targets) {
            Ok([target]) => Ok(Self::new(target, primitive)),
            Err(targets) if targets.is_empty() => {
                Err(SynthError::InvalidSpec("no target functions".into()))
            }
            Err(_) => Err(SynthError::InvalidSpec(
                "multiple output functions are not supported".into(),
            )),
        }
    }

    /// Registers a pre-existing function that steps may use as a fanin
    /// source. Auxiliary functions must be normal and match the target
    /// width.
    pub fn add_function(&mut self, tt: TruthTable) -> Result<(), SynthError> {
        if tt.nr_vars() != self.nr_in {
            return Err(SynthError::InvalidSpec(format!(
                "auxiliary function has {} inputs, target has {}",
                tt.nr_vars(),
                self.nr_in
            )));
        }
        if tt.get_bit(0) {
            return Err(SynthError::InvalidSpec(
                "auxiliary functions must be normal".into(),
            ));
        }
        self.aux.push(tt);
        Ok(())
    }

    pub fn nr_in(&self) -> usize {
        self.nr_in
    }

    pub fn nr_out(&self) -> usize {
        self.targets.len()
    }

    /// Primary inputs plus auxiliary functions: the level-0 sources.
    pub fn nr_sources(&self) -> usize {
        self.nr_in + self.aux.len()
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn target(&self) -> &TruthTable {
        &self.targets[0]
    }

    pub fn aux(&self) -> &[TruthTable] {
        &self.aux
    }

    /// The normalized target the encoder works against.
    pub fn norm_target(&self) -> &TruthTable {
        &self.norm
    }

    pub fn out_inv(&self) -> bool {
        self.out_inv
    }

    pub fn initial_steps(&self) -> usize {
        self.initial_steps
    }

    /// First-step canonical wiring is sound only for totally symmetric
    /// targets with no auxiliary sources to break the symmetry.
    pub fn pin_first_step(&self) -> bool {
        self.primitive == Primitive::Maj && self.symmetric && self.aux.is_empty()
    }

    /// Whether the discriminating-minterm scan may restrict itself to
    /// weight-balanced minterms. Majority chains are monotone, so agreement
    /// on the balanced weights pins the whole function; non-monotone
    /// primitives must scan every minterm.
    pub fn balanced_sim(&self) -> bool {
        self.primitive == Primitive::Maj && self.symmetric && self.self_dual
    }

    /// The slot-domain layout for the current `nr_steps`; `None` selects the
    /// flat (fence-free) layout.
    pub fn layout_for(&self, fence: Option<&Fence>) -> StepLayout {
        let arity = self.primitive.fanin_arity();
        match fence {
            Some(f) => {
                StepLayout::with_fence(self.nr_sources(), f, arity, self.pin_first_step())
            }
            None => StepLayout::flat(
                self.nr_sources(),
                self.nr_steps,
                arity,
                self.pin_first_step(),
            ),
        }
    }

    /// Validates the specification and resolves targets that need no steps.
    pub fn preprocess(&mut self) -> Result<(), SynthError> {
        self.stats = SynthStats::default();
        let target = self.targets[0].clone();

        match self.primitive {
            Primitive::Aig => {
                self.out_inv = target.get_bit(0);
                self.norm = if self.out_inv { target.not() } else { target };
            }
            Primitive::Maj => {
                if target.get_bit(0) {
                    // Majority gates preserve normality; a non-normal target
                    // has no chain at any size.
                    return Err(SynthError::Unrealizable);
                }
                self.norm = target;
            }
        }

        self.trivial = self.find_trivial();
        self.symmetric = self.norm.is_symmetric();
        self.self_dual = self.norm.is_self_dual();
        self.initial_steps = 1;

        if self.trivial.is_some() {
            return Ok(());
        }

        if self.nr_sources() + 1 > MAX_NODES {
            return Err(SynthError::InvalidSpec(format!(
                "{} sources exceed the {}-node capacity",
                self.nr_sources(),
                MAX_NODES
            )));
        }

        if self.primitive == Primitive::Maj {
            if self.nr_sources() < 3 {
                return Err(SynthError::InvalidSpec(
                    "majority synthesis needs at least three sources".into(),
                ));
            }
            // Without inverters or constants the majority clone is exactly
            // the monotone self-dual functions; anything else would keep the
            // enumerator running forever.
            if self.aux.is_empty() && !(self.norm.is_monotone() && self.self_dual) {
                return Err(SynthError::Unrealizable);
            }
        }

        Ok(())
    }

    fn find_trivial(&self) -> Option<u32> {
        let inv = self.out_inv as u32;
        if self.norm.is_zero() {
            return Some(inv);
        }
        for j in 0..self.nr_in {
            if self.norm == TruthTable::nth_var(self.nr_in, j) {
                return Some((((j + 1) << 1) as u32) | inv);
            }
        }
        for (a, tt) in self.aux.iter().enumerate() {
            if self.norm == *tt {
                return Some((((self.nr_in + a + 1) << 1) as u32) | inv);
            }
        }
        None
    }

    /// The zero-step chain for trivially resolved targets.
    pub fn trivial_chain(&self) -> Option<Chain> {
        self.trivial.map(|lit| {
            let mut chain = Chain::new(self.nr_in, self.aux.clone());
            chain.set_output(lit);
            chain
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aig_normalization_and_constants() {
        let mut spec = Spec::new(TruthTable::zero(2), Primitive::Aig);
        spec.preprocess().unwrap();
        let chain = spec.trivial_chain().expect("constant is trivial");
        assert_eq!(chain.nr_steps(), 0);
        assert!(chain.simulate()[0].is_zero());

        let mut spec = Spec::new(TruthTable::zero(2).not(), Primitive::Aig);
        spec.preprocess().unwrap();
        assert!(spec.out_inv());
        let chain = spec.trivial_chain().unwrap();
        assert_eq!(chain.simulate()[0], TruthTable::zero(2).not());
    }

    #[test]
    fn test_projections_are_trivial() {
        for j in 0..3 {
            let v = TruthTable::nth_var(3, j);
            for tt in [v.clone(), v.not()] {
                let mut spec = Spec::new(tt.clone(), Primitive::Aig);
                spec.preprocess().unwrap();
                let chain = spec.trivial_chain().expect("projection is trivial");
                assert_eq!(chain.nr_steps(), 0);
                assert_eq!(chain.simulate()[0], tt);
            }
        }
    }

    #[test]
    fn test_aux_width_and_normality_validation() {
        let a = TruthTable::nth_var(3, 0);
        let mut spec = Spec::new(a.clone(), Primitive::Aig);
        assert!(matches!(
            spec.add_function(TruthTable::nth_var(2, 0)),
            Err(SynthError::InvalidSpec(_))
        ));
        assert!(matches!(
            spec.add_function(a.not()),
            Err(SynthError::InvalidSpec(_))
        ));
        spec.add_function(a.and(&TruthTable::nth_var(3, 1))).unwrap();
    }

    #[test]
    fn test_maj_rejects_unrealizable_targets() {
        // Non-normal.
        let mut spec = Spec::new(TruthTable::zero(3).not(), Primitive::Maj);
        assert!(matches!(spec.preprocess(), Err(SynthError::Unrealizable)));

        // Normal but not self-dual.
        let and3 = TruthTable::nth_var(3, 0)
            .and(&TruthTable::nth_var(3, 1))
            .and(&TruthTable::nth_var(3, 2));
        let mut spec = Spec::new(and3, Primitive::Maj);
        assert!(matches!(spec.preprocess(), Err(SynthError::Unrealizable)));

        // Majority itself passes and pins the first step.
        let mut spec = Spec::new(TruthTable::majority(3), Primitive::Maj);
        spec.preprocess().unwrap();
        assert!(spec.pin_first_step());
        assert!(spec.balanced_sim());
    }

    #[test]
    fn test_with_targets_arity_validation() {
        assert!(matches!(
            Spec::with_targets(vec![], Primitive::Aig),
            Err(SynthError::InvalidSpec(_))
        ));
        let t = TruthTable::majority(3);
        assert!(matches!(
            Spec::with_targets(vec![t.clone(), t.clone()], Primitive::Aig),
            Err(SynthError::InvalidSpec(_))
        ));
        assert!(Spec::with_targets(vec![t], Primitive::Aig).is_ok());
    }
}
