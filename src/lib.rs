// SPDX-License-Identifier: Apache-2.0

//! SAT-based exact synthesis of minimum-size Boolean gate chains.
//!
//! Given a target truth table and a gate primitive family (AIG two-input
//! gates or ternary majority), the synthesizer returns a straight-line
//! program of primitive gates whose final step realizes the target, minimal
//! in the number of gates. The search reduces to a sequence of SAT queries:
//! a topology enumerator streams fences (level profiles), and a lazy
//! counterexample-guided encoder grows each fence's CNF one discriminating
//! minterm at a time.

pub mod chain;
pub mod dag;
pub mod encoder;
pub mod fence;
pub mod layout;
pub mod npn;
pub mod parallel;
pub mod solver;
pub mod spec;
pub mod synth;
pub mod tt;

pub use chain::Chain;
pub use parallel::synthesize_parallel;
pub use spec::{Primitive, Spec};
pub use synth::{synthesize, SynthError, SynthOptions, Topology};
pub use tt::TruthTable;
