// SPDX-License-Identifier: Apache-2.0

//! Command-line synthesis harness.
//!
//! Exit codes: 0 on synthesis success, 1 when the search gave up (budget or
//! enumeration exhausted, unrealizable target), 2 on invalid input.

use clap::Parser;
use rayon::prelude::*;

use exsynth::{
    synthesize, synthesize_parallel, Primitive, Spec, SynthError, SynthOptions, Topology,
    TruthTable,
};

#[derive(Debug, Parser)]
#[command(name = "exsynth")]
#[command(about = "Exact SAT-based synthesis of minimum-size gate chains")]
struct Args {
    /// Target truth table: hex (`0xe8`, width infers the input count) or a
    /// decimal minterm-index word (needs --inputs).
    tt: Option<String>,

    /// Number of primary inputs; inferred from hex width when omitted.
    #[arg(long)]
    inputs: Option<usize>,

    /// Two-input AND gates with free inversions (the default).
    #[arg(long)]
    aig: bool,

    /// Ternary majority gates.
    #[arg(long)]
    maj: bool,

    /// Parallel search with N workers (0 = hardware parallelism).
    #[arg(long)]
    parallel: Option<usize>,

    /// Give up beyond this many steps.
    #[arg(long)]
    max_steps: Option<usize>,

    /// Per-call SAT conflict budget (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    conflict_budget: u64,

    /// Flat (fence-free) topology enumeration.
    #[arg(long)]
    flat: bool,

    /// Exhaustively check sequential/parallel agreement over every function
    /// of --inputs variables.
    #[arg(long)]
    full: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    std::process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    let primitive = match (args.aig, args.maj) {
        (true, true) => {
            eprintln!("--aig and --maj are mutually exclusive");
            return 2;
        }
        (_, true) => Primitive::Maj,
        _ => Primitive::Aig,
    };
    let options = SynthOptions {
        topology: if args.flat {
            Topology::Flat
        } else {
            Topology::Fences
        },
        max_steps: args.max_steps,
        conflict_budget: args.conflict_budget,
    };

    if args.full {
        return run_full(args, primitive, &options);
    }

    let Some(tt_arg) = args.tt.as_deref() else {
        eprintln!("a target truth table is required unless --full is given");
        return 2;
    };
    let target = match parse_target(tt_arg, args.inputs) {
        Ok(tt) => tt,
        Err(msg) => {
            eprintln!("{}", msg);
            return 2;
        }
    };

    let mut spec = Spec::new(target, primitive);
    let result = match args.parallel {
        Some(workers) => synthesize_parallel(&mut spec, workers, &options),
        None => synthesize(&mut spec, &options),
    };
    match result {
        Ok(chain) => {
            print!("{}", chain);
            println!(
                "{} steps, {} SAT calls, {} minterms",
                chain.nr_steps(),
                spec.stats.sat_calls,
                spec.stats.minterms_added
            );
            0
        }
        Err(e @ SynthError::InvalidSpec(_)) => {
            eprintln!("{}", e);
            2
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

fn parse_target(arg: &str, inputs: Option<usize>) -> Result<TruthTable, String> {
    if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        let nr_in = match inputs {
            Some(n) => n,
            None => {
                let bits = hex.len() * 4;
                if !bits.is_power_of_two() {
                    return Err(format!(
                        "cannot infer the input count from {} hex digits; pass --inputs",
                        hex.len()
                    ));
                }
                bits.trailing_zeros() as usize
            }
        };
        if hex.len() * 4 < (1usize << nr_in) {
            return Err(format!(
                "{} hex digits are too few for {} inputs",
                hex.len(),
                nr_in
            ));
        }
        TruthTable::from_hex(nr_in, hex)
            .ok_or_else(|| format!("invalid truth table literal {}", arg))
    } else {
        let word: u64 = arg
            .parse()
            .map_err(|_| format!("invalid truth table literal {}", arg))?;
        let nr_in =
            inputs.ok_or_else(|| "decimal truth tables need --inputs".to_string())?;
        if nr_in > 6 {
            return Err("a single decimal word covers at most 6 inputs".to_string());
        }
        if nr_in < 6 && word >> (1u64 << nr_in) != 0 {
            return Err(format!("truth table {} does not fit {} inputs", word, nr_in));
        }
        Ok(TruthTable::from_words(nr_in, &[word]))
    }
}

/// Sweeps every function of the given arity, checking that the sequential,
/// flat and parallel searches agree on step count and simulation.
fn run_full(args: &Args, primitive: Primitive, options: &SynthOptions) -> i32 {
    let nr_in = args.inputs.unwrap_or(3);
    if !(1..=3).contains(&nr_in) {
        eprintln!("--full sweeps need --inputs between 1 and 3");
        return 2;
    }
    if primitive == Primitive::Maj {
        eprintln!("--full is an AIG sweep; majority realizes too few functions");
        return 2;
    }
    let workers = args.parallel.unwrap_or(1);
    let total = 1u64 << (1 << nr_in);
    let failures: usize = (0..total)
        .into_par_iter()
        .map(|word| {
            let target = TruthTable::from_words(nr_in, &[word]);

            let mut spec = Spec::new(target.clone(), primitive);
            let seq = match synthesize(&mut spec, options) {
                Ok(chain) => chain,
                Err(e) => {
                    eprintln!("0x{}: sequential search gave up: {}", target.to_hex(), e);
                    return 1;
                }
            };

            let mut spec = Spec::new(target.clone(), primitive);
            let flat_options = SynthOptions {
                topology: Topology::Flat,
                ..*options
            };
            let flat = match synthesize(&mut spec, &flat_options) {
                Ok(chain) => chain,
                Err(e) => {
                    eprintln!("0x{}: flat search gave up: {}", target.to_hex(), e);
                    return 1;
                }
            };

            let mut spec = Spec::new(target.clone(), primitive);
            let par = match synthesize_parallel(&mut spec, workers, options) {
                Ok(chain) => chain,
                Err(e) => {
                    eprintln!("0x{}: parallel search gave up: {}", target.to_hex(), e);
                    return 1;
                }
            };

            let agree = seq.nr_steps() == flat.nr_steps()
                && seq.nr_steps() == par.nr_steps()
                && seq.simulate()[0] == target
                && flat.simulate()[0] == target
                && par.simulate()[0] == target;
            if !agree {
                eprintln!(
                    "disagreement on 0x{}: seq {} / flat {} / parallel {}",
                    target.to_hex(),
                    seq.nr_steps(),
                    flat.nr_steps(),
                    par.nr_steps()
                );
            }
            usize::from(!agree)
        })
        .sum();
    println!(
        "checked {} functions of {} inputs: {} failures",
        total, nr_in, failures
    );
    if failures == 0 {
        0
    } else {
        1
    }
}
