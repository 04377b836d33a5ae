use core::fmt;

use texel_ir::Program;

use crate::{Config, Error};

pub trait InplacePass {
    /// Returns whether the program changed.
    fn run(&self, program: &mut Program) -> bool;
}

impl<F> InplacePass for F
where
    F: Fn(&mut Program) -> bool,
{
    fn run(&self, program: &mut Program) -> bool {
        self(program)
    }
}

pub enum Pass {
    Inplace(Box<dyn InplacePass>),
    LocalCse(Config),
    /// Only `max_depth` applies.
    HoistSubexpressions(Config),
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inplace(_) => f.debug_tuple("Inplace").finish_non_exhaustive(),
            Self::LocalCse(config) => f.debug_tuple("LocalCse").field(config).finish(),
            Self::HoistSubexpressions(config) => f.debug_tuple("HoistSubexpressions").field(config).finish(),
        }
    }
}

#[derive(Default, Debug)]
pub struct PassManager {
    pub passes: Vec<Pass>,
}

impl PassManager {
    #[must_use]
    pub fn unoptimized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_passes(passes: Vec<Pass>) -> Self {
        Self { passes }
    }

    #[must_use]
    pub fn optimized() -> Self {
        Self { passes: vec![Pass::LocalCse(Config::default())] }
    }

    /// Runs the passes again as long as any of them changes something, at most `limit` times.
    ///
    /// Returns how many rounds ran.
    pub fn run_to_fixpoint(&self, program: &mut Program, limit: usize) -> usize {
        for round in 0..limit {
            if !self.run(program) {
                return round + 1;
            }
        }

        limit
    }
}

fn skip_on_error(pass: &str, res: Result<bool, Error>) -> bool {
    match res {
        Ok(changed) => changed,
        Err(err @ Error::UnsupportedControlFlow(_)) => {
            tracing::debug!(pass, %err, "skipped pass");
            false
        }
        // already reported to the program.
        Err(err @ Error::TooDeep { .. }) => {
            tracing::warn!(pass, %err, "pass failed");
            false
        }
    }
}

impl InplacePass for PassManager {
    fn run(&self, program: &mut Program) -> bool {
        let mut changed = false;

        for pass in &self.passes {
            changed |= match pass {
                Pass::Inplace(p) => p.run(program),
                Pass::LocalCse(config) => skip_on_error("local_cse", super::local_cse(program, config)),
                Pass::HoistSubexpressions(config) => {
                    skip_on_error("hoist_subexpressions", super::hoist_subexpressions(program, config.max_depth))
                }
            };
        }

        changed
    }
}
