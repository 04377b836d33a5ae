use texel_ir::Program;

use crate::cfg::ControlFlowGraph;
use crate::rewrite::rewrite_block;
use crate::value_numbering::number_block;
use crate::{Config, Error};

/// Local common subexpression elimination.
///
/// Every basic block is numbered on its own and repeated computations of the eligible kinds
/// are replaced by a temporary, nothing is shared between blocks.
///
/// Returns whether the program changed.
///
/// # Errors
/// - [`Error::UnsupportedControlFlow`] if the function has loops, returns, or a `discard`
///   alongside other control flow. The program is left untouched.
/// - [`Error::TooDeep`] if statements or expressions nest deeper than `config.max_depth`,
///   this is also reported to the program.
pub fn run(program: &mut Program, config: &Config) -> Result<bool, Error> {
    let _span = tracing::debug_span!("local_cse").entered();

    match run_inner(program, config) {
        Err(err @ Error::TooDeep { .. }) => {
            program.report_error(err.to_string());
            Err(err)
        }
        res => res,
    }
}

fn run_inner(program: &mut Program, config: &Config) -> Result<bool, Error> {
    let mut cfg = ControlFlowGraph::build(program, config)?;

    let numberings = cfg
        .ids()
        .into_iter()
        .map(|id| -> Result<_, Error> {
            let statements = cfg.block(id).statements(program);
            let numbering = number_block(program, &statements, config)?;

            tracing::debug!(
                block = %id,
                statements = statements.len(),
                numbers = numbering.allocated(),
                occurrences = numbering.occurrences().len(),
                "numbered block"
            );

            Ok((id, numbering))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (id, numbering) in numberings {
        rewrite_block(program, &mut cfg, id, &numbering, config)?;
    }

    Ok(cfg.changed)
}
