use texel_ir::{Instruction, ListRef, NodeId, Program};

use crate::Error;

/// A maximal straight-line run of statements `first..=last` in one statement list.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BlockRange {
    pub list: ListRef,
    pub first: NodeId,
    pub last: NodeId,
}

impl BlockRange {
    /// Returns nothing if `first` or `last` were detached from the list.
    #[must_use]
    pub fn statements(&self, program: &Program) -> Vec<NodeId> {
        let (Some(start), Some(end)) =
            (program.position(self.list, self.first), program.position(self.list, self.last))
        else {
            debug_assert!(false, "{} and {} aren't both in {:?}", self.first, self.last, self.list);
            return Vec::new();
        };

        program.list(self.list)[start..=end].to_vec()
    }
}

struct Partitioner<'a> {
    program: &'a Program,
    limit: u32,
    ranges: Vec<BlockRange>,
}

impl Partitioner<'_> {
    fn list(&mut self, list: ListRef, depth: u32) -> Result<(), Error> {
        if depth > self.limit {
            return Err(Error::TooDeep { limit: self.limit });
        }

        let program = self.program;
        let statements = program.list(list);

        let mut leader = None;
        for &statement in statements {
            let first = *leader.get_or_insert(statement);

            match program.node(statement) {
                // control nodes end the block that evaluates their condition, their bodies follow it.
                Instruction::If { .. } | Instruction::Loop { .. } => {
                    self.ranges.push(BlockRange { list, first, last: statement });
                    leader = None;

                    for nested in program.nested_lists(statement) {
                        self.list(nested, depth + 1)?;
                    }
                }

                Instruction::Call(_) | Instruction::Return { .. } => {
                    self.ranges.push(BlockRange { list, first, last: statement });
                    leader = None;
                }

                _ => {}
            }
        }

        if let (Some(first), Some(&last)) = (leader, statements.last()) {
            self.ranges.push(BlockRange { list, first, last });
        }

        Ok(())
    }
}

/// Splits every statement list of `program` into basic block ranges.
///
/// Blocks are ordered like the program text: a block ending in a conditional is followed by
/// the blocks of its then-body, then those of its else-body, then whatever comes after it.
/// Empty lists produce no blocks.
///
/// # Errors
/// If statements nest deeper than `limit`.
pub fn partition(program: &Program, limit: u32) -> Result<Vec<BlockRange>, Error> {
    let mut partitioner = Partitioner { program, limit, ranges: Vec::new() };
    partitioner.list(ListRef::Root, 0)?;
    Ok(partitioner.ranges)
}
