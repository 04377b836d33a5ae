use std::collections::BTreeSet;
use std::fmt;

use texel_ir::{Instruction, ListRef, NodeId, Program};

use crate::error::Unsupported;
use crate::{Config, Error};

mod partition;

pub use partition::{BlockRange, partition};

#[cfg(test)]
mod tests;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    /// In execution order, never empty.
    /// A range after the first starts a body of the conditional that ends the range before it,
    /// or directly follows it in the same list.
    pub ranges: Vec<BlockRange>,
    pub predecessors: BTreeSet<BlockId>,
    pub successors: BTreeSet<BlockId>,
}

impl BasicBlock {
    /// The statements of this block, in program order.
    #[must_use]
    pub fn statements(&self, program: &Program) -> Vec<NodeId> {
        self.ranges.iter().flat_map(|range| range.statements(program)).collect()
    }

    fn entry(&self) -> Option<&BlockRange> {
        self.ranges.first()
    }

    fn exit(&self) -> Option<&BlockRange> {
        self.ranges.last()
    }
}

/// Basic blocks of one function, linked by control flow.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    // merged-away blocks leave a hole so that ids stay stable.
    blocks: Vec<Option<BasicBlock>>,
    /// Set by passes that rewrite the program through this graph.
    pub changed: bool,
}

impl ControlFlowGraph {
    /// Partitions `program` into basic blocks, links them and collapses straight-line chains.
    ///
    /// # Errors
    /// Loops and returns aren't supported, neither is `discard` unless the whole function is one block.
    /// Statements nested deeper than `config.max_depth` are rejected too.
    pub fn build(program: &Program, config: &Config) -> Result<Self, Error> {
        let ranges = partition(program, config.max_depth)?;

        let mut cfg = Self::from_ranges(&ranges);
        cfg.link_list(program, ListRef::Root, None)?;

        let merged = cfg.merge_chains(program);
        tracing::trace!(blocks = ranges.len(), merged, "built control flow graph");

        cfg.reject_discard(program)?;

        Ok(cfg)
    }

    /// Unlinked blocks, one per range.
    #[must_use]
    pub fn from_ranges(ranges: &[BlockRange]) -> Self {
        let blocks = ranges
            .iter()
            .enumerate()
            .map(|(idx, range)| {
                Some(BasicBlock {
                    id: BlockId(idx as u32),
                    ranges: vec![*range],
                    predecessors: BTreeSet::new(),
                    successors: BTreeSet::new(),
                })
            })
            .collect();

        Self { blocks, changed: false }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter().flatten()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks().map(|it| it.id).collect()
    }

    /// # Panics
    /// If `id` was merged into another block.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks[id.0 as usize].as_ref().expect("block was merged away")
    }

    /// # Panics
    /// If `id` was merged into another block.
    #[must_use]
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks[id.0 as usize].as_mut().expect("block was merged away")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn blocks_in(&self, list: ListRef) -> Vec<BlockId> {
        self.blocks()
            .filter(|it| it.entry().is_some_and(|range| range.list == list))
            .map(|it| it.id)
            .collect()
    }

    fn link(&mut self, from: BlockId, to: BlockId) {
        self.block_mut(from).successors.insert(to);
        self.block_mut(to).predecessors.insert(from);
    }

    /// Links the blocks of `list`, `after` is where control goes once the list is done.
    fn link_list(&mut self, program: &Program, list: ListRef, after: Option<BlockId>) -> Result<(), Error> {
        let ids = self.blocks_in(list);

        for (idx, &id) in ids.iter().enumerate() {
            let next = ids.get(idx + 1).copied().or(after);
            let Some(last) = self.block(id).exit().map(|range| range.last) else { continue };

            match program.node(last) {
                Instruction::If { .. } => {
                    let then_blocks = self.blocks_in(ListRef::Then(last));
                    let else_blocks = self.blocks_in(ListRef::Else(last));

                    match (then_blocks.first(), else_blocks.first()) {
                        (Some(&then_block), Some(&else_block)) => {
                            self.link(id, then_block);
                            self.link(id, else_block);
                        }

                        // the missing branch falls through to whatever follows the conditional.
                        (Some(&branch), None) | (None, Some(&branch)) => {
                            self.link(id, branch);
                            if let Some(next) = next {
                                self.link(id, next);
                            }
                        }

                        (None, None) => {
                            if let Some(next) = next {
                                self.link(id, next);
                            }
                        }
                    }

                    self.link_list(program, ListRef::Then(last), next)?;
                    self.link_list(program, ListRef::Else(last), next)?;
                }

                Instruction::Call(_) => {
                    if let Some(next) = next {
                        self.link(id, next);
                    }
                }

                Instruction::Loop { .. } => {
                    return Err(Error::UnsupportedControlFlow(Unsupported::Loop(last)));
                }

                Instruction::Return { .. } => {
                    return Err(Error::UnsupportedControlFlow(Unsupported::Return(last)));
                }

                // a list's last block flows into the list's continuation, other blocks never end here.
                _ => {
                    if idx + 1 == ids.len() {
                        if let Some(after) = after {
                            self.link(id, after);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Whether `block` starts right where `pred` ends, either next in the same list
    /// or at the top of a body of the conditional ending `pred`.
    fn follows(program: &Program, pred: &BasicBlock, block: &BasicBlock) -> bool {
        let (Some(exit), Some(entry)) = (pred.exit(), block.entry()) else { return false };

        if exit.list == entry.list {
            let last = program.position(exit.list, exit.last);
            let first = program.position(entry.list, entry.first);
            return matches!((last, first), (Some(last), Some(first)) if last + 1 == first);
        }

        let opens_body = program.list(entry.list).first() == Some(&entry.first);
        opens_body && program.nested_lists(exit.last).contains(&entry.list)
    }

    fn merge_candidate(&self, program: &Program) -> Option<(BlockId, BlockId)> {
        self.blocks().find_map(|block| {
            let mut preds = block.predecessors.iter();
            let (Some(&pred), None) = (preds.next(), preds.next()) else { return None };

            let pred = self.block(pred);
            let single_successor = pred.successors.len() == 1 && pred.successors.contains(&block.id);

            let mergeable = pred.id != block.id && single_successor && Self::follows(program, pred, block);
            mergeable.then_some((pred.id, block.id))
        })
    }

    /// Absorbs blocks with a single predecessor into that predecessor when it has no other successor.
    /// Repeats until nothing changes, returns how many blocks were absorbed.
    ///
    /// A conditional with one body and nothing after it takes that body into its block.
    pub fn merge_chains(&mut self, program: &Program) -> usize {
        let mut merged = 0;

        while let Some((pred, block)) = self.merge_candidate(program) {
            let Some(absorbed) = self.blocks[block.0 as usize].take() else { break };

            for &succ in &absorbed.successors {
                let succ = self.block_mut(succ);
                succ.predecessors.remove(&absorbed.id);
                succ.predecessors.insert(pred);
            }

            let pred = self.block_mut(pred);
            let mut ranges = absorbed.ranges.into_iter().peekable();
            if let Some(exit) = pred.ranges.last_mut() {
                if let Some(entry) = ranges.next_if(|entry| entry.list == exit.list) {
                    exit.last = entry.last;
                }
            }
            pred.ranges.extend(ranges);
            pred.successors = absorbed.successors;

            tracing::trace!(into = %pred.id, from = %absorbed.id, "merged blocks");
            merged += 1;
        }

        merged
    }

    fn reject_discard(&self, program: &Program) -> Result<(), Error> {
        if self.len() <= 1 {
            return Ok(());
        }

        for block in self.blocks() {
            for statement in block.statements(program) {
                if let Instruction::Discard { .. } = program.node(statement) {
                    return Err(Error::UnsupportedControlFlow(Unsupported::DiscardAcrossBlocks(statement)));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn display<'a>(&'a self, program: &'a Program) -> CfgDisplay<'a> {
        CfgDisplay { cfg: self, program }
    }
}

pub struct CfgDisplay<'a> {
    cfg: &'a ControlFlowGraph,
    program: &'a Program,
}

fn write_ids(f: &mut fmt::Formatter<'_>, ids: &BTreeSet<BlockId>) -> fmt::Result {
    f.write_str("[")?;
    for (idx, id) in ids.iter().enumerate() {
        if idx != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{id}")?;
    }
    f.write_str("]")
}

fn write_range(f: &mut fmt::Formatter<'_>, program: &Program, range: &BlockRange) -> fmt::Result {
    match range.list {
        ListRef::Root => f.write_str("root")?,
        ListRef::Then(owner) => write!(f, "then {owner}")?,
        ListRef::Else(owner) => write!(f, "else {owner}")?,
        ListRef::Loop(owner) => write!(f, "loop {owner}")?,
    }

    match (program.position(range.list, range.first), program.position(range.list, range.last)) {
        (Some(start), Some(end)) => write!(f, " {start}..={end}"),
        _ => f.write_str(" ?"),
    }
}

impl fmt::Display for CfgDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, block) in self.cfg.blocks().enumerate() {
            if idx != 0 {
                f.write_str("\n")?;
            }

            write!(f, "{}", block.id)?;
            for (idx, range) in block.ranges.iter().enumerate() {
                f.write_str(if idx == 0 { " " } else { ", " })?;
                write_range(f, self.program, range)?;
            }
            f.write_str(" <- ")?;

            write_ids(f, &block.predecessors)?;
            f.write_str(" -> ")?;
            write_ids(f, &block.successors)?;
        }

        Ok(())
    }
}
