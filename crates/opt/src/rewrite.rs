use fnv::FnvHashMap;
use texel_ir::instruction::{Call, ParamMode};
use texel_ir::{Instruction, NodeId, Program, VarId};

use crate::cfg::{BlockId, BlockRange, ControlFlowGraph};
use crate::value_numbering::{BlockNumbering, ValueNumber};
use crate::{Config, Error};

struct Rewriter<'a> {
    program: &'a mut Program,
    limit: u32,
    /// occurrences of a value number computed more than once.
    targets: FnvHashMap<NodeId, ValueNumber>,
    temps: FnvHashMap<ValueNumber, VarId>,

    /// the part of the block being rewritten, its bounds follow inserted statements.
    range: BlockRange,
    statement: NodeId,
    cursor: usize,

    changed: bool,
}

impl Rewriter<'_> {
    fn insert_before(&mut self, node: NodeId) {
        self.program.list_mut(self.range.list).insert(self.cursor, node);
        self.cursor += 1;

        if self.range.first == self.statement {
            self.range.first = node;
        }
    }

    fn insert_after(&mut self, node: NodeId) {
        self.program.list_mut(self.range.list).insert(self.cursor + 1, node);

        if self.range.last == self.statement {
            self.range.last = node;
        }
    }

    fn replace(&mut self, node: NodeId) {
        self.program.list_mut(self.range.list)[self.cursor] = node;

        if self.range.first == self.statement {
            self.range.first = node;
        }

        if self.range.last == self.statement {
            self.range.last = node;
        }

        self.statement = node;
    }

    fn depth_check(&self, depth: u32) -> Result<(), Error> {
        match depth > self.limit {
            true => Err(Error::TooDeep { limit: self.limit }),
            false => Ok(()),
        }
    }

    fn expression(&mut self, node: NodeId, depth: u32) -> Result<NodeId, Error> {
        self.depth_check(depth)?;

        let Some(&number) = self.targets.get(&node) else {
            self.children(node, depth)?;
            return Ok(node);
        };

        if let Some(&temp) = self.temps.get(&number) {
            tracing::trace!(%node, %number, "replaced with temporary");
            self.changed = true;
            return Ok(self.program.read(temp));
        }

        self.children(node, depth)?;

        let ty = self.program.type_of(node);
        let temp = self.program.create_variable(ty);
        let assignment = self.program.create_assignment(temp, node);
        self.insert_before(assignment);

        tracing::trace!(%node, %number, before = %self.statement, "materialized temporary");
        self.temps.insert(number, temp);
        self.changed = true;

        Ok(self.program.read(temp))
    }

    fn children(&mut self, node: NodeId, depth: u32) -> Result<(), Error> {
        let children = self.program.node(node).children();

        let mut rewritten = Vec::with_capacity(children.len());
        for child in children {
            rewritten.push(self.expression(child, depth + 1)?);
        }

        for (slot, new) in self.program.node_mut(node).children_mut().into_iter().zip(rewritten) {
            *slot = new;
        }

        Ok(())
    }

    /// Rewrites the rvalues (array indices) inside an lvalue, the lvalue itself stays.
    fn lvalue(&mut self, node: NodeId, depth: u32) -> Result<(), Error> {
        self.depth_check(depth)?;

        match *self.program.node(node) {
            Instruction::DerefArray { array, index } => {
                let new = self.expression(index, depth + 1)?;
                if let Instruction::DerefArray { index, .. } = self.program.node_mut(node) {
                    *index = new;
                }

                self.lvalue(array, depth + 1)
            }

            Instruction::DerefRecord { record, .. } => self.lvalue(record, depth + 1),

            _ => Ok(()),
        }
    }

    fn call(&mut self, mut call: Call) -> Result<(), Error> {
        let statement = self.statement;

        if let Some(&number) = self.targets.get(&statement) {
            return self.merge_call(call, number);
        }

        let modes: Vec<_> = self.program.signature(call.callee).params.iter().map(|it| it.mode).collect();
        for (arg, mode) in call.args.iter_mut().zip(modes) {
            match mode {
                ParamMode::In => *arg = self.expression(*arg, 1)?,
                ParamMode::Out | ParamMode::InOut => self.lvalue(*arg, 1)?,
            }
        }

        if let Some(result) = call.result {
            self.lvalue(result, 1)?;
        }

        *self.program.node_mut(statement) = Instruction::Call(call);
        Ok(())
    }

    /// Calls that are repeated: the first one stores its result in a temporary, the others are
    /// replaced by a copy of it.
    fn merge_call(&mut self, mut call: Call, number: ValueNumber) -> Result<(), Error> {
        let statement = self.statement;

        let Some(result) = call.result else {
            debug_assert!(false, "resultless call {statement} was counted as an occurrence");
            return Ok(());
        };

        if let Some(&temp) = self.temps.get(&number) {
            self.lvalue(result, 1)?;

            let rhs = self.program.read(temp);
            let copy = self.program.add_node(Instruction::Assign { lhs: result, rhs, write_mask: 0 });
            self.replace(copy);

            tracing::trace!(call = %statement, %number, "removed repeated call");
            self.changed = true;
            return Ok(());
        }

        for arg in &mut call.args {
            *arg = self.expression(*arg, 1)?;
        }

        self.lvalue(result, 1)?;

        let ty = self.program.signature(call.callee).return_ty.clone();
        let temp = self.program.create_variable(ty);
        call.result = Some(self.program.read(temp));
        *self.program.node_mut(statement) = Instruction::Call(call);

        let rhs = self.program.read(temp);
        let copy = self.program.add_node(Instruction::Assign { lhs: result, rhs, write_mask: 0 });
        self.insert_after(copy);

        tracing::trace!(call = %statement, %number, "routed call result through temporary");
        self.temps.insert(number, temp);
        self.changed = true;
        Ok(())
    }

    fn rewrite_statement(&mut self) -> Result<(), Error> {
        let statement = self.statement;

        match self.program.node(statement).clone() {
            Instruction::Assign { lhs, rhs, write_mask } => {
                let rhs = self.expression(rhs, 1)?;
                self.lvalue(lhs, 0)?;
                *self.program.node_mut(statement) = Instruction::Assign { lhs, rhs, write_mask };
            }

            Instruction::Call(call) => self.call(call)?,

            Instruction::If { condition, .. } => {
                let new = self.expression(condition, 1)?;
                if let Instruction::If { condition, .. } = self.program.node_mut(statement) {
                    *condition = new;
                }
            }

            Instruction::Return { value: Some(child) } | Instruction::Discard { condition: Some(child) } => {
                let new = self.expression(child, 1)?;
                match self.program.node_mut(statement) {
                    Instruction::Return { value: Some(child) } | Instruction::Discard { condition: Some(child) } => {
                        *child = new;
                    }
                    _ => {}
                }
            }

            _ => {}
        }

        Ok(())
    }
}

/// Replaces repeated computations in `block` with a temporary holding the first one.
///
/// Only occurrences of eligible kinds whose number isn't tainted by a partial write count,
/// a number needs at least two of them to be rewritten.
///
/// # Errors
/// If expressions nest deeper than `config.max_depth`.
pub fn rewrite_block(
    program: &mut Program,
    cfg: &mut ControlFlowGraph,
    id: BlockId,
    numbering: &BlockNumbering,
    config: &Config,
) -> Result<bool, Error> {
    if numbering.is_poisoned() {
        return Ok(false);
    }

    let counts = numbering.redundancy();
    let targets: FnvHashMap<_, _> = numbering
        .occurrences()
        .iter()
        .filter(|(_, number)| counts.get(number).is_some_and(|&count| count > 1))
        .copied()
        .collect();

    if targets.is_empty() {
        return Ok(false);
    }

    let ranges = cfg.block(id).ranges.clone();
    let Some(&entry) = ranges.first() else { return Ok(false) };

    let mut rewriter = Rewriter {
        limit: config.max_depth,
        targets,
        temps: FnvHashMap::default(),
        range: entry,
        statement: entry.first,
        cursor: 0,
        changed: false,
        program,
    };

    // temporaries made in one range stay visible in the later ones, those are nested deeper.
    let mut rewritten = Vec::with_capacity(ranges.len());
    for range in ranges {
        let statements = range.statements(rewriter.program);
        rewriter.range = range;

        for statement in statements {
            let Some(cursor) = rewriter.program.position(range.list, statement) else {
                debug_assert!(false, "{statement} vanished from {id}");
                continue;
            };

            rewriter.statement = statement;
            rewriter.cursor = cursor;
            rewriter.rewrite_statement()?;
        }

        rewritten.push(rewriter.range);
    }

    tracing::debug!(block = %id, temporaries = rewriter.temps.len(), "rewrote block");

    cfg.block_mut(id).ranges = rewritten;

    cfg.changed |= rewriter.changed;
    Ok(rewriter.changed)
}
