use texel_ir::instruction::{Call, ParamMode};
use texel_ir::{Instruction, ListRef, NodeId, Program};

use crate::Error;

#[cfg(test)]
mod tests;

struct Hoister<'a> {
    program: &'a mut Program,
    limit: u32,
    changed: bool,
}

fn is_compound(program: &Program, node: NodeId) -> bool {
    matches!(program.node(node), Instruction::Expression { operands, .. } if operands.len() > 1)
}

fn tree_fits(program: &Program, node: NodeId, depth: u32, limit: u32) -> bool {
    depth <= limit && program.node(node).children().into_iter().all(|it| tree_fits(program, it, depth + 1, limit))
}

/// Checks every depth the hoister is going to reach, so that it fails before touching anything.
fn check_depth(program: &Program, list: ListRef, depth: u32, limit: u32) -> Result<(), Error> {
    if depth > limit {
        return Err(Error::TooDeep { limit });
    }

    for &statement in program.list(list) {
        if !tree_fits(program, statement, depth, limit) {
            return Err(Error::TooDeep { limit });
        }

        for nested in program.nested_lists(statement) {
            check_depth(program, nested, depth + 1, limit)?;
        }
    }

    Ok(())
}

impl Hoister<'_> {
    fn depth_check(&self, depth: u32) -> Result<(), Error> {
        match depth > self.limit {
            true => Err(Error::TooDeep { limit: self.limit }),
            false => Ok(()),
        }
    }

    fn list(&mut self, list: ListRef, depth: u32) -> Result<(), Error> {
        self.depth_check(depth)?;

        let mut idx = 0;
        while let Some(&statement) = self.program.list(list).get(idx) {
            let mut hoisted = Vec::new();
            self.statement(statement, &mut hoisted, depth)?;

            let count = hoisted.len();
            self.program.list_mut(list).splice(idx..idx, hoisted);
            idx += count + 1;

            for nested in self.program.nested_lists(statement) {
                self.list(nested, depth + 1)?;
            }
        }

        Ok(())
    }

    fn statement(&mut self, statement: NodeId, hoisted: &mut Vec<NodeId>, depth: u32) -> Result<(), Error> {
        match self.program.node(statement).clone() {
            Instruction::Assign { lhs, rhs, write_mask } => {
                // the one place a compound expression may stay.
                let rhs = match is_compound(self.program, rhs) {
                    true => {
                        self.operands(rhs, hoisted, depth + 1)?;
                        rhs
                    }
                    false => self.use_site(rhs, hoisted, depth + 1)?,
                };

                self.lvalue(lhs, hoisted, depth + 1)?;
                *self.program.node_mut(statement) = Instruction::Assign { lhs, rhs, write_mask };
            }

            Instruction::Call(mut call) => {
                self.call(&mut call, hoisted, depth)?;
                *self.program.node_mut(statement) = Instruction::Call(call);
            }

            Instruction::If { condition, .. } => {
                let new = self.use_site(condition, hoisted, depth + 1)?;
                if let Instruction::If { condition, .. } = self.program.node_mut(statement) {
                    *condition = new;
                }
            }

            Instruction::Return { value: Some(child) } | Instruction::Discard { condition: Some(child) } => {
                let new = self.use_site(child, hoisted, depth + 1)?;
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

    fn call(&mut self, call: &mut Call, hoisted: &mut Vec<NodeId>, depth: u32) -> Result<(), Error> {
        let modes: Vec<_> = self.program.signature(call.callee).params.iter().map(|it| it.mode).collect();

        for (arg, mode) in call.args.iter_mut().zip(modes) {
            match mode {
                ParamMode::In => *arg = self.use_site(*arg, hoisted, depth + 1)?,
                ParamMode::Out | ParamMode::InOut => self.lvalue(*arg, hoisted, depth + 1)?,
            }
        }

        if let Some(result) = call.result {
            self.lvalue(result, hoisted, depth + 1)?;
        }

        Ok(())
    }

    fn lvalue(&mut self, node: NodeId, hoisted: &mut Vec<NodeId>, depth: u32) -> Result<(), Error> {
        self.depth_check(depth)?;

        match *self.program.node(node) {
            Instruction::DerefArray { array, index } => {
                let new = self.use_site(index, hoisted, depth + 1)?;
                if let Instruction::DerefArray { index, .. } = self.program.node_mut(node) {
                    *index = new;
                }

                self.lvalue(array, hoisted, depth + 1)
            }

            Instruction::DerefRecord { record, .. } => self.lvalue(record, hoisted, depth + 1),

            _ => Ok(()),
        }
    }

    fn operands(&mut self, node: NodeId, hoisted: &mut Vec<NodeId>, depth: u32) -> Result<(), Error> {
        let children = self.program.node(node).children();

        let mut rewritten = Vec::with_capacity(children.len());
        for child in children {
            rewritten.push(self.use_site(child, hoisted, depth + 1)?);
        }

        for (slot, new) in self.program.node_mut(node).children_mut().into_iter().zip(rewritten) {
            *slot = new;
        }

        Ok(())
    }

    /// Hoists everything compound out of `node`, and `node` itself if it's compound.
    fn use_site(&mut self, node: NodeId, hoisted: &mut Vec<NodeId>, depth: u32) -> Result<NodeId, Error> {
        self.depth_check(depth)?;
        self.operands(node, hoisted, depth)?;

        if !is_compound(self.program, node) {
            return Ok(node);
        }

        let ty = self.program.type_of(node);
        let temp = self.program.create_variable(ty);
        hoisted.push(self.program.create_assignment(temp, node));

        tracing::trace!(%node, "hoisted subexpression");
        self.changed = true;

        Ok(self.program.read(temp))
    }
}

/// Brings every statement of `program` into three-address form: compound expressions
/// (more than one operand) survive only as the direct right hand side of an assignment,
/// everything else is computed into a temporary first.
///
/// Returns whether anything was hoisted.
///
/// # Errors
/// If statements or expressions nest deeper than `limit`, the error is also reported to the program,
/// which is left untouched.
pub fn run(program: &mut Program, limit: u32) -> Result<bool, Error> {
    let _span = tracing::debug_span!("hoist_subexpressions").entered();

    if let Err(err) = check_depth(program, ListRef::Root, 0, limit) {
        program.report_error(err.to_string());
        return Err(err);
    }

    let mut hoister = Hoister { program, limit, changed: false };
    hoister.list(ListRef::Root, 0)?;

    Ok(hoister.changed)
}
