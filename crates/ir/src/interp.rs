//! A reference interpreter, used to check that passes preserve behavior.
//!
//! Every value is a flat list of `f64` lanes. Texture samples and calls don't touch any real resources,
//! they produce values derived from their operands so that two evaluations with identical operands agree.
//! Writes to `out` parameters additionally depend on how many such calls ran before, modelling side effects.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use fnv::{FnvHashMap, FnvHasher};

use crate::instruction::{Call, Instruction, Operator, Texture};
use crate::program::VarMode;
use crate::{NodeId, Program, Type, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    Loop(NodeId),
    NotAnLvalue(NodeId),
    Malformed(NodeId),
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loop(node) => write!(f, "loops are not supported ({node})"),
            Self::NotAnLvalue(node) => write!(f, "{node} is not an lvalue"),
            Self::Malformed(node) => write!(f, "{node} is malformed"),
        }
    }
}

impl std::error::Error for InterpError {}

/// Observable effects of one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Trace {
    /// Every value assigned to each non-temporary variable, in order.
    pub assignments: BTreeMap<VarId, Vec<Vec<f64>>>,
    pub texture_samples: usize,
    pub calls: usize,
    pub discarded: bool,
}

/// Initial values for variables, anything not listed gets a value derived from its id.
pub type Inputs = FnvHashMap<VarId, Vec<f64>>;

enum Flow {
    Continue,
    Stop,
}

struct Interpreter<'a> {
    program: &'a Program,
    values: Vec<Vec<f64>>,
    /// Calls with side effects so far.
    sequence: usize,
    trace: Trace,
}

fn hashed_lanes(seed: impl Hash, len: usize) -> Vec<f64> {
    let mut hasher = FnvHasher::default();
    seed.hash(&mut hasher);
    let mut state = hasher.finish();

    (0..len)
        .map(|_| {
            state = state.wrapping_mul(0x5851_f42d_4c95_7f2d).wrapping_add(0x1405_7b7e_f767_814f);
            f64::from((state >> 48) as u16) / f64::from(u16::MAX)
        })
        .collect()
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|it| it.to_bits()).collect()
}

fn lane(values: &[f64], idx: usize) -> f64 {
    match values {
        [single] => *single,
        values => values.get(idx).copied().unwrap_or(0.0),
    }
}

fn truth(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn apply(op: Operator, args: &[Vec<f64>]) -> Vec<f64> {
    let width = args.iter().map(Vec::len).max().unwrap_or(0);

    if op == Operator::Dot {
        return vec![(0..width).map(|idx| lane(&args[0], idx) * lane(&args[1], idx)).sum()];
    }

    (0..width)
        .map(|idx| {
            let a = lane(&args[0], idx);
            let b = || lane(&args[1], idx);
            let c = || lane(&args[2], idx);

            match op {
                Operator::Neg => -a,
                Operator::Not => truth(a == 0.0),
                Operator::Abs => a.abs(),
                Operator::Sqrt => a.sqrt(),
                Operator::Rsq => a.sqrt().recip(),
                Operator::Rcp => a.recip(),
                Operator::Floor => a.floor(),
                Operator::Fract => a - a.floor(),
                Operator::Saturate => a.clamp(0.0, 1.0),
                Operator::Sin => a.sin(),
                Operator::Cos => a.cos(),
                Operator::Exp2 => a.exp2(),
                Operator::Log2 => a.log2(),
                Operator::Add => a + b(),
                Operator::Sub => a - b(),
                Operator::Mul => a * b(),
                Operator::Div => a / b(),
                Operator::Min => a.min(b()),
                Operator::Max => a.max(b()),
                Operator::Pow => a.powf(b()),
                Operator::Lt => truth(a < b()),
                Operator::Gt => truth(a > b()),
                Operator::Le => truth(a <= b()),
                Operator::Ge => truth(a >= b()),
                Operator::Eq => truth(a == b()),
                Operator::Ne => truth(a != b()),
                Operator::And => truth(a != 0.0 && b() != 0.0),
                Operator::Or => truth(a != 0.0 || b() != 0.0),
                Operator::Lerp => a + (b() - a) * c(),
                Operator::Clamp => a.max(b()).min(c()),
                Operator::Select => match a != 0.0 {
                    true => b(),
                    false => c(),
                },
                Operator::Dot => unreachable!(),
            }
        })
        .collect()
}

impl Interpreter<'_> {
    fn list(&mut self, statements: &[NodeId]) -> Result<Flow, InterpError> {
        for &statement in statements {
            if let Flow::Stop = self.statement(statement)? {
                return Ok(Flow::Stop);
            }
        }

        Ok(Flow::Continue)
    }

    fn statement(&mut self, node: NodeId) -> Result<Flow, InterpError> {
        let program = self.program;

        match program.node(node) {
            Instruction::Assign { lhs, rhs, write_mask } => {
                let value = self.expression(*rhs)?;
                self.store(*lhs, &value, *write_mask)?;
            }
            Instruction::Call(call) => self.call(call)?,
            Instruction::If { condition, then_body, else_body } => {
                let condition = self.expression(*condition)?;
                let body = if lane(&condition, 0) != 0.0 { then_body } else { else_body };
                return self.list(body);
            }
            Instruction::Loop { .. } => return Err(InterpError::Loop(node)),
            Instruction::Return { value } => {
                if let Some(value) = value {
                    self.expression(*value)?;
                }
                return Ok(Flow::Stop);
            }
            Instruction::Discard { condition } => {
                let discard = match condition {
                    Some(condition) => lane(&self.expression(*condition)?, 0) != 0.0,
                    None => true,
                };

                if discard {
                    self.trace.discarded = true;
                    return Ok(Flow::Stop);
                }
            }
            _ => return Err(InterpError::Malformed(node)),
        }

        Ok(Flow::Continue)
    }

    fn call(&mut self, call: &Call) -> Result<(), InterpError> {
        let signature = self.program.signature(call.callee);

        let mut inputs = Vec::with_capacity(call.args.len());
        for (param, &arg) in signature.params.iter().zip(&call.args) {
            if param.mode == crate::instruction::ParamMode::Out {
                continue;
            }
            inputs.push(bits(&self.expression(arg)?));
        }

        self.trace.calls += 1;

        let has_side_effects = !signature.is_pure_in();
        let sequence = self.sequence;
        if has_side_effects {
            self.sequence += 1;
        }

        for (idx, (param, &arg)) in signature.params.iter().zip(&call.args).enumerate() {
            if param.mode.writes() {
                let value = hashed_lanes((call.callee, &inputs, idx, sequence), param.ty.flat_len());
                self.store(arg, &value, 0)?;
            }
        }

        if let Some(result) = call.result {
            let len = signature.return_ty.flat_len();
            let value = match has_side_effects {
                true => hashed_lanes((call.callee, &inputs, sequence), len),
                false => hashed_lanes((call.callee, &inputs), len),
            };
            self.store(result, &value, 0)?;
        }

        Ok(())
    }

    /// Resolves an lvalue to its root variable and the lane range it covers.
    fn place(&mut self, node: NodeId) -> Result<(VarId, usize, Type), InterpError> {
        let program = self.program;

        match program.node(node) {
            Instruction::Variable(var) => Ok((*var, 0, program.variable(*var).ty.clone())),
            Instruction::DerefArray { array, index } => {
                let (var, offset, ty) = self.place(*array)?;
                let index = lane(&self.expression(*index)?, 0);
                let element = ty.element().ok_or(InterpError::Malformed(node))?;

                let len = match &ty {
                    Type::Array { len, .. } => *len as usize,
                    ty => usize::from(ty.lanes()),
                };
                let index = (index.max(0.0) as usize).min(len.saturating_sub(1));

                let stride = element.flat_len();
                Ok((var, offset + index * stride, element))
            }
            Instruction::DerefRecord { record, field } => {
                let (var, offset, ty) = self.place(*record)?;
                let Type::Record { fields, .. } = &ty else { return Err(InterpError::Malformed(node)) };

                let field = *field as usize;
                let skip: usize = fields.iter().take(field).map(|it| it.ty.flat_len()).sum();
                let field_ty = fields.get(field).ok_or(InterpError::Malformed(node))?.ty.clone();
                Ok((var, offset + skip, field_ty))
            }
            _ => Err(InterpError::NotAnLvalue(node)),
        }
    }

    fn store(&mut self, lhs: NodeId, value: &[f64], write_mask: u8) -> Result<(), InterpError> {
        let (var, offset, ty) = self.place(lhs)?;
        let slot = &mut self.values[var.index()];

        let len = ty.flat_len();
        let mut next = 0;
        for idx in 0..len {
            if write_mask != 0 && write_mask & (1 << idx) == 0 {
                continue;
            }

            // masked writes take their lanes either positionally or packed.
            let src = match value.len() == len {
                true => value[idx],
                false => lane(value, next),
            };
            next += 1;

            if let Some(dest) = slot.get_mut(offset + idx) {
                *dest = src;
            }
        }

        if self.program.variable(var).mode != VarMode::Temporary {
            let snapshot = self.values[var.index()].clone();
            self.trace.assignments.entry(var).or_default().push(snapshot);
        }

        Ok(())
    }

    fn expression(&mut self, node: NodeId) -> Result<Vec<f64>, InterpError> {
        let program = self.program;

        let value = match program.node(node) {
            Instruction::Constant(it) => it.lanes.iter().map(|it| it.to_f64()).collect(),
            Instruction::Variable(var) => self.values[var.index()].clone(),
            Instruction::DerefArray { .. } | Instruction::DerefRecord { .. } => {
                let (var, offset, ty) = self.place(node)?;
                let values = &self.values[var.index()];
                values.get(offset..offset + ty.flat_len()).ok_or(InterpError::Malformed(node))?.to_vec()
            }
            Instruction::Swizzle { value, mask } => {
                let value = self.expression(*value)?;
                mask.components().iter().map(|&it| lane(&value, usize::from(it))).collect()
            }
            Instruction::Expression { op, operands, ty } => {
                let args = operands.iter().map(|&it| self.expression(it)).collect::<Result<Vec<_>, _>>()?;
                if args.len() != op.arity() {
                    return Err(InterpError::Malformed(node));
                }

                let mut value = apply(*op, &args);
                value.resize(ty.flat_len().max(1), 0.0);
                value
            }
            Instruction::Texture(texture) => self.texture(texture)?,
            _ => return Err(InterpError::Malformed(node)),
        };

        Ok(value)
    }

    fn texture(&mut self, texture: &Texture) -> Result<Vec<f64>, InterpError> {
        let mut operands = Vec::new();
        let mut nodes = Vec::new();
        texture.visit_operands(|it| nodes.push(it));
        for node in nodes {
            operands.push(bits(&self.expression(node)?));
        }

        self.trace.texture_samples += 1;

        let seed = (texture.op as u8, texture.channel, operands);
        Ok(hashed_lanes(seed, texture.ty.flat_len()))
    }
}

/// Runs `program` from the top of its root list.
///
/// # Errors
/// If the program contains a loop or is malformed.
pub fn run(program: &Program, inputs: &Inputs) -> Result<Trace, InterpError> {
    let values = (0..program.variable_count())
        .map(|idx| {
            let var = VarId(idx as u32);
            match inputs.get(&var) {
                Some(value) => value.clone(),
                None => hashed_lanes(("input", idx), program.variable(var).ty.flat_len()),
            }
        })
        .collect();

    let mut interpreter = Interpreter { program, values, sequence: 0, trace: Trace::default() };
    interpreter.list(&program.body)?;

    Ok(interpreter.trace)
}
