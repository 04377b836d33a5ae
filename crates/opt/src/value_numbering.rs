use std::fmt;
use std::hash::Hash;

use fnv::{FnvHashMap, FnvHashSet};
use texel_ir::instruction::{Call, Lod, Operator, ParamMode, Swizzle, Texture, TextureOp};
use texel_ir::{Constant, IdAllocator, Instruction, NodeId, Program, SignatureId, VarId};

use crate::{Config, Error};


/// Identity of a value within one basic block.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct ValueNumber(u32);

impl fmt::Display for ValueNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The numbers a value is made of, oldest first.
///
/// This is a single number for anything but reads of variables whose latest writes were masked:
/// those are the masked writes layered on top of the last full write.
pub type Value = Box<[ValueNumber]>;

#[derive(Debug, PartialEq, Eq, Hash)]
struct TextureKey {
    op: TextureOp,
    channel: Option<u8>,
    /// Which optional operands are present, so that `proj: x` and `cmp: x` don't collide.
    shape: u8,
    operands: Vec<Value>,
}

fn texture_shape(texture: &Texture) -> u8 {
    let lod: u8 = match texture.lod {
        Lod::None => 0,
        Lod::Bias(_) => 1,
        Lod::Level(_) => 2,
        Lod::Grad { .. } => 3,
        Lod::Sample(_) => 4,
    };

    let present = [
        texture.coordinate,
        texture.projector,
        texture.comparator,
        texture.offset,
        texture.sampler_state,
    ]
    .iter()
    .enumerate()
    .fold(0, |acc, (idx, it)| acc | (u8::from(it.is_some()) << idx));

    present | lod << 5
}

/// Everything learned about one block.
#[derive(Debug, Default)]
pub struct BlockNumbering {
    values: FnvHashMap<NodeId, Value>,
    partial: FnvHashSet<ValueNumber>,
    /// Nodes that may be merged with others, in program order.
    occurrences: Vec<(NodeId, ValueNumber)>,
    allocated: u32,
    poisoned: bool,
}

impl BlockNumbering {
    #[must_use]
    pub fn value(&self, node: NodeId) -> Option<&[ValueNumber]> {
        self.values.get(&node).map(|it| &**it)
    }

    /// The number of a node whose value is a single number.
    #[must_use]
    pub fn number(&self, node: NodeId) -> Option<ValueNumber> {
        match self.value(node)? {
            [single] => Some(*single),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_partial(&self, number: ValueNumber) -> bool {
        self.partial.contains(&number)
    }

    #[must_use]
    pub fn occurrences(&self) -> &[(NodeId, ValueNumber)] {
        &self.occurrences
    }

    /// How many numbers were handed out.
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.allocated
    }

    /// Set when numbering hit an internal inconsistency, nothing in the block may be trusted.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Counts how often every eligible number occurs, numbers tagged as partial writes don't count.
    #[must_use]
    pub fn redundancy(&self) -> FnvHashMap<ValueNumber, u32> {
        let mut counts = FnvHashMap::default();

        for (_, number) in &self.occurrences {
            if !self.is_partial(*number) {
                *counts.entry(*number).or_insert(0) += 1;
            }
        }

        counts
    }
}

enum Fault {
    TooDeep,
    /// The tree doesn't look like the pass expects it to, this is a bug somewhere.
    Invariant(NodeId),
}

type Visit<T> = Result<T, Fault>;

fn memo<K: Hash + Eq>(
    table: &mut FnvHashMap<K, ValueNumber>,
    allocator: &mut IdAllocator<ValueNumber>,
    key: K,
) -> ValueNumber {
    *table.entry(key).or_insert_with(|| allocator.allocate())
}

struct Numberer<'a> {
    program: &'a Program,
    config: &'a Config,
    allocator: IdAllocator<ValueNumber>,

    constants: Vec<(&'a Constant, ValueNumber)>,
    /// every write to a variable, oldest first.
    history: FnvHashMap<VarId, Vec<ValueNumber>>,
    arrays: FnvHashMap<(Value, Value), ValueNumber>,
    records: FnvHashMap<(Value, u32), ValueNumber>,
    swizzles: FnvHashMap<(Value, Swizzle), ValueNumber>,
    expressions: FnvHashMap<(Operator, Vec<Value>), ValueNumber>,
    textures: FnvHashMap<TextureKey, ValueNumber>,
    calls: FnvHashMap<(SignatureId, Vec<Value>), ValueNumber>,

    out: BlockNumbering,
}

impl<'a> Numberer<'a> {
    fn new(program: &'a Program, config: &'a Config) -> Self {
        Self {
            program,
            config,
            allocator: IdAllocator::new(ValueNumber),
            constants: Vec::new(),
            history: FnvHashMap::default(),
            arrays: FnvHashMap::default(),
            records: FnvHashMap::default(),
            swizzles: FnvHashMap::default(),
            expressions: FnvHashMap::default(),
            textures: FnvHashMap::default(),
            calls: FnvHashMap::default(),
            out: BlockNumbering::default(),
        }
    }

    fn fresh(&mut self) -> ValueNumber {
        self.allocator.allocate()
    }

    fn record(&mut self, node: NodeId, number: ValueNumber) -> Value {
        if self.config.eligible.contains(self.program.node(node).kind()) {
            self.out.occurrences.push((node, number));
        }

        let value: Value = Box::new([number]);
        self.out.values.insert(node, value.clone());
        value
    }

    fn read(&mut self, var: VarId) -> Value {
        let history = self.history.entry(var).or_default();

        if history.is_empty() {
            history.push(self.allocator.allocate());
        }

        // the most recent writes, back to (and including) the last full one.
        let start = history.iter().rposition(|it| !self.out.partial.contains(it)).unwrap_or(0);

        Box::from(&history[start..])
    }

    /// Records a write of `value` to `var`.
    ///
    /// A partial write taints the numbers it stores and pushes a number of its own: which lanes
    /// (or elements) it covered isn't part of the history, so no two partial writes may look alike.
    fn write(&mut self, var: VarId, value: &[ValueNumber], partial: bool) {
        if !partial {
            self.history.entry(var).or_default().extend_from_slice(value);
            return;
        }

        self.out.partial.extend(value.iter().copied());

        let history = self.history.entry(var).or_default();

        // keeps whatever the variable held coming into the block.
        if history.is_empty() {
            history.push(self.allocator.allocate());
        }

        let layer = self.allocator.allocate();
        self.out.partial.insert(layer);
        history.push(layer);
    }

    fn depth_check(&self, depth: u32) -> Visit<()> {
        match depth > self.config.max_depth {
            true => Err(Fault::TooDeep),
            false => Ok(()),
        }
    }

    fn constant(&mut self, constant: &'a Constant) -> ValueNumber {
        if let Some((_, number)) = self.constants.iter().find(|(it, _)| *it == constant) {
            return *number;
        }

        let number = self.fresh();
        self.constants.push((constant, number));
        number
    }

    fn operands(&mut self, operands: &[NodeId], depth: u32) -> Visit<Vec<Value>> {
        operands.iter().map(|&it| self.expression(it, depth + 1)).collect()
    }

    fn expression(&mut self, node: NodeId, depth: u32) -> Visit<Value> {
        self.depth_check(depth)?;

        let program = self.program;

        let number = match program.node(node) {
            Instruction::Constant(constant) => self.constant(constant),

            Instruction::Variable(var) => {
                let value = self.read(*var);
                self.out.values.insert(node, value.clone());
                return Ok(value);
            }

            Instruction::DerefArray { array, index } => {
                let array = self.expression(*array, depth + 1)?;
                let index = self.expression(*index, depth + 1)?;
                memo(&mut self.arrays, &mut self.allocator, (array, index))
            }

            Instruction::DerefRecord { record, field } => {
                let record = self.expression(*record, depth + 1)?;
                memo(&mut self.records, &mut self.allocator, (record, *field))
            }

            Instruction::Swizzle { value, mask } => {
                let value = self.expression(*value, depth + 1)?;
                memo(&mut self.swizzles, &mut self.allocator, (value, *mask))
            }

            Instruction::Expression { op, operands, ty: _ } => {
                let operands = self.operands(operands, depth)?;
                memo(&mut self.expressions, &mut self.allocator, (*op, operands))
            }

            Instruction::Texture(texture) => {
                let mut nodes = Vec::new();
                texture.visit_operands(|it| nodes.push(it));

                let key = TextureKey {
                    op: texture.op,
                    channel: texture.channel,
                    shape: texture_shape(texture),
                    operands: self.operands(&nodes, depth)?,
                };

                memo(&mut self.textures, &mut self.allocator, key)
            }

            Instruction::Call(_)
            | Instruction::Assign { .. }
            | Instruction::If { .. }
            | Instruction::Loop { .. }
            | Instruction::Return { .. }
            | Instruction::Discard { .. } => return Err(Fault::Invariant(node)),
        };

        Ok(self.record(node, number))
    }

    /// Numbers the rvalues inside an lvalue (array indices), returns the variable it writes to.
    fn lvalue(&mut self, node: NodeId, depth: u32) -> Visit<VarId> {
        self.depth_check(depth)?;

        let program = self.program;

        match program.node(node) {
            Instruction::Variable(var) => Ok(*var),
            Instruction::DerefArray { array, index } => {
                self.expression(*index, depth + 1)?;
                self.lvalue(*array, depth + 1)
            }
            Instruction::DerefRecord { record, .. } => self.lvalue(*record, depth + 1),
            _ => Err(Fault::Invariant(node)),
        }
    }

    /// Writes `value` through the lvalue `lhs`.
    fn store(&mut self, lhs: NodeId, write_mask: u8, value: &[ValueNumber], depth: u32) -> Visit<()> {
        let var = self.lvalue(lhs, depth + 1)?;
        let partial = self.program.is_partial_write(lhs, write_mask);
        self.write(var, value, partial);
        Ok(())
    }

    fn call(&mut self, node: NodeId, call: &Call, depth: u32) -> Visit<()> {
        let program = self.program;
        let signature = program.signature(call.callee);

        if !signature.is_pure_in() {
            tracing::trace!(call = %node, callee = %signature.name, "call writes its arguments, treating it as a barrier");

            for (param, &arg) in signature.params.iter().zip(&call.args) {
                if param.mode == ParamMode::In {
                    self.expression(arg, depth + 1)?;
                }
            }

            for (param, &arg) in signature.params.iter().zip(&call.args) {
                if param.mode.writes() {
                    let fresh = self.fresh();
                    self.store(arg, 0, &[fresh], depth)?;
                }
            }

            let number = self.fresh();
            self.out.values.insert(node, Box::new([number]));

            if let Some(result) = call.result {
                let fresh = self.fresh();
                self.store(result, 0, &[fresh], depth)?;
            }

            return Ok(());
        }

        let args = self.operands(&call.args, depth)?;
        let number = memo(&mut self.calls, &mut self.allocator, (call.callee, args));

        match call.result {
            Some(result) => {
                self.record(node, number);
                self.store(result, 0, &[number], depth)?;
            }

            // nothing to route through a temporary.
            None => {
                self.out.values.insert(node, Box::new([number]));
            }
        }

        Ok(())
    }

    fn statement(&mut self, node: NodeId) -> Visit<()> {
        let program = self.program;

        match program.node(node) {
            Instruction::Assign { lhs, rhs, write_mask } => {
                let value = self.expression(*rhs, 1)?;
                self.store(*lhs, *write_mask, &value, 0)?;
            }

            Instruction::Call(call) => self.call(node, call, 0)?,

            // branch bodies are blocks of their own.
            Instruction::If { condition, .. } => {
                self.expression(*condition, 1)?;
            }

            Instruction::Return { value: child } | Instruction::Discard { condition: child } => {
                if let Some(child) = child {
                    self.expression(*child, 1)?;
                }
            }

            Instruction::Loop { .. } => {}

            _ => return Err(Fault::Invariant(node)),
        }

        Ok(())
    }
}

/// Assigns value numbers to every expression in `statements`, which must form one basic block.
///
/// # Errors
/// If expressions nest deeper than `config.max_depth`.
pub fn number_block(program: &Program, statements: &[NodeId], config: &Config) -> Result<BlockNumbering, Error> {
    let mut numberer = Numberer::new(program, config);

    for &statement in statements {
        match numberer.statement(statement) {
            Ok(()) => {}
            Err(Fault::TooDeep) => return Err(Error::TooDeep { limit: config.max_depth }),
            Err(Fault::Invariant(node)) => {
                debug_assert!(false, "malformed node {node} in statement {statement}");
                tracing::warn!(%node, %statement, "malformed node, leaving block untouched");
                numberer.out.poisoned = true;
                break;
            }
        }
    }

    let mut out = numberer.out;
    out.allocated = numberer.allocator.allocated();
    Ok(out)
}
