use std::fmt;

use crate::ty::{Constant, Type};
use crate::{NodeId, SignatureId, VarId};

mod texture;

pub use texture::{Lod, Texture, TextureOp};

#[cfg(test)]
mod tests;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Operator {
    Neg,
    Not,
    Abs,
    Sqrt,
    Rsq,
    Rcp,
    Floor,
    Fract,
    Saturate,
    Sin,
    Cos,
    Exp2,
    Log2,

    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Pow,
    Dot,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,

    Lerp,
    Clamp,
    Select,
}

impl Operator {
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Neg
            | Self::Not
            | Self::Abs
            | Self::Sqrt
            | Self::Rsq
            | Self::Rcp
            | Self::Floor
            | Self::Fract
            | Self::Saturate
            | Self::Sin
            | Self::Cos
            | Self::Exp2
            | Self::Log2 => 1,

            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Min
            | Self::Max
            | Self::Pow
            | Self::Dot
            | Self::Lt
            | Self::Gt
            | Self::Le
            | Self::Ge
            | Self::Eq
            | Self::Ne
            | Self::And
            | Self::Or => 2,

            Self::Lerp | Self::Clamp | Self::Select => 3,
        }
    }

    /// The infix spelling for binary operators that have one.
    #[must_use]
    pub const fn infix(self) -> Option<&'static str> {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
            _ => return None,
        };

        Some(op)
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::Eq | Self::Ne)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Not => "not",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Rsq => "rsq",
            Self::Rcp => "rcp",
            Self::Floor => "floor",
            Self::Fract => "fract",
            Self::Saturate => "saturate",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Exp2 => "exp2",
            Self::Log2 => "log2",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Min => "min",
            Self::Max => "max",
            Self::Pow => "pow",
            Self::Dot => "dot",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::And => "and",
            Self::Or => "or",
            Self::Lerp => "lerp",
            Self::Clamp => "clamp",
            Self::Select => "select",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Up to four lane selectors, `.xyzw` style.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Swizzle {
    components: [u8; 4],
    count: u8,
}

impl Swizzle {
    /// Returns `None` if `components` is empty, longer than 4, or selects a lane past `w`.
    #[must_use]
    pub fn new(components: &[u8]) -> Option<Self> {
        if components.is_empty() || components.len() > 4 || components.iter().any(|&it| it > 3) {
            return None;
        }

        let mut out = [0; 4];
        out[..components.len()].copy_from_slice(components);

        Some(Self { components: out, count: components.len() as u8 })
    }

    /// Parses an `xyzw` or `rgba` spelling.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let components: Vec<u8> = text
            .chars()
            .map(|c| match c {
                'x' | 'r' => Some(0),
                'y' | 'g' => Some(1),
                'z' | 'b' => Some(2),
                'w' | 'a' => Some(3),
                _ => None,
            })
            .collect::<Option<_>>()?;

        Self::new(&components)
    }

    #[must_use]
    pub fn components(&self) -> &[u8] {
        &self.components[..usize::from(self.count)]
    }

    #[must_use]
    pub const fn len(&self) -> u8 {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &component in self.components() {
            f.write_str(["x", "y", "z", "w"][usize::from(component)])?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

impl ParamMode {
    #[must_use]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Param {
    pub ty: Type,
    pub mode: ParamMode,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Signature {
    pub name: Box<str>,
    pub params: Vec<Param>,
    pub return_ty: Type,
}

impl Signature {
    /// Only by-value `in` parameters.
    #[must_use]
    pub fn is_pure_in(&self) -> bool {
        self.params.iter().all(|it| it.mode == ParamMode::In)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Call {
    pub callee: SignatureId,
    pub args: Vec<NodeId>,
    /// Lvalue receiving the return value, if it's used.
    pub result: Option<NodeId>,
}

/// Coarse classification of nodes, used to pick which nodes take part in redundancy elimination.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum NodeKind {
    Constant,
    Variable,
    Deref,
    Expression,
    Texture,
    Swizzle,
    Call,
    Assign,
    If,
    Loop,
    Return,
    Discard,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    Constant(Constant),
    Variable(VarId),
    DerefArray {
        array: NodeId,
        index: NodeId,
    },
    DerefRecord {
        record: NodeId,
        field: u32,
    },
    Expression {
        op: Operator,
        operands: Vec<NodeId>,
        ty: Type,
    },
    Texture(Texture),
    Swizzle {
        value: NodeId,
        mask: Swizzle,
    },
    Call(Call),
    /// `lhs.mask = rhs`, a mask of `0` means the whole lhs is written.
    Assign {
        lhs: NodeId,
        rhs: NodeId,
        write_mask: u8,
    },
    If {
        condition: NodeId,
        then_body: Vec<NodeId>,
        else_body: Vec<NodeId>,
    },
    Loop {
        body: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Discard {
        condition: Option<NodeId>,
    },
}

impl Instruction {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Constant(_) => NodeKind::Constant,
            Self::Variable(_) => NodeKind::Variable,
            Self::DerefArray { .. } | Self::DerefRecord { .. } => NodeKind::Deref,
            Self::Expression { .. } => NodeKind::Expression,
            Self::Texture(_) => NodeKind::Texture,
            Self::Swizzle { .. } => NodeKind::Swizzle,
            Self::Call(_) => NodeKind::Call,
            Self::Assign { .. } => NodeKind::Assign,
            Self::If { .. } => NodeKind::If,
            Self::Loop { .. } => NodeKind::Loop,
            Self::Return { .. } => NodeKind::Return,
            Self::Discard { .. } => NodeKind::Discard,
        }
    }

    /// Whether this node can only appear in a statement list.
    #[must_use]
    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Call(_)
                | Self::Assign { .. }
                | Self::If { .. }
                | Self::Loop { .. }
                | Self::Return { .. }
                | Self::Discard { .. }
        )
    }

    /// Every directly referenced node, in evaluation order.
    ///
    /// Statement lists of `If` and `Loop` aren't included.
    pub fn visit_children<F: FnMut(NodeId)>(&self, mut visit: F) {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::Loop { .. } => {}
            Self::DerefArray { array, index } => {
                visit(*array);
                visit(*index);
            }
            Self::DerefRecord { record: value, .. } | Self::Swizzle { value, .. } => visit(*value),
            Self::Expression { operands, .. } => operands.iter().copied().for_each(visit),
            Self::Texture(it) => it.visit_operands(visit),
            Self::Call(it) => {
                it.args.iter().copied().for_each(&mut visit);
                if let Some(result) = it.result {
                    visit(result);
                }
            }
            Self::Assign { lhs, rhs, .. } => {
                visit(*rhs);
                visit(*lhs);
            }
            Self::If { condition, .. } => visit(*condition),
            Self::Return { value: child } | Self::Discard { condition: child } => {
                if let Some(child) = child {
                    visit(*child);
                }
            }
        }
    }

    /// Mutable counterpart of [`Instruction::visit_children`], same order.
    #[must_use]
    pub fn children_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::Loop { .. } => Vec::new(),
            Self::DerefArray { array, index } => vec![array, index],
            Self::DerefRecord { record: value, .. } | Self::Swizzle { value, .. } => vec![value],
            Self::Expression { operands, .. } => operands.iter_mut().collect(),
            Self::Texture(it) => it.operands_mut(),
            Self::Call(it) => it.args.iter_mut().chain(it.result.as_mut()).collect(),
            Self::Assign { lhs, rhs, .. } => vec![rhs, lhs],
            Self::If { condition, .. } => vec![condition],
            Self::Return { value: child } | Self::Discard { condition: child } => {
                child.as_mut().into_iter().collect()
            }
        }
    }

    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.visit_children(|it| out.push(it));
        out
    }
}
