use std::fmt;

use texel_ir::NodeId;

/// Control flow the graph builder refuses to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    Loop(NodeId),
    Return(NodeId),
    /// A `discard` in a function with more than one basic block.
    DiscardAcrossBlocks(NodeId),
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loop(node) => write!(f, "loop at {node}"),
            Self::Return(node) => write!(f, "return at {node}"),
            Self::DiscardAcrossBlocks(node) => write!(f, "discard at {node} in a multi-block function"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unsupported control-flow shape: {0}")]
    UnsupportedControlFlow(Unsupported),

    #[error("nesting depth exceeds the limit of {limit}")]
    TooDeep { limit: u32 },
}
