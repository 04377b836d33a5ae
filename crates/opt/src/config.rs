use std::fmt;

use texel_ir::NodeKind;

/// A set of node kinds that take part in redundancy elimination.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKinds(u8);

impl NodeKinds {
    pub const NONE: Self = Self(0);
    pub const TEXTURE: Self = Self(1 << 0);
    /// Calls with only `in` parameters. Redundant calls are removed, so the callee runs once per group.
    pub const CALL: Self = Self(1 << 1);
    pub const EXPRESSION: Self = Self(1 << 2);
    pub const SWIZZLE: Self = Self(1 << 3);
    /// Array and record dereferences.
    pub const DEREF: Self = Self(1 << 4);
    pub const ALL: Self =
        Self(Self::TEXTURE.0 | Self::CALL.0 | Self::EXPRESSION.0 | Self::SWIZZLE.0 | Self::DEREF.0);

    const fn bit(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Texture => Self::TEXTURE,
            NodeKind::Call => Self::CALL,
            NodeKind::Expression => Self::EXPRESSION,
            NodeKind::Swizzle => Self::SWIZZLE,
            NodeKind::Deref => Self::DEREF,
            NodeKind::Constant
            | NodeKind::Variable
            | NodeKind::Assign
            | NodeKind::If
            | NodeKind::Loop
            | NodeKind::Return
            | NodeKind::Discard => Self::NONE,
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, kind: NodeKind) -> bool {
        let bit = Self::bit(kind).0;
        bit != 0 && self.0 & bit == bit
    }
}

impl Default for NodeKinds {
    fn default() -> Self {
        Self::TEXTURE
    }
}

impl std::ops::BitOr for NodeKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for NodeKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::TEXTURE, "TEXTURE"),
            (Self::CALL, "CALL"),
            (Self::EXPRESSION, "EXPRESSION"),
            (Self::SWIZZLE, "SWIZZLE"),
            (Self::DEREF, "DEREF"),
        ];

        f.debug_set()
            .entries(names.iter().filter(|(bit, _)| self.0 & bit.0 != 0).map(|(_, name)| name))
            .finish()
    }
}

/// Options for the local CSE pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Node kinds whose repeated evaluations get merged.
    pub eligible: NodeKinds,
    /// Maximum nesting of statements and expressions before the pass gives up.
    pub max_depth: u32,
}

impl Config {
    pub const DEFAULT_MAX_DEPTH: u32 = 256;

    #[must_use]
    pub fn with_eligible(eligible: NodeKinds) -> Self {
        Self { eligible, ..Self::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { eligible: NodeKinds::default(), max_depth: Self::DEFAULT_MAX_DEPTH }
    }
}
