use crate::id::IdAllocator;
use crate::instruction::{Call, Instruction, Signature};
use crate::{NodeId, SignatureId, Type, VarId};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum VarMode {
    /// A function local.
    Auto,
    /// Compiler generated local.
    Temporary,
    /// Shader input, read only.
    In,
    /// Shader output.
    Out,
    /// Uniform, read only.
    Uniform,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Variable {
    pub name: Box<str>,
    pub ty: Type,
    pub mode: VarMode,
}

/// Identifies one statement list in a [`Program`].
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub enum ListRef {
    Root,
    Then(NodeId),
    Else(NodeId),
    Loop(NodeId),
}

/// A function body together with everything it references.
///
/// Nodes live in an arena and are never removed from it, rewriting only detaches them from the tree.
/// This is also the collaborator passes use to create new variables and statements, and to report errors.
#[derive(Debug, Clone)]
pub struct Program {
    nodes: Vec<Instruction>,
    variables: Vec<Variable>,
    signatures: Vec<Signature>,
    pub body: Vec<NodeId>,
    diagnostics: Vec<String>,
    temporaries: IdAllocator<u32>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            variables: Vec::new(),
            signatures: Vec::new(),
            body: Vec::new(),
            diagnostics: Vec::new(),
            temporaries: IdAllocator::new(|it| it),
        }
    }

    pub fn add_node(&mut self, instruction: Instruction) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(instruction);
        id
    }

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        let id = VarId(u32::try_from(self.variables.len()).expect("variable arena overflow"));
        self.variables.push(variable);
        id
    }

    pub fn add_signature(&mut self, signature: Signature) -> SignatureId {
        let id = SignatureId(u32::try_from(self.signatures.len()).expect("signature arena overflow"));
        self.signatures.push(signature);
        id
    }

    /// Creates a fresh compiler temporary of type `ty`.
    pub fn create_variable(&mut self, ty: Type) -> VarId {
        let name = format!("t{}", self.temporaries.allocate());
        self.add_variable(Variable { name: name.into(), ty, mode: VarMode::Temporary })
    }

    /// Creates (but doesn't insert) `lhs = rhs`.
    pub fn create_assignment(&mut self, lhs: VarId, rhs: NodeId) -> NodeId {
        let lhs = self.add_node(Instruction::Variable(lhs));
        self.add_node(Instruction::Assign { lhs, rhs, write_mask: 0 })
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(%message, "reported error");
        self.diagnostics.push(message);
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Instruction {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Instruction {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    #[must_use]
    pub fn signature(&self, id: SignatureId) -> &Signature {
        &self.signatures[id.index()]
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// # Panics
    /// If `list` names a node that isn't the matching control node.
    #[must_use]
    pub fn list(&self, list: ListRef) -> &[NodeId] {
        match (list, list.owner().map(|it| self.node(it))) {
            (ListRef::Root, _) => &self.body,
            (ListRef::Then(_), Some(Instruction::If { then_body, .. })) => then_body,
            (ListRef::Else(_), Some(Instruction::If { else_body, .. })) => else_body,
            (ListRef::Loop(_), Some(Instruction::Loop { body })) => body,
            (list, _) => panic!("{list:?} doesn't name a statement list"),
        }
    }

    /// # Panics
    /// If `list` names a node that isn't the matching control node.
    #[must_use]
    pub fn list_mut(&mut self, list: ListRef) -> &mut Vec<NodeId> {
        let Some(owner) = list.owner() else { return &mut self.body };

        match (list, self.node_mut(owner)) {
            (ListRef::Then(_), Instruction::If { then_body, .. }) => then_body,
            (ListRef::Else(_), Instruction::If { else_body, .. }) => else_body,
            (ListRef::Loop(_), Instruction::Loop { body }) => body,
            (list, _) => panic!("{list:?} doesn't name a statement list"),
        }
    }

    /// Statement lists nested directly inside `statement`.
    #[must_use]
    pub fn nested_lists(&self, statement: NodeId) -> Vec<ListRef> {
        match self.node(statement) {
            Instruction::If { .. } => vec![ListRef::Then(statement), ListRef::Else(statement)],
            Instruction::Loop { .. } => vec![ListRef::Loop(statement)],
            _ => Vec::new(),
        }
    }

    /// The variable an lvalue (or rvalue deref chain) is rooted at.
    #[must_use]
    pub fn root_variable(&self, mut node: NodeId) -> Option<VarId> {
        loop {
            match self.node(node) {
                Instruction::Variable(var) => return Some(*var),
                Instruction::DerefArray { array: inner, .. }
                | Instruction::DerefRecord { record: inner, .. }
                | Instruction::Swizzle { value: inner, .. } => node = *inner,
                _ => return None,
            }
        }
    }

    /// # Panics
    /// If the node is malformed, for instance a record deref of a non-record.
    #[must_use]
    pub fn type_of(&self, node: NodeId) -> Type {
        match self.node(node) {
            Instruction::Constant(it) => it.ty.clone(),
            Instruction::Variable(var) => self.variable(*var).ty.clone(),
            Instruction::DerefArray { array, .. } => {
                self.type_of(*array).element().expect("indexed a non-indexable type")
            }
            Instruction::DerefRecord { record, field } => {
                let ty = self.type_of(*record);
                ty.field(*field).expect("field out of range").ty.clone()
            }
            Instruction::Expression { ty, .. } => ty.clone(),
            Instruction::Texture(it) => it.ty.clone(),
            Instruction::Swizzle { value, mask } => {
                let scalar = self.type_of(*value).scalar().expect("swizzled a non-vector");
                Type::vector(scalar, mask.len())
            }
            Instruction::Call(Call { callee, .. }) => self.signature(*callee).return_ty.clone(),
            Instruction::Assign { .. }
            | Instruction::If { .. }
            | Instruction::Loop { .. }
            | Instruction::Return { .. }
            | Instruction::Discard { .. } => Type::Void,
        }
    }

    /// Whether `statement` in `lhs.mask = ..` form writes only part of its root variable.
    #[must_use]
    pub fn is_partial_write(&self, lhs: NodeId, write_mask: u8) -> bool {
        match self.node(lhs) {
            Instruction::Variable(var) => {
                let full = self.variable(*var).ty.full_mask();
                write_mask != 0 && write_mask != full
            }
            _ => true,
        }
    }

    /// Finds the position of `statement` in `list`.
    #[must_use]
    pub fn position(&self, list: ListRef, statement: NodeId) -> Option<usize> {
        self.list(list).iter().position(|&it| it == statement)
    }
}

impl ListRef {
    /// The control node the list belongs to, `None` for the root list.
    #[must_use]
    pub const fn owner(self) -> Option<NodeId> {
        match self {
            Self::Root => None,
            Self::Then(it) | Self::Else(it) | Self::Loop(it) => Some(it),
        }
    }
}
