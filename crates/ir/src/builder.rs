//! Shorthands for putting programs together by hand, mostly for tests.

use crate::instruction::{
    Call, Instruction, Lod, Operator, Param, ParamMode, Signature, Swizzle, Texture, TextureOp,
};
use crate::program::{VarMode, Variable};
use crate::ty::{Constant, Scalar};
use crate::{NodeId, Program, SignatureId, Type, VarId};

impl Program {
    fn declare(&mut self, name: &str, ty: Type, mode: VarMode) -> VarId {
        self.add_variable(Variable { name: name.into(), ty, mode })
    }

    pub fn local(&mut self, name: &str, ty: Type) -> VarId {
        self.declare(name, ty, VarMode::Auto)
    }

    pub fn input(&mut self, name: &str, ty: Type) -> VarId {
        self.declare(name, ty, VarMode::In)
    }

    pub fn output(&mut self, name: &str, ty: Type) -> VarId {
        self.declare(name, ty, VarMode::Out)
    }

    pub fn uniform(&mut self, name: &str, ty: Type) -> VarId {
        self.declare(name, ty, VarMode::Uniform)
    }

    pub fn function(&mut self, name: &str, params: &[(Type, ParamMode)], return_ty: Type) -> SignatureId {
        let params = params.iter().map(|(ty, mode)| Param { ty: ty.clone(), mode: *mode }).collect();
        self.add_signature(Signature { name: name.into(), params, return_ty })
    }

    pub fn read(&mut self, var: VarId) -> NodeId {
        self.add_node(Instruction::Variable(var))
    }

    pub fn constant(&mut self, constant: Constant) -> NodeId {
        self.add_node(Instruction::Constant(constant))
    }

    pub fn float(&mut self, value: f32) -> NodeId {
        self.constant(Constant::float(value))
    }

    pub fn unary(&mut self, op: Operator, operand: NodeId) -> NodeId {
        debug_assert_eq!(op.arity(), 1);

        let ty = self.type_of(operand);
        self.add_node(Instruction::Expression { op, operands: vec![operand], ty })
    }

    pub fn binary(&mut self, op: Operator, lhs: NodeId, rhs: NodeId) -> NodeId {
        debug_assert_eq!(op.arity(), 2);

        let (lhs_ty, rhs_ty) = (self.type_of(lhs), self.type_of(rhs));
        let wide = if rhs_ty.lanes() > lhs_ty.lanes() { rhs_ty } else { lhs_ty };

        let ty = match op {
            op if op.is_comparison() => Type::vector(Scalar::Bool, wide.lanes().max(1)),
            Operator::Dot => Type::vector(wide.scalar().unwrap_or(Scalar::Float), 1),
            _ => wide,
        };

        self.add_node(Instruction::Expression { op, operands: vec![lhs, rhs], ty })
    }

    pub fn ternary(&mut self, op: Operator, a: NodeId, b: NodeId, c: NodeId) -> NodeId {
        debug_assert_eq!(op.arity(), 3);

        let ty = match op {
            Operator::Select => self.type_of(b),
            _ => self.type_of(a),
        };

        self.add_node(Instruction::Expression { op, operands: vec![a, b, c], ty })
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(Operator::Add, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(Operator::Mul, lhs, rhs)
    }

    /// # Panics
    /// If `mask` isn't a valid swizzle.
    pub fn swizzle(&mut self, value: NodeId, mask: &str) -> NodeId {
        let mask = Swizzle::parse(mask).expect("invalid swizzle");
        self.add_node(Instruction::Swizzle { value, mask })
    }

    pub fn index(&mut self, array: NodeId, index: NodeId) -> NodeId {
        self.add_node(Instruction::DerefArray { array, index })
    }

    pub fn field(&mut self, record: NodeId, field: u32) -> NodeId {
        self.add_node(Instruction::DerefRecord { record, field })
    }

    /// `tex(sampler, coordinate)` returning a `vec4`.
    pub fn tex(&mut self, sampler: VarId, coordinate: NodeId) -> NodeId {
        let sampler = self.read(sampler);
        self.texture(Texture::sample(sampler, coordinate, Type::VEC4))
    }

    /// `txl(sampler, coordinate, lod: level)` returning a `vec4`.
    pub fn txl(&mut self, sampler: VarId, coordinate: NodeId, level: NodeId) -> NodeId {
        let sampler = self.read(sampler);
        let mut texture = Texture::sample(sampler, coordinate, Type::VEC4);
        texture.op = TextureOp::Txl;
        texture.lod = Lod::Level(level);
        self.texture(texture)
    }

    pub fn texture(&mut self, texture: Texture) -> NodeId {
        self.add_node(Instruction::Texture(texture))
    }

    /// `var = rhs`
    pub fn assign(&mut self, var: VarId, rhs: NodeId) -> NodeId {
        self.create_assignment(var, rhs)
    }

    /// `var.mask = rhs`
    ///
    /// # Panics
    /// If `mask` isn't a valid swizzle.
    pub fn assign_masked(&mut self, var: VarId, mask: &str, rhs: NodeId) -> NodeId {
        let mask = Swizzle::parse(mask).expect("invalid write mask");
        let write_mask = mask.components().iter().fold(0, |acc, it| acc | 1 << it);

        let lhs = self.read(var);
        self.add_node(Instruction::Assign { lhs, rhs, write_mask })
    }

    /// `lhs = rhs` for any lvalue.
    pub fn store(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add_node(Instruction::Assign { lhs, rhs, write_mask: 0 })
    }

    pub fn call(&mut self, callee: SignatureId, args: Vec<NodeId>, result: Option<VarId>) -> NodeId {
        let result = result.map(|var| self.read(var));
        self.add_node(Instruction::Call(Call { callee, args, result }))
    }

    pub fn if_(&mut self, condition: NodeId, then_body: Vec<NodeId>, else_body: Vec<NodeId>) -> NodeId {
        self.add_node(Instruction::If { condition, then_body, else_body })
    }

    pub fn loop_(&mut self, body: Vec<NodeId>) -> NodeId {
        self.add_node(Instruction::Loop { body })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.add_node(Instruction::Return { value })
    }

    pub fn discard(&mut self, condition: Option<NodeId>) -> NodeId {
        self.add_node(Instruction::Discard { condition })
    }

    /// Appends `statement` to the root list.
    pub fn push(&mut self, statement: NodeId) {
        self.body.push(statement);
    }
}
