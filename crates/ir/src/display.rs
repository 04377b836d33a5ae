use std::fmt;

use crate::instruction::{Call, Instruction, Lod, ParamMode, Texture};
use crate::{NodeId, Program};

/// Displays a statement list, one statement per line.
pub struct ListDisplay<'a> {
    program: &'a Program,
    statements: &'a [NodeId],
}

impl fmt::Display for ListDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Printer { program: self.program, f }.list(self.statements, 0)
    }
}

/// Displays a single node, statement or expression.
pub struct NodeDisplay<'a> {
    program: &'a Program,
    node: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut printer = Printer { program: self.program, f };
        match self.program.node(self.node).is_statement() {
            true => printer.statement(self.node, 0),
            false => printer.expression(self.node, false),
        }
    }
}

impl Program {
    #[must_use]
    pub fn display(&self) -> ListDisplay<'_> {
        ListDisplay { program: self, statements: &self.body }
    }

    #[must_use]
    pub fn display_statements<'a>(&'a self, statements: &'a [NodeId]) -> ListDisplay<'a> {
        ListDisplay { program: self, statements }
    }

    #[must_use]
    pub fn display_node(&self, node: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { program: self, node }
    }
}

struct Printer<'a, 'f> {
    program: &'a Program,
    f: &'a mut fmt::Formatter<'f>,
}

impl Printer<'_, '_> {
    fn list(&mut self, statements: &[NodeId], depth: usize) -> fmt::Result {
        for (idx, &statement) in statements.iter().enumerate() {
            if idx != 0 {
                self.f.write_str("\n")?;
            }

            self.statement(statement, depth)?;
        }

        Ok(())
    }

    fn indent(&mut self, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            self.f.write_str("    ")?;
        }

        Ok(())
    }

    fn body(&mut self, statements: &[NodeId], depth: usize) -> fmt::Result {
        self.f.write_str("{")?;
        if !statements.is_empty() {
            self.f.write_str("\n")?;
            self.list(statements, depth + 1)?;
        }
        self.f.write_str("\n")?;
        self.indent(depth)?;
        self.f.write_str("}")
    }

    fn statement(&mut self, node: NodeId, depth: usize) -> fmt::Result {
        let program = self.program;

        self.indent(depth)?;

        match program.node(node) {
            Instruction::Assign { lhs, rhs, write_mask } => {
                self.expression(*lhs, true)?;
                if *write_mask != 0 {
                    self.f.write_str(".")?;
                    for lane in (0..4usize).filter(|&lane| *write_mask & (1u8 << lane) != 0) {
                        self.f.write_str(["x", "y", "z", "w"][lane])?;
                    }
                }
                self.f.write_str(" = ")?;
                self.expression(*rhs, false)
            }

            Instruction::Call(call) => self.call(call),

            Instruction::If { condition, then_body, else_body } => {
                self.f.write_str("if (")?;
                self.expression(*condition, false)?;
                self.f.write_str(") ")?;
                self.body(then_body, depth)?;
                if !else_body.is_empty() {
                    self.f.write_str(" else ")?;
                    self.body(else_body, depth)?;
                }
                Ok(())
            }

            Instruction::Loop { body } => {
                self.f.write_str("loop ")?;
                self.body(body, depth)
            }

            Instruction::Return { value: None } => self.f.write_str("return"),
            Instruction::Return { value: Some(value) } => {
                self.f.write_str("return ")?;
                self.expression(*value, false)
            }

            Instruction::Discard { condition: None } => self.f.write_str("discard"),
            Instruction::Discard { condition: Some(condition) } => {
                self.f.write_str("discard if (")?;
                self.expression(*condition, false)?;
                self.f.write_str(")")
            }

            // an expression used as a statement, only happens with malformed programs.
            _ => self.expression(node, false),
        }
    }

    fn call(&mut self, call: &Call) -> fmt::Result {
        let signature = self.program.signature(call.callee);

        if let Some(result) = call.result {
            self.expression(result, true)?;
            self.f.write_str(" = ")?;
        }

        write!(self.f, "{}(", signature.name)?;
        for (idx, &arg) in call.args.iter().enumerate() {
            if idx != 0 {
                self.f.write_str(", ")?;
            }

            match signature.params.get(idx).map(|it| it.mode) {
                Some(ParamMode::Out) => self.f.write_str("out ")?,
                Some(ParamMode::InOut) => self.f.write_str("inout ")?,
                Some(ParamMode::In) | None => {}
            }

            self.expression(arg, false)?;
        }
        self.f.write_str(")")
    }

    fn expression(&mut self, node: NodeId, nested: bool) -> fmt::Result {
        let program = self.program;

        match program.node(node) {
            Instruction::Constant(it) => write!(self.f, "{it}"),
            Instruction::Variable(var) => self.f.write_str(&program.variable(*var).name),
            Instruction::DerefArray { array, index } => {
                self.expression(*array, true)?;
                self.f.write_str("[")?;
                self.expression(*index, false)?;
                self.f.write_str("]")
            }
            Instruction::DerefRecord { record, field } => {
                self.expression(*record, true)?;
                match program.type_of(*record).field(*field) {
                    Some(it) => write!(self.f, ".{}", it.name),
                    None => write!(self.f, ".{field}"),
                }
            }
            Instruction::Swizzle { value, mask } => {
                self.expression(*value, true)?;
                write!(self.f, ".{mask}")
            }
            Instruction::Expression { op, operands, ty: _ } => match (op.infix(), operands.as_slice()) {
                (Some(infix), [lhs, rhs]) => {
                    if nested {
                        self.f.write_str("(")?;
                    }
                    self.expression(*lhs, true)?;
                    write!(self.f, " {infix} ")?;
                    self.expression(*rhs, true)?;
                    if nested {
                        self.f.write_str(")")?;
                    }
                    Ok(())
                }
                _ => {
                    write!(self.f, "{op}(")?;
                    self.args(operands)?;
                    self.f.write_str(")")
                }
            },
            Instruction::Texture(texture) => self.texture(texture),
            _ => write!(self.f, "<statement {node}>"),
        }
    }

    fn args(&mut self, args: &[NodeId]) -> fmt::Result {
        for (idx, &arg) in args.iter().enumerate() {
            if idx != 0 {
                self.f.write_str(", ")?;
            }
            self.expression(arg, false)?;
        }

        Ok(())
    }

    fn named(&mut self, name: &str, node: Option<NodeId>) -> fmt::Result {
        match node {
            Some(node) => {
                write!(self.f, ", {name}: ")?;
                self.expression(node, false)
            }
            None => Ok(()),
        }
    }

    fn texture(&mut self, texture: &Texture) -> fmt::Result {
        write!(self.f, "{}", texture.op)?;
        if let Some(channel) = texture.channel {
            write!(self.f, "[{channel}]")?;
        }

        self.f.write_str("(")?;
        self.expression(texture.sampler, false)?;
        if let Some(coordinate) = texture.coordinate {
            self.f.write_str(", ")?;
            self.expression(coordinate, false)?;
        }

        self.named("proj", texture.projector)?;
        self.named("cmp", texture.comparator)?;
        self.named("offset", texture.offset)?;

        match texture.lod {
            Lod::None => {}
            Lod::Bias(it) => self.named("bias", Some(it))?,
            Lod::Level(it) => self.named("lod", Some(it))?,
            Lod::Sample(it) => self.named("sample", Some(it))?,
            Lod::Grad { dpdx, dpdy } => {
                self.named("dpdx", Some(dpdx))?;
                self.named("dpdy", Some(dpdy))?;
            }
        }

        self.named("state", texture.sampler_state)?;
        self.f.write_str(")")
    }
}
