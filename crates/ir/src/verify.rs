use fnv::FnvHashSet;

use crate::instruction::Instruction;
use crate::program::ListRef;
use crate::{NodeId, Program, Type};

fn is_lvalue(program: &Program, mut node: NodeId) -> bool {
    loop {
        match program.node(node) {
            Instruction::Variable(_) => return true,
            Instruction::DerefArray { array: inner, .. } | Instruction::DerefRecord { record: inner, .. } => {
                node = *inner;
            }
            _ => return false,
        }
    }
}

struct Verifier<'a> {
    program: &'a Program,
    seen: FnvHashSet<NodeId>,
}

impl Verifier<'_> {
    #[track_caller]
    fn claim(&mut self, node: NodeId) {
        assert!(node.index() < self.program.node_count(), "{node} is out of range");
        assert!(self.seen.insert(node), "{node} has more than one parent");
    }

    #[track_caller]
    fn list(&mut self, list: ListRef) {
        for &statement in self.program.list(list) {
            self.claim(statement);
            self.statement(statement);

            for nested in self.program.nested_lists(statement) {
                self.list(nested);
            }
        }
    }

    #[track_caller]
    fn statement(&mut self, node: NodeId) {
        let program = self.program;
        let instruction = program.node(node);

        assert!(instruction.is_statement(), "{node} ({}) is not a statement", program.display_node(node));

        match instruction {
            Instruction::Assign { lhs, rhs, write_mask } => {
                assert!(is_lvalue(program, *lhs), "lhs of {node} is not an lvalue");

                if *write_mask != 0 {
                    let full = program.type_of(*lhs).full_mask();
                    assert_eq!(write_mask & !full, 0, "write mask of {node} is wider than its lhs");
                }

                self.expression(*rhs);
                self.expression(*lhs);
            }

            Instruction::Call(call) => {
                assert!(call.callee.index() < program.signature_count(), "{} is out of range", call.callee);

                let signature = program.signature(call.callee);
                assert_eq!(
                    signature.params.len(),
                    call.args.len(),
                    "call to `{}` has the wrong number of arguments",
                    signature.name
                );

                for (param, &arg) in signature.params.iter().zip(&call.args) {
                    if param.mode.writes() {
                        assert!(is_lvalue(program, arg), "`out` argument {arg} is not an lvalue");
                    }

                    self.expression(arg);
                }

                if let Some(result) = call.result {
                    assert!(is_lvalue(program, result), "call result {result} is not an lvalue");
                    assert_ne!(signature.return_ty, Type::Void, "call to `{}` has no result", signature.name);
                    self.expression(result);
                }
            }

            Instruction::If { condition, .. } => {
                assert_eq!(program.type_of(*condition), Type::BOOL, "condition of {node} is not a bool");
                self.expression(*condition);
            }

            Instruction::Return { value: child } | Instruction::Discard { condition: child } => {
                if let Some(child) = child {
                    self.expression(*child);
                }
            }

            Instruction::Loop { .. } => {}

            _ => unreachable!(),
        }
    }

    #[track_caller]
    fn expression(&mut self, node: NodeId) {
        self.claim(node);

        let program = self.program;
        let instruction = program.node(node);

        assert!(!instruction.is_statement(), "statement {node} used as an expression");

        match instruction {
            Instruction::Variable(var) => {
                assert!(var.index() < program.variable_count(), "{var} is out of range");
            }
            Instruction::Expression { op, operands, .. } => {
                assert_eq!(op.arity(), operands.len(), "{op} at {node} has the wrong number of operands");
            }
            _ => {}
        }

        instruction.visit_children(|child| self.expression(child));
    }
}

/// Checks the structural invariants every pass must preserve.
///
/// # Panics
/// If any invariant is broken.
#[track_caller]
pub fn assert_well_formed(program: &Program) {
    let mut verifier = Verifier { program, seen: FnvHashSet::default() };
    verifier.list(ListRef::Root);
}
