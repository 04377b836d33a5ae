use expect_test::{Expect, expect};
use texel_ir::instruction::ParamMode;
use texel_ir::verify::assert_well_formed;
use texel_ir::{NodeId, Program, Type, VarId};

use super::ControlFlowGraph;
use crate::error::Unsupported;
use crate::{Config, Error};

fn expect_cfg(program: &Program, expected: Expect) {
    assert_well_formed(program);

    let cfg = ControlFlowGraph::build(program, &Config::default()).expect("failed to build cfg");
    expected.assert_eq(&cfg.display(program).to_string());
}

struct Vars {
    x: VarId,
    y: VarId,
    c: VarId,
    a: VarId,
    b: VarId,
}

fn vars(program: &mut Program) -> Vars {
    Vars {
        x: program.input("x", Type::FLOAT),
        y: program.input("y", Type::FLOAT),
        c: program.input("c", Type::BOOL),
        a: program.local("a", Type::FLOAT),
        b: program.local("b", Type::FLOAT),
    }
}

fn copy(program: &mut Program, dest: VarId, src: VarId) -> NodeId {
    let rhs = program.read(src);
    program.assign(dest, rhs)
}

#[test]
fn straight_line_is_one_block() {
    let mut program = Program::new();
    let v = vars(&mut program);

    for (dest, src) in [(v.a, v.x), (v.b, v.a), (v.a, v.y)] {
        let stmt = copy(&mut program, dest, src);
        program.push(stmt);
    }

    expect_cfg(&program, expect!["bb0 root 0..=2 <- [] -> []"]);
}

#[test]
fn empty_program_has_no_blocks() {
    let program = Program::new();

    let cfg = ControlFlowGraph::build(&program, &Config::default()).unwrap();
    assert!(cfg.is_empty());
}

#[test]
fn conditional_with_both_branches() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%2
    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    // %3..=%10
    let then_stmt = copy(&mut program, v.b, v.x);
    let else_stmt = copy(&mut program, v.b, v.y);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, vec![then_stmt], vec![else_stmt]);
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    expect_cfg(
        &program,
        expect![[r#"
            bb0 root 0..=1 <- [] -> [bb1, bb2]
            bb1 then %10 0..=0 <- [bb0] -> [bb3]
            bb2 else %10 0..=0 <- [bb0] -> [bb3]
            bb3 root 2..=2 <- [bb1, bb2] -> []"#]],
    );
}

#[test]
fn conditional_with_one_branch_falls_through() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%4
    let then_stmt = copy(&mut program, v.b, v.x);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, vec![then_stmt], Vec::new());
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    expect_cfg(
        &program,
        expect![[r#"
            bb0 root 0..=0 <- [] -> [bb1, bb2]
            bb1 then %4 0..=0 <- [bb0] -> [bb2]
            bb2 root 1..=1 <- [bb0, bb1] -> []"#]],
    );
}

#[test]
fn conditional_with_only_else_falls_through() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%4
    let else_stmt = copy(&mut program, v.b, v.x);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, Vec::new(), vec![else_stmt]);
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    expect_cfg(
        &program,
        expect![[r#"
            bb0 root 0..=0 <- [] -> [bb1, bb2]
            bb1 else %4 0..=0 <- [bb0] -> [bb2]
            bb2 root 1..=1 <- [bb0, bb1] -> []"#]],
    );
}

#[test]
fn trailing_conditional_takes_its_only_body() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%2
    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    // %3..=%7
    let else_stmt = copy(&mut program, v.b, v.y);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, Vec::new(), vec![else_stmt]);
    program.push(stmt);

    // %8..=%10
    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    // %11..=%15
    let then_stmt = copy(&mut program, v.b, v.x);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, vec![then_stmt], Vec::new());
    program.push(stmt);

    expect_cfg(
        &program,
        expect![[r#"
            bb0 root 0..=1 <- [] -> [bb1, bb2]
            bb1 else %7 0..=0 <- [bb0] -> [bb2]
            bb2 root 2..=3, then %15 0..=0 <- [bb0, bb1] -> []"#]],
    );
}

#[test]
fn trailing_nested_conditionals_form_one_block() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%2
    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    // %3..=%7
    let inner_stmt = copy(&mut program, v.b, v.y);
    let cond = program.read(v.c);
    let inner = program.if_(cond, vec![inner_stmt], Vec::new());

    // %8..=%12
    let outer_stmt = copy(&mut program, v.a, v.b);
    let cond = program.read(v.c);
    let outer = program.if_(cond, vec![outer_stmt, inner], Vec::new());
    program.push(outer);

    let cfg = ControlFlowGraph::build(&program, &Config::default()).unwrap();
    expect!["bb0 root 0..=1, then %12 0..=1, then %7 0..=0 <- [] -> []"]
        .assert_eq(&cfg.display(&program).to_string());

    let block = cfg.blocks().next().unwrap();
    assert_eq!(block.statements(&program), [stmt, outer, outer_stmt, inner, inner_stmt]);
}

#[test]
fn empty_conditional_merges_with_its_continuation() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    let cond = program.read(v.c);
    let stmt = program.if_(cond, Vec::new(), Vec::new());
    program.push(stmt);

    let stmt = copy(&mut program, v.b, v.a);
    program.push(stmt);

    expect_cfg(&program, expect!["bb0 root 0..=2 <- [] -> []"]);
}

#[test]
fn nested_branch_flows_to_outer_continuation() {
    let mut program = Program::new();
    let v = vars(&mut program);

    // %0..=%4
    let inner_stmt = copy(&mut program, v.a, v.x);
    let cond = program.read(v.c);
    let inner = program.if_(cond, vec![inner_stmt], Vec::new());

    // %5..=%6
    let cond = program.read(v.c);
    let outer = program.if_(cond, vec![inner], Vec::new());
    program.push(outer);

    let stmt = copy(&mut program, v.b, v.y);
    program.push(stmt);

    expect_cfg(
        &program,
        expect![[r#"
            bb0 root 0..=0 <- [] -> [bb1, bb3]
            bb1 then %6 0..=0 <- [bb0] -> [bb2, bb3]
            bb2 then %4 0..=0 <- [bb1] -> [bb3]
            bb3 root 1..=1 <- [bb0, bb1, bb2] -> []"#]],
    );
}

#[test]
fn call_chain_collapses() {
    let mut program = Program::new();
    let v = vars(&mut program);
    let f = program.function("f", &[(Type::FLOAT, ParamMode::In)], Type::FLOAT);

    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    let arg = program.read(v.a);
    let stmt = program.call(f, vec![arg], Some(v.b));
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    let arg = program.read(v.a);
    let stmt = program.call(f, vec![arg], Some(v.b));
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.b);
    program.push(stmt);

    assert_eq!(crate::cfg::partition(&program, Config::DEFAULT_MAX_DEPTH).unwrap().len(), 3);

    let cfg = ControlFlowGraph::build(&program, &Config::default()).unwrap();
    assert_eq!(cfg.len(), 1);

    let block = cfg.blocks().next().unwrap();
    assert_eq!(block.statements(&program), program.body);
    assert!(block.predecessors.is_empty());
    assert!(block.successors.is_empty());
}

#[test]
fn loops_are_rejected() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let body = copy(&mut program, v.a, v.x);
    let stmt = program.loop_(vec![body]);
    program.push(stmt);

    let err = ControlFlowGraph::build(&program, &Config::default()).unwrap_err();
    assert_eq!(err, Error::UnsupportedControlFlow(Unsupported::Loop(stmt)));
}

#[test]
fn returns_are_rejected() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let then_stmt = program.ret(None);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, vec![then_stmt], Vec::new());
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    let err = ControlFlowGraph::build(&program, &Config::default()).unwrap_err();
    assert_eq!(err, Error::UnsupportedControlFlow(Unsupported::Return(then_stmt)));
}

#[test]
fn discard_in_single_block() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    let cond = program.read(v.c);
    let stmt = program.discard(Some(cond));
    program.push(stmt);

    expect_cfg(&program, expect!["bb0 root 0..=1 <- [] -> []"]);
}

#[test]
fn discard_across_blocks_is_rejected() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let discard = program.discard(None);
    let cond = program.read(v.c);
    let stmt = program.if_(cond, vec![discard], Vec::new());
    program.push(stmt);

    let stmt = copy(&mut program, v.a, v.x);
    program.push(stmt);

    let err = ControlFlowGraph::build(&program, &Config::default()).unwrap_err();
    assert_eq!(err, Error::UnsupportedControlFlow(Unsupported::DiscardAcrossBlocks(discard)));
}

#[test]
fn deep_nesting_is_rejected() {
    let mut program = Program::new();
    let v = vars(&mut program);

    let inner_stmt = copy(&mut program, v.a, v.x);
    let cond = program.read(v.c);
    let inner = program.if_(cond, vec![inner_stmt], Vec::new());
    let cond = program.read(v.c);
    let outer = program.if_(cond, vec![inner], Vec::new());
    program.push(outer);

    let config = Config { max_depth: 1, ..Config::default() };
    let err = ControlFlowGraph::build(&program, &config).unwrap_err();
    assert_eq!(err, Error::TooDeep { limit: 1 });
}
