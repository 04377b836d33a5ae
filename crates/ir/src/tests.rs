use expect_test::expect;

use crate::instruction::ParamMode;
use crate::interp::{self, Inputs};
use crate::verify::assert_well_formed;
use crate::{Constant, Program, Type};

#[test]
fn display_statements() {
    let mut program = Program::new();
    let s = program.uniform("s", Type::SAMPLER_2D);
    let uv = program.input("uv", Type::VEC2);
    let a = program.local("a", Type::VEC4);
    let c = program.local("c", Type::BOOL);

    let coord = program.read(uv);
    let sample = program.tex(s, coord);
    let stmt = program.assign(a, sample);
    program.push(stmt);

    let lhs = program.read(a);
    let rhs = program.read(a);
    let sum = program.add(lhs, rhs);
    let zw = program.swizzle(sum, "zw");
    let stmt = program.assign_masked(a, "xy", zw);
    program.push(stmt);

    let discard = program.discard(None);
    let coord = program.read(uv);
    let level = program.float(0.0);
    let sample = program.txl(s, coord, level);
    let else_stmt = program.assign(a, sample);
    let cond = program.read(c);
    let stmt = program.if_(cond, vec![discard], vec![else_stmt]);
    program.push(stmt);

    assert_well_formed(&program);

    expect![[r#"
        a = tex(s, uv)
        a.xy = (a + a).zw
        if (c) {
            discard
        } else {
            a = txl(s, uv, lod: 0.0)
        }"#]]
    .assert_eq(&program.display().to_string());
}

#[test]
fn display_call() {
    let mut program = Program::new();
    let uv = program.input("uv", Type::VEC2);
    let q = program.local("q", Type::FLOAT);
    let x = program.local("x", Type::FLOAT);
    let f = program.function("f", &[(Type::VEC2, ParamMode::In), (Type::FLOAT, ParamMode::Out)], Type::FLOAT);

    let arg = program.read(uv);
    let out = program.read(q);
    let stmt = program.call(f, vec![arg, out], Some(x));
    program.push(stmt);

    let value = program.constant(Constant::vec(&[1.0, 0.5]));
    let stmt = program.assign(uv, value);
    program.push(stmt);

    assert_well_formed(&program);

    expect![[r#"
        x = f(uv, out q)
        uv = vec2(1.0, 0.5)"#]]
    .assert_eq(&program.display().to_string());
}

#[test]
#[should_panic(expected = "more than one parent")]
fn shared_node_is_rejected() {
    let mut program = Program::new();
    let a = program.local("a", Type::FLOAT);
    let b = program.local("b", Type::FLOAT);

    let one = program.float(1.0);
    let first = program.assign(a, one);
    let second = program.assign(b, one);
    program.push(first);
    program.push(second);

    assert_well_formed(&program);
}

#[test]
fn temporaries_are_numbered() {
    let mut program = Program::new();
    let first = program.create_variable(Type::VEC4);
    let second = program.create_variable(Type::FLOAT);

    assert_eq!(&*program.variable(first).name, "t0");
    assert_eq!(&*program.variable(second).name, "t1");
    assert_eq!(program.variable(second).ty, Type::FLOAT);
}

#[test]
fn interpret_arithmetic() {
    let mut program = Program::new();
    let a = program.local("a", Type::FLOAT);
    let b = program.local("b", Type::FLOAT);

    let one = program.float(1.0);
    let two = program.float(2.0);
    let sum = program.add(one, two);
    let stmt = program.assign(a, sum);
    program.push(stmt);

    let lhs = program.read(a);
    let rhs = program.read(a);
    let product = program.mul(lhs, rhs);
    let stmt = program.assign(b, product);
    program.push(stmt);

    let trace = interp::run(&program, &Inputs::default()).unwrap();
    assert_eq!(trace.assignments[&a], vec![vec![3.0]]);
    assert_eq!(trace.assignments[&b], vec![vec![9.0]]);
}

#[test]
fn interpret_masked_write() {
    let mut program = Program::new();
    let v = program.local("v", Type::VEC4);

    let full = program.constant(Constant::vec(&[1.0, 2.0, 3.0, 4.0]));
    let stmt = program.assign(v, full);
    program.push(stmt);

    let part = program.constant(Constant::vec(&[8.0, 9.0]));
    let stmt = program.assign_masked(v, "yw", part);
    program.push(stmt);

    let trace = interp::run(&program, &Inputs::default()).unwrap();
    assert_eq!(trace.assignments[&v], vec![vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 8.0, 3.0, 9.0]]);
}

#[test]
fn interpret_samples_are_deterministic() {
    let mut program = Program::new();
    let s = program.uniform("s", Type::SAMPLER_2D);
    let uv = program.input("uv", Type::VEC2);
    let a = program.local("a", Type::VEC4);
    let b = program.local("b", Type::VEC4);

    for var in [a, b] {
        let coord = program.read(uv);
        let sample = program.tex(s, coord);
        let stmt = program.assign(var, sample);
        program.push(stmt);
    }

    let trace = interp::run(&program, &Inputs::default()).unwrap();
    assert_eq!(trace.texture_samples, 2);
    assert_eq!(trace.assignments[&a], trace.assignments[&b]);
    assert_eq!(trace.assignments[&a][0].len(), 4);
}

#[test]
fn interpret_rejects_loops() {
    let mut program = Program::new();
    let stmt = program.loop_(Vec::new());
    program.push(stmt);

    assert_eq!(interp::run(&program, &Inputs::default()), Err(interp::InterpError::Loop(stmt)));
}
