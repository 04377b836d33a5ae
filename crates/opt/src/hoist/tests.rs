use expect_test::expect;
use texel_ir::instruction::{Operator, ParamMode};
use texel_ir::{Constant, Program, Type, VarId};

use crate::pass_manager::{InplacePass, Pass, PassManager};
use crate::tests::expect_program_with_opts;
use crate::{Config, Error, hoist_subexpressions};

fn passes() -> PassManager {
    PassManager::with_passes(vec![Pass::HoistSubexpressions(Config::default())])
}

fn inputs(program: &mut Program) -> [VarId; 4] {
    ["x", "y", "z", "w"].map(|name| program.input(name, Type::FLOAT))
}

#[test]
fn nested_operands() {
    let mut program = Program::new();
    let [x, y, z, w] = inputs(&mut program);
    let a = program.local("a", Type::FLOAT);

    let lhs = program.read(x);
    let rhs = program.read(y);
    let sum = program.add(lhs, rhs);
    let lhs = program.read(z);
    let rhs = program.read(w);
    let difference = program.binary(Operator::Sub, lhs, rhs);
    let product = program.mul(sum, difference);
    let stmt = program.assign(a, product);
    program.push(stmt);

    let changed = expect_program_with_opts(
        &passes(),
        &mut program,
        expect![[r#"
            t0 = x + y
            t1 = z - w
            a = t0 * t1"#]],
    );
    assert!(changed);
}

#[test]
fn three_address_form_is_kept() {
    let mut program = Program::new();
    let [x, y, ..] = inputs(&mut program);
    let a = program.local("a", Type::FLOAT);

    let lhs = program.read(x);
    let rhs = program.read(y);
    let sum = program.add(lhs, rhs);
    let stmt = program.assign(a, sum);
    program.push(stmt);

    let operand = program.read(x);
    let negated = program.unary(Operator::Neg, operand);
    let stmt = program.assign(a, negated);
    program.push(stmt);

    let changed = expect_program_with_opts(
        &passes(),
        &mut program,
        expect![[r#"
            a = x + y
            a = neg(x)"#]],
    );
    assert!(!changed);
}

#[test]
fn conditions_and_branches() {
    let mut program = Program::new();
    let [x, y, z, _] = inputs(&mut program);
    let a = program.local("a", Type::FLOAT);

    let lhs = program.read(x);
    let rhs = program.read(y);
    let sum = program.add(lhs, rhs);
    let rhs = program.read(z);
    let product = program.mul(sum, rhs);
    let then_stmt = program.assign(a, product);

    let lhs = program.read(x);
    let rhs = program.read(y);
    let cond = program.binary(Operator::Lt, lhs, rhs);
    let stmt = program.if_(cond, vec![then_stmt], Vec::new());
    program.push(stmt);

    let changed = expect_program_with_opts(
        &passes(),
        &mut program,
        expect![[r#"
            t0 = x < y
            if (t0) {
                t1 = x + y
                a = t1 * z
            }"#]],
    );
    assert!(changed);
}

#[test]
fn texture_and_call_operands() {
    let mut program = Program::new();
    let [x, y, ..] = inputs(&mut program);
    let s = program.uniform("s", Type::SAMPLER_2D);
    let uv = program.input("uv", Type::VEC2);
    let a = program.local("a", Type::VEC4);
    let r = program.local("r", Type::FLOAT);
    let g = program.function("g", &[(Type::FLOAT, ParamMode::In)], Type::FLOAT);

    let lhs = program.read(uv);
    let rhs = program.read(uv);
    let coord = program.mul(lhs, rhs);
    let sample = program.tex(s, coord);
    let stmt = program.assign(a, sample);
    program.push(stmt);

    let lhs = program.read(x);
    let rhs = program.read(y);
    let arg = program.add(lhs, rhs);
    let stmt = program.call(g, vec![arg], Some(r));
    program.push(stmt);

    let changed = expect_program_with_opts(
        &passes(),
        &mut program,
        expect![[r#"
            t0 = uv * uv
            a = tex(s, t0)
            t1 = x + y
            r = g(t1)"#]],
    );
    assert!(changed);
}

#[test]
fn array_indices_in_lvalues() {
    let mut program = Program::new();
    let [x, ..] = inputs(&mut program);
    let i = program.input("i", Type::INT);
    let arr = program.local("arr", Type::array(Type::FLOAT, 4));

    let base = program.read(arr);
    let lhs = program.read(i);
    let rhs = program.constant(Constant::int(1));
    let index = program.add(lhs, rhs);
    let element = program.index(base, index);
    let value = program.read(x);
    let stmt = program.store(element, value);
    program.push(stmt);

    let changed = expect_program_with_opts(
        &passes(),
        &mut program,
        expect![[r#"
            t0 = i + 1
            arr[t0] = x"#]],
    );
    assert!(changed);
}

#[test]
fn deep_nesting_is_reported() {
    let mut program = Program::new();
    let [x, ..] = inputs(&mut program);
    let a = program.local("a", Type::FLOAT);

    let mut value = program.read(x);
    for _ in 0..4 {
        let rhs = program.read(x);
        value = program.add(value, rhs);
    }

    let stmt = program.assign(a, value);
    program.push(stmt);

    let before = program.display().to_string();

    assert_eq!(hoist_subexpressions(&mut program, 2), Err(Error::TooDeep { limit: 2 }));
    assert_eq!(program.diagnostics().len(), 1);
    assert_eq!(program.display().to_string(), before);

    assert_eq!(hoist_subexpressions(&mut program, Config::DEFAULT_MAX_DEPTH), Ok(true));
}

#[test]
fn pass_uses_its_depth_limit() {
    let mut program = Program::new();
    let [x, ..] = inputs(&mut program);
    let a = program.local("a", Type::FLOAT);

    let mut value = program.read(x);
    for _ in 0..4 {
        let rhs = program.read(x);
        value = program.add(value, rhs);
    }

    let stmt = program.assign(a, value);
    program.push(stmt);

    let before = program.display().to_string();

    let config = Config { max_depth: 2, ..Config::default() };
    let shallow = PassManager::with_passes(vec![Pass::HoistSubexpressions(config)]);
    assert!(!shallow.run(&mut program));
    assert_eq!(program.diagnostics().len(), 1);
    assert_eq!(program.display().to_string(), before);

    assert!(passes().run(&mut program));
}
