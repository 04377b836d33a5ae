use crate::instruction::{Lod, Swizzle, Texture};
use crate::{NodeId, Type};

#[test]
fn swizzle_parse() {
    let swizzle = Swizzle::parse("xyzw").unwrap();
    assert_eq!(swizzle.components(), &[0, 1, 2, 3]);
    assert_eq!(swizzle.to_string(), "xyzw");

    let swizzle = Swizzle::parse("bgr").unwrap();
    assert_eq!(swizzle.components(), &[2, 1, 0]);
    assert_eq!(swizzle.to_string(), "zyx");

    assert_eq!(Swizzle::parse(""), None);
    assert_eq!(Swizzle::parse("xyzwx"), None);
    assert_eq!(Swizzle::parse("xq"), None);
}

#[test]
fn texture_operand_order() {
    let mut texture = Texture::sample(NodeId(0), NodeId(1), Type::VEC4);
    texture.sampler_state = Some(NodeId(6));
    texture.offset = Some(NodeId(3));
    texture.lod = Lod::Grad { dpdx: NodeId(4), dpdy: NodeId(5) };
    texture.comparator = Some(NodeId(2));

    let mut seen = Vec::new();
    texture.visit_operands(|it| seen.push(it.0));
    assert_eq!(seen, [0, 1, 2, 3, 4, 5, 6]);

    let mutable: Vec<u32> = texture.operands_mut().into_iter().map(|it| it.0).collect();
    assert_eq!(mutable, seen);
}
