use std::fmt;

#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Scalar {
    Float,
    Int,
    Uint,
    Bool,
}

impl Scalar {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Float => "",
            Self::Int => "i",
            Self::Uint => "u",
            Self::Bool => "b",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Bool => "bool",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum SamplerDim {
    D1,
    D2,
    D3,
    Cube,
}

#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub struct Field {
    pub name: Box<str>,
    pub ty: Type,
}

#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub enum Type {
    /// The type of statements, `void` in HLSL.
    Void,
    /// Scalars are single lane vectors.
    Vector { scalar: Scalar, lanes: u8 },
    Sampler(SamplerDim),
    Array { element: Box<Type>, len: u32 },
    Record { name: Box<str>, fields: Box<[Field]> },
}

impl Type {
    pub const BOOL: Self = Self::Vector { scalar: Scalar::Bool, lanes: 1 };
    pub const FLOAT: Self = Self::Vector { scalar: Scalar::Float, lanes: 1 };
    pub const INT: Self = Self::Vector { scalar: Scalar::Int, lanes: 1 };
    pub const UINT: Self = Self::Vector { scalar: Scalar::Uint, lanes: 1 };
    pub const VEC2: Self = Self::Vector { scalar: Scalar::Float, lanes: 2 };
    pub const VEC3: Self = Self::Vector { scalar: Scalar::Float, lanes: 3 };
    pub const VEC4: Self = Self::Vector { scalar: Scalar::Float, lanes: 4 };
    pub const SAMPLER_2D: Self = Self::Sampler(SamplerDim::D2);

    #[must_use]
    pub const fn vector(scalar: Scalar, lanes: u8) -> Self {
        assert!(lanes >= 1 && lanes <= 4);
        Self::Vector { scalar, lanes }
    }

    #[must_use]
    pub fn array(element: Type, len: u32) -> Self {
        Self::Array { element: Box::new(element), len }
    }

    /// Number of vector lanes, `0` for anything that isn't a vector.
    #[must_use]
    pub const fn lanes(&self) -> u8 {
        match self {
            Self::Vector { lanes, .. } => *lanes,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn scalar(&self) -> Option<Scalar> {
        match self {
            Self::Vector { scalar, .. } => Some(*scalar),
            _ => None,
        }
    }

    /// The write mask that covers every lane of this type.
    #[must_use]
    pub const fn full_mask(&self) -> u8 {
        match self {
            Self::Vector { lanes, .. } => (1 << *lanes) - 1,
            _ => 0,
        }
    }

    /// The type produced by indexing into a value of this type.
    #[must_use]
    pub fn element(&self) -> Option<Type> {
        match self {
            Self::Array { element, .. } => Some(Type::clone(element)),
            Self::Vector { scalar, lanes } if *lanes > 1 => Some(Self::vector(*scalar, 1)),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self, index: u32) -> Option<&Field> {
        match self {
            Self::Record { fields, .. } => fields.get(index as usize),
            _ => None,
        }
    }

    /// Number of `f64` lanes a value of this type occupies when flattened.
    #[must_use]
    pub fn flat_len(&self) -> usize {
        match self {
            Self::Void => 0,
            Self::Vector { lanes, .. } => usize::from(*lanes),
            Self::Sampler(_) => 1,
            Self::Array { element, len } => element.flat_len() * *len as usize,
            Self::Record { fields, .. } => fields.iter().map(|it| it.ty.flat_len()).sum(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Vector { scalar, lanes: 1 } => f.write_str(scalar.name()),
            Self::Vector { scalar, lanes } => write!(f, "{}vec{lanes}", scalar.prefix()),
            Self::Sampler(SamplerDim::D1) => f.write_str("sampler1D"),
            Self::Sampler(SamplerDim::D2) => f.write_str("sampler2D"),
            Self::Sampler(SamplerDim::D3) => f.write_str("sampler3D"),
            Self::Sampler(SamplerDim::Cube) => f.write_str("samplerCube"),
            Self::Array { element, len } => write!(f, "{element}[{len}]"),
            Self::Record { name, .. } => f.write_str(name),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum Literal {
    Float(f32),
    Int(i32),
    Uint(u32),
    Bool(bool),
}

impl Literal {
    #[must_use]
    pub const fn scalar(self) -> Scalar {
        match self {
            Self::Float(_) => Scalar::Float,
            Self::Int(_) => Scalar::Int,
            Self::Uint(_) => Scalar::Uint,
            Self::Bool(_) => Scalar::Bool,
        }
    }

    #[must_use]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Float(it) => f64::from(it),
            Self::Int(it) => f64::from(it),
            Self::Uint(it) => f64::from(it),
            Self::Bool(it) => f64::from(u8::from(it)),
        }
    }
}

// floats compare by bit pattern: `-0.0` and `0.0` are different literals, equal NaNs are the same one.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(lhs), Self::Float(rhs)) => lhs.to_bits() == rhs.to_bits(),
            (Self::Int(lhs), Self::Int(rhs)) => lhs == rhs,
            (Self::Uint(lhs), Self::Uint(rhs)) => lhs == rhs,
            (Self::Bool(lhs), Self::Bool(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Float(it) => write!(f, "{it:?}"),
            Self::Int(it) => write!(f, "{it}"),
            Self::Uint(it) => write!(f, "{it}u"),
            Self::Bool(it) => write!(f, "{it}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Constant {
    pub ty: Type,
    pub lanes: Vec<Literal>,
}

impl Constant {
    #[must_use]
    pub fn float(value: f32) -> Self {
        Self { ty: Type::FLOAT, lanes: vec![Literal::Float(value)] }
    }

    #[must_use]
    pub fn int(value: i32) -> Self {
        Self { ty: Type::INT, lanes: vec![Literal::Int(value)] }
    }

    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self { ty: Type::BOOL, lanes: vec![Literal::Bool(value)] }
    }

    /// A float vector constant, `lanes.len()` must be in `1..=4`.
    #[must_use]
    pub fn vec(lanes: &[f32]) -> Self {
        let ty = Type::vector(Scalar::Float, lanes.len() as u8);
        Self { ty, lanes: lanes.iter().copied().map(Literal::Float).collect() }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.lanes.as_slice() {
            [single] => single.fmt(f),
            lanes => {
                write!(f, "{}(", self.ty)?;
                for (idx, lane) in lanes.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    lane.fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}
