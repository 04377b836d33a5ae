use std::fmt;

/// Hands out sequential ids for one of the arenas in a [`Program`](crate::Program).
#[derive(Debug, Clone)]
pub struct IdAllocator<T> {
    next_id: u32,
    make: fn(u32) -> T,
}

impl<T> IdAllocator<T> {
    #[must_use]
    pub const fn new(make: fn(u32) -> T) -> Self {
        Self::with_start(0, make)
    }

    #[must_use]
    pub const fn with_start(start: u32, make: fn(u32) -> T) -> Self {
        Self { next_id: start, make }
    }

    #[must_use = "ignoring the return of this function will leak an ID slot and is almost never what you want"]
    pub fn allocate(&mut self) -> T {
        let id_num = self.next_id;

        assert!(id_num < u32::MAX);

        self.next_id += 1;
        (self.make)(id_num)
    }

    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.next_id
    }
}

/// A node in the instruction arena.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct SignatureId(pub(crate) u32);

impl SignatureId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SignatureId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fn{}", self.0)
    }
}
