use std::fmt;

use crate::{NodeId, Type};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum TextureOp {
    /// Regular sample.
    Tex,
    /// Sample with lod bias.
    Txb,
    /// Sample at an explicit lod.
    Txl,
    /// Sample with explicit gradients.
    Txd,
    /// Texel fetch.
    Txf,
    /// Texture size query.
    Txs,
    /// Lod query.
    Lod,
    Gather,
}

impl fmt::Display for TextureOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Tex => "tex",
            Self::Txb => "txb",
            Self::Txl => "txl",
            Self::Txd => "txd",
            Self::Txf => "txf",
            Self::Txs => "txs",
            Self::Lod => "lod",
            Self::Gather => "gather",
        })
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Lod {
    None,
    Bias(NodeId),
    Level(NodeId),
    Grad { dpdx: NodeId, dpdy: NodeId },
    Sample(NodeId),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Texture {
    pub op: TextureOp,
    /// Component selected by `gather`.
    pub channel: Option<u8>,
    pub sampler: NodeId,
    pub coordinate: Option<NodeId>,
    pub projector: Option<NodeId>,
    pub comparator: Option<NodeId>,
    pub offset: Option<NodeId>,
    pub lod: Lod,
    pub sampler_state: Option<NodeId>,
    pub ty: Type,
}

impl Texture {
    /// A plain `tex(sampler, coordinate)` returning `ty`.
    #[must_use]
    pub fn sample(sampler: NodeId, coordinate: NodeId, ty: Type) -> Self {
        Self {
            op: TextureOp::Tex,
            channel: None,
            sampler,
            coordinate: Some(coordinate),
            projector: None,
            comparator: None,
            offset: None,
            lod: Lod::None,
            sampler_state: None,
            ty,
        }
    }

    /// Visits operands in canonical order:
    /// sampler, coordinate, projector, comparator, offset, lod operands, sampler state.
    pub fn visit_operands<F: FnMut(NodeId)>(&self, mut visit: F) {
        visit(self.sampler);

        for it in [self.coordinate, self.projector, self.comparator, self.offset].into_iter().flatten()
        {
            visit(it);
        }

        match self.lod {
            Lod::None => {}
            Lod::Bias(it) | Lod::Level(it) | Lod::Sample(it) => visit(it),
            Lod::Grad { dpdx, dpdy } => {
                visit(dpdx);
                visit(dpdy);
            }
        }

        if let Some(it) = self.sampler_state {
            visit(it);
        }
    }

    /// Same order as [`Texture::visit_operands`].
    #[must_use]
    pub fn operands_mut(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = vec![&mut self.sampler];

        out.extend(
            [&mut self.coordinate, &mut self.projector, &mut self.comparator, &mut self.offset]
                .into_iter()
                .filter_map(Option::as_mut),
        );

        match &mut self.lod {
            Lod::None => {}
            Lod::Bias(it) | Lod::Level(it) | Lod::Sample(it) => out.push(it),
            Lod::Grad { dpdx, dpdy } => {
                out.push(dpdx);
                out.push(dpdy);
            }
        }

        out.extend(self.sampler_state.as_mut());
        out
    }
}
