use super::{NodeId, TensorId};
use crate::internal::*;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

/// Memory layout tag of a tensor, as understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    W,
    HW,
    NCHW,
    NHWC,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::W => "W",
            Layout::HW => "HW",
            Layout::NCHW => "NCHW",
            Layout::NHWC => "NHWC",
        }
    }

    /// Layout for a constant of the given rank, if there is a natural one.
    pub fn for_rank(rank: usize) -> Option<Layout> {
        match rank {
            0 | 1 => Some(Layout::W),
            2 => Some(Layout::HW),
            4 => Some(Layout::NHWC),
            _ => None,
        }
    }
}

impl FromStr for Layout {
    type Err = TesselError;
    fn from_str(s: &str) -> TesselResult<Layout> {
        Ok(match s {
            "W" => Layout::W,
            "HW" => Layout::HW,
            "NCHW" => Layout::NCHW,
            "NHWC" => Layout::NHWC,
            _ => bail!("Unknown layout {}", s),
        })
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorKind {
    /// Produced by a node at run time.
    Var,
    /// Carries its own data.
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticTensor {
    pub id: TensorId,
    pub name: String,
    pub kind: TensorKind,
    pub shape: TVec<usize>,
    pub datum_type: DatumType,
    pub layout: Option<Layout>,
    pub data_size: usize,
    pub data: Option<Vec<u8>>,
    pub producer: Option<NodeId>,
    pub consumers: TVec<NodeId>,
}

impl StaticTensor {
    pub fn new(id: TensorId, name: impl Into<String>, kind: TensorKind) -> StaticTensor {
        StaticTensor {
            id,
            name: name.into(),
            kind,
            shape: tvec!(),
            datum_type: DatumType::F32,
            layout: None,
            data_size: 0,
            data: None,
            producer: None,
            consumers: tvec!(),
        }
    }

    pub fn is_const(&self) -> bool {
        self.kind == TensorKind::Const
    }

    /// Decodes the constant payload as a `Tensor`.
    pub fn to_tensor(&self) -> TesselResult<Tensor> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| format_err!("Tensor {} carries no data", self.name))?;
        Tensor::from_raw_bytes(self.datum_type, &self.shape, data.clone())
    }
}

impl fmt::Display for StaticTensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}[{}] {}",
            self.name,
            self.datum_type,
            self.shape.iter().join(","),
            self.layout.map(|l| l.as_str()).unwrap_or("-")
        )?;
        if self.is_const() {
            write!(f, " const({} bytes)", self.data_size)?;
        }
        Ok(())
    }
}
