//! Operators of the static graph: an engine-side name and a parameter set.
use std::fmt;

pub mod array;
pub mod generic;
pub mod math;
pub mod nn;
pub mod rec;

use self::array::{ConcatParams, ReshapeParams};
use self::generic::GenericParams;
use self::math::{EltwiseParams, FcParams, GemmParams};
use self::nn::{
    BatchNormParams, ConvParams, PoolParams, ReluParams, ResizeParams, SoftmaxParams,
};
use self::rec::LstmParams;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpParams {
    #[default]
    None,
    Conv(ConvParams),
    Pool(PoolParams),
    BatchNorm(BatchNormParams),
    Softmax(SoftmaxParams),
    Relu(ReluParams),
    Resize(ResizeParams),
    Concat(ConcatParams),
    Eltwise(EltwiseParams),
    Reshape(ReshapeParams),
    Gemm(GemmParams),
    Fc(FcParams),
    Lstm(LstmParams),
    Generic(GenericParams),
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct StaticOp {
    pub name: String,
    pub params: OpParams,
}

impl StaticOp {
    /// An operator without parameters (InputOp, ReLu6, Sigmoid...).
    pub fn bare(name: impl Into<String>) -> StaticOp {
        StaticOp { name: name.into(), params: OpParams::None }
    }
}

impl fmt::Display for StaticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.params {
            OpParams::None => write!(f, "{}", self.name),
            params => write!(f, "{} {:?}", self.name, params),
        }
    }
}

macro_rules! op_params {
    ($($params:ident => $variant:ident as $name:expr),* $(,)?) => {
        $(
            impl From<$params> for OpParams {
                fn from(p: $params) -> OpParams {
                    OpParams::$variant(p)
                }
            }

            impl From<$params> for StaticOp {
                fn from(p: $params) -> StaticOp {
                    StaticOp::new($name.to_string(), OpParams::$variant(p))
                }
            }
        )*
    }
}

op_params!(
    ConvParams => Conv as "Convolution",
    PoolParams => Pool as "Pooling",
    BatchNormParams => BatchNorm as "BatchNormalization",
    SoftmaxParams => Softmax as "Softmax",
    ReluParams => Relu as "ReLu",
    ResizeParams => Resize as "Resize",
    ConcatParams => Concat as "Concat",
    EltwiseParams => Eltwise as "Eltwise",
    ReshapeParams => Reshape as "Reshape",
    GemmParams => Gemm as "Gemm",
    FcParams => Fc as "FullyConnected",
    LstmParams => Lstm as "LSTM",
    GenericParams => Generic as "Generic",
);
