#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EltwiseKind {
    Sum,
    Prod,
    Sub,
    Rsqrt,
    MinScalar,
}

impl EltwiseKind {
    /// Number of operands the engine kernel expects.
    pub fn arity(&self) -> usize {
        match self {
            EltwiseKind::Rsqrt => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct EltwiseParams {
    pub kind: EltwiseKind,
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct GemmParams {
    pub alpha: f32,
    pub beta: f32,
    pub trans_a: bool,
    pub trans_b: bool,
}

impl Default for GemmParams {
    fn default() -> GemmParams {
        GemmParams { alpha: 1.0, beta: 1.0, trans_a: false, trans_b: false }
    }
}

#[derive(Debug, Clone, PartialEq, Default, new)]
pub struct FcParams {
    pub num_output: usize,
}
