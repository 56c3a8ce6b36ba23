/// Parameters of a fused LSTM layer.
///
/// Inputs are, in order: data, kernel, then bias, the three peephole
/// diagonals, projection and the two initial states, each present only when
/// the matching flag is set.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmParams {
    pub forget_bias: f32,
    pub cell_size: usize,
    pub hidden_size: usize,
    pub input_size: usize,
    pub has_bias: bool,
    pub has_peephole: bool,
    pub has_projection: bool,
    pub has_init_state: bool,
}

impl Default for LstmParams {
    fn default() -> LstmParams {
        LstmParams {
            forget_bias: 1.0,
            cell_size: 0,
            hidden_size: 0,
            input_size: 0,
            has_bias: false,
            has_peephole: false,
            has_projection: false,
            has_init_state: false,
        }
    }
}
