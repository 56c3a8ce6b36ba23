/// Opaque operator, for foreign ops the engine runs through a plugin.
#[derive(Debug, Clone, PartialEq, new)]
pub struct GenericParams {
    pub op_name: String,
    pub max_input_num: usize,
    pub max_output_num: usize,
}
