use crate::model::TfOpRegister;

mod concatv2;
mod reshape;

pub fn register_all_ops(reg: &mut TfOpRegister) {
    reg.insert("ConcatV2", concatv2::concat_v2);
    reg.insert("Reshape", reshape::reshape);
}
