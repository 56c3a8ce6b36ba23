use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::{LoweringContext, TfOpRegister};
use crate::tfpb::tensorflow::NodeDef;

pub mod array;
pub mod math;
pub mod nn;
pub mod queue;
pub mod rec;

pub fn register_all_ops(reg: &mut TfOpRegister) {
    array::register_all_ops(reg);
    math::register_all_ops(reg);
    nn::register_all_ops(reg);
    queue::register_all_ops(reg);
    rec::register_all_ops(reg);
    reg.allow_generic("DecodeWav");
    reg.allow_generic("AudioSpectrogram");
    reg.allow_generic("Mfcc");
}

/// Opaque passthrough: op name and arities are all the engine gets.
pub fn generic(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    ctx.wire_all(id)?;
    let params = GenericParams::new(node.op.clone(), node.inputs.len(), node.outputs.len());
    ctx.set_op(id, params)
}

/// Nth foreign input of a node, or a pattern error.
pub(crate) fn input(ctx: &LoweringContext, id: usize, ix: usize) -> TesselResult<usize> {
    crate::optim::input(ctx.graph, id, ix)
}

pub(crate) fn arity(ctx: &LoweringContext, id: usize, expected: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    if node.inputs.len() != expected {
        let expected = format!("{} with {} inputs, found {}", node.op, expected, node.inputs.len());
        return Err(ImportError::pattern(&*node.name, expected).into());
    }
    Ok(())
}

/// Spatial (height, width) pair out of a 4-item attribute.
pub(crate) fn spatial(pb: &NodeDef, attr: &str, default: usize) -> TesselResult<(usize, usize)> {
    let Some(values) = pb.get_attr_opt_list_int::<usize>(attr)? else {
        return Ok((default, default));
    };
    if values.len() != 4 {
        return Err(ImportError::attribute(
            &*pb.name,
            attr,
            format!("expected 4 values, found {:?}", values),
        )
        .into());
    }
    let nchw = pb.get_attr_opt_raw_str("data_format")?.is_some_and(|f| f == b"NCHW");
    Ok(if nchw { (values[2], values[3]) } else { (values[1], values[2]) })
}

/// `0` for VALID, `PAD_SAME` for SAME.
pub(crate) fn padding(pb: &NodeDef) -> TesselResult<i32> {
    match pb.get_attr_raw_str("padding")? {
        b"VALID" => Ok(0),
        b"SAME" => Ok(PAD_SAME),
        s => Err(ImportError::attribute(
            &*pb.name,
            "padding",
            format!("unsupported padding {}", String::from_utf8_lossy(s)),
        )
        .into()),
    }
}
