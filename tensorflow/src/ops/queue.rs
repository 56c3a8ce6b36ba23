use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::{LoweringContext, TfOpRegister};

pub fn register_all_ops(reg: &mut TfOpRegister) {
    reg.insert("FIFOQueueV2", fifo_queue);
}

/// A queue fused with its dequeue is a graph input shaped after the first
/// component of the queue.
fn fifo_queue(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let shapes = node.def()?.get_attr_list_shape("shapes")?;
    let Some(first) = shapes.first() else {
        return Err(ImportError::attribute(&*node.name, "shapes", "no component shape").into());
    };
    let shape: TVec<usize> = first.iter().map(|&d| d.max(1) as usize).collect();
    debug!("{} feeds {:?}", node, shape);
    ctx.source(id, &shape, DatumType::F32)
}
