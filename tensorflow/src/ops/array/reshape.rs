use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::LoweringContext;
use crate::ops::input;

/// Static reshape. Only the data is wired, the target dimensions live in the
/// operator parameters.
pub fn reshape(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let (data, dims) = (input(ctx, id, 0)?, input(ctx, id, 1)?);
    let dims = ctx.const_value(dims)?.to_i64_vec()?;
    let dims: TVec<i64> = match dims[..] {
        [n, h, w, c] => tvec!(n, c, h, w),
        [_, _] | [_, _, _] => dims.iter().copied().collect(),
        _ => {
            let reason = format!("expected a rank 2 to 4 target shape, found {:?}", dims);
            return Err(ImportError::attribute(&*node.name, "shape", reason).into());
        }
    };
    let target = ctx.target(id)?;
    ctx.wire(target, data)?;
    if dims.iter().all(|&d| d >= 0) {
        let shape: TVec<usize> = dims.iter().map(|&d| d as usize).collect();
        let tensor = ctx.tensor_for(id)?;
        ctx.builder.set_tensor_shape(tensor, &shape)?;
    }
    ctx.set_op(id, ReshapeParams::new(dims))
}
