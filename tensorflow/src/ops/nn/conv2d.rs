use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::LoweringContext;
use crate::ops::{input, padding, spatial};

/// `Conv2D` and `DepthwiseConv2dNative`, with an optional fused bias as
/// third input and an optional fused `Pad` as last definition.
pub fn conv2d(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let pb = node.def()?;
    let depthwise = node.op == "DepthwiseConv2dNative";
    let (data, weights) = (input(ctx, id, 0)?, input(ctx, id, 1)?);

    let (kh, kw, ci, co) = match *ctx.const_value(weights)?.shape() {
        [h, w, i, o] => (h, w, i, o),
        [w, i, o] => (1, w, i, o),
        ref other => {
            let reason = format!("expected a rank 3 or 4 kernel, found {:?}", other);
            return Err(ImportError::attribute(&*node.name, "filter", reason).into());
        }
    };

    let (stride_h, stride_w) = spatial(pb, "strides", 1)?;
    let (dilation_h, dilation_w) = spatial(pb, "dilations", 1)?;
    let pad = padding(pb)?;
    let (output_channel, group) = if depthwise { (ci * co, ci) } else { (co, 1) };
    let mut params = ConvParams {
        kernel_h: kh,
        kernel_w: kw,
        stride_h,
        stride_w,
        dilation_h,
        dilation_w,
        pad_h: pad,
        pad_w: pad,
        pads: None,
        output_channel,
        group,
    };
    if node.defs.len() > 1 {
        let last = node.last_def()?;
        if last.op == "Const" {
            params.pads = Some(explicit_pads(&LoweringContext::def_value(last)?)?);
        }
    }

    let target = ctx.target(id)?;
    ctx.wire(target, data)?;
    let arrangement = if depthwise { "depthwise" } else { "oihw" };
    let w = ctx.const_tensor_with(weights, arrangement, |kernel| {
        // HWIO to OIHW, depthwise multipliers grouped per input channel
        let kernel = kernel.into_shape(&[kh, kw, ci, co])?;
        let oihw = if depthwise {
            kernel.permute_axes(&[2, 3, 0, 1])?.into_shape(&[ci * co, 1, kh, kw])?
        } else {
            kernel.permute_axes(&[3, 2, 0, 1])?
        };
        Ok((oihw, Some(Layout::NCHW)))
    })?;
    ctx.builder.add_node_input(target, w)?;
    if let Some(&bias) = node.inputs.get(2) {
        ctx.wire(target, bias)?;
    }
    debug!("{} lowered with {:?}", node, params);
    ctx.set_op(id, params)
}

/// Spatial pads out of a `[4, 2]` NHWC paddings constant, as
/// `[top, left, bottom, right]`.
fn explicit_pads(paddings: &Tensor) -> TesselResult<[usize; 4]> {
    ensure!(paddings.shape() == [4, 2], "Expected [4, 2] paddings, found {:?}", paddings.shape());
    let p = paddings.to_i64_vec()?;
    let p: TVec<usize> = p.iter().map(|&x| x.max(0) as usize).collect();
    Ok([p[2], p[4], p[3], p[5]])
}
