use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::LoweringContext;
use crate::ops::{input, padding, spatial};

pub fn pool(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let pb = node.def()?;
    let (kernel_h, kernel_w) = spatial(pb, "ksize", 1)?;
    let (stride_h, stride_w) = spatial(pb, "strides", 1)?;
    let pad = padding(pb)?;
    let method = if node.op == "AvgPool" { PoolMethod::Avg } else { PoolMethod::Max };
    let params = PoolParams {
        method,
        kernel_h,
        kernel_w,
        stride_h,
        stride_w,
        pad_h: pad,
        pad_w: pad,
        global: false,
    };
    let target = ctx.target(id)?;
    ctx.wire(target, input(ctx, id, 0)?)?;
    ctx.set_op(id, params)
}

/// `Mean` over the spatial axes, as a global average pooling. The reduction
/// axes were detached into the last definition beforehand.
pub fn mean(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let axes = if node.defs.len() > 1 {
        LoweringContext::def_value(node.last_def()?)?.to_i64_vec()?
    } else {
        vec![]
    };
    if axes != [1, 2] {
        let reason = format!("only spatial [1, 2] reductions are pools, found {:?}", axes);
        return Err(ImportError::attribute(&*node.name, "axes", reason).into());
    }
    let target = ctx.target(id)?;
    ctx.wire(target, input(ctx, id, 0)?)?;
    ctx.set_op(id, PoolParams::global_avg())
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::errors::ImportError;
    use crate::tfpb::*;

    fn reduce(axes: Vec<i32>) -> tensorflow::GraphDef {
        graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 7, 7, 8])))
            .node(konst("axes", tensor_i32(&[2], axes)))
            .node(node().name("gap").op("Mean").input("x").input("axes"))
    }

    #[test]
    fn spatial_mean_is_a_global_pool() {
        let model = crate::tensorflow().model_for_graph_def(&reduce(vec![1, 2])).unwrap();
        let gap = model.node_by_name("gap").unwrap();
        assert_eq!(gap.inputs.len(), 1);
        assert_eq!(gap.op.as_ref().unwrap().params, OpParams::Pool(PoolParams::global_avg()));
    }

    #[test]
    fn channel_mean_is_refused() {
        let err = crate::tensorflow().model_for_graph_def(&reduce(vec![0, 3])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::AttributeDecode { attr, .. }) if attr == "axes"
        ));
    }

    #[test]
    fn max_pool_same() {
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 8, 8, 3])))
            .node(
                node()
                    .name("pool")
                    .op("MaxPool")
                    .input("x")
                    .attr("ksize", vec![1i64, 3, 3, 1])
                    .attr("strides", vec![1i64, 2, 2, 1])
                    .attr("padding", "SAME"),
            );
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let op = model.node_by_name("pool").unwrap().op.clone().unwrap();
        assert_eq!(op.name, "Pooling");
        let OpParams::Pool(p) = op.params else { panic!() };
        assert_eq!(p.method, PoolMethod::Max);
        assert_eq!((p.kernel_h, p.kernel_w, p.stride_h, p.pad_h), (3, 3, 2, PAD_SAME));
    }
}
