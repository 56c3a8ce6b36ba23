use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::{LoweringContext, TfOpRegister};

pub mod conv2d;
pub mod fused_batch_norm;
pub mod pools;

pub fn register_all_ops(reg: &mut TfOpRegister) {
    reg.insert("AvgPool", pools::pool);
    reg.insert("ComposedBN", fused_batch_norm::composed_batch_norm);
    reg.insert("Conv2D", conv2d::conv2d);
    reg.insert("DepthwiseConv2dNative", conv2d::conv2d);
    reg.insert("FusedBatchNorm", fused_batch_norm::fused_batch_norm);
    reg.insert("FusedBatchNormV3", fused_batch_norm::fused_batch_norm);
    reg.insert("MaxPool", pools::pool);
    reg.insert("Mean", pools::mean);
    reg.insert("Relu", relu);
    reg.insert("Relu6", relu6);
    reg.insert("ResizeNearestNeighbor", resize_nearest_neighbor);
    reg.insert("Sigmoid", |ctx, id| unary(ctx, id, "Sigmoid"));
    reg.insert("Softmax", softmax);
    reg.insert("Tanh", |ctx, id| unary(ctx, id, "TanH"));
}

/// Single input, parameterless engine op.
pub(crate) fn unary(ctx: &mut LoweringContext, id: usize, op: &str) -> TesselResult<()> {
    let target = ctx.target(id)?;
    ctx.wire(target, super::input(ctx, id, 0)?)?;
    ctx.set_op(id, StaticOp::bare(op))
}

fn relu(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let target = ctx.target(id)?;
    ctx.wire(target, super::input(ctx, id, 0)?)?;
    ctx.set_op(id, ReluParams::new(0.0))
}

fn relu6(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    // the bound of the folded Minimum, when there was one
    let last = node.last_def()?;
    if node.defs.len() > 1 && last.op == "Const" {
        let bound = LoweringContext::def_value(last)?.to_f32_vec()?;
        if bound.iter().any(|&b| b != 6.0) {
            let reason = format!("Minimum bound must be 6, found {:?}", bound);
            return Err(ImportError::attribute(&*node.name, "bound", reason).into());
        }
    }
    unary(ctx, id, "ReLu6")
}

fn softmax(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let target = ctx.target(id)?;
    ctx.wire(target, super::input(ctx, id, 0)?)?;
    ctx.set_op(id, SoftmaxParams::new(1))
}

fn resize_nearest_neighbor(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let target = ctx.target(id)?;
    ctx.wire(target, super::input(ctx, id, 0)?)?;
    let mut params = ResizeParams::default();
    let factor = node.last_def()?;
    if node.defs.len() > 1 && factor.op == "Const" {
        let scale = LoweringContext::def_value(factor)?.to_f32_vec()?;
        match scale[..] {
            [s] => params = ResizeParams::new(s, s),
            [h, w] => params = ResizeParams::new(h, w),
            _ => {
                let reason = format!("expected one or two scale factors, found {:?}", scale);
                return Err(ImportError::attribute(&*node.name, "scale", reason).into());
            }
        }
    }
    ctx.set_op(id, params)
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::errors::ImportError;
    use crate::tfpb::*;

    #[test]
    fn relu6_needs_six() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("relu").op("Relu").input("x"))
            .node(konst("bound", tensor_f32(&[], vec![4.0])))
            .node(node().name("min").op("Minimum").input("relu").input("bound"));
        let err = crate::tensorflow().model_for_graph_def(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::AttributeDecode { .. })
        ));
    }

    fn op_name(model: &StaticGraph, name: &str) -> String {
        model.node_by_name(name).unwrap().op.as_ref().unwrap().name.to_string()
    }

    #[test]
    fn relu6_with_a_merged_identity() {
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 4])))
            .node(node().name("act").op("Relu6").input("x"))
            .node(node().name("id").op("Identity").input("act"))
            .node(node().name("prob").op("Softmax").input("id"));
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        assert_eq!(op_name(&model, "act"), "ReLu6");
        assert!(model.node_by_name("id").is_err());
    }

    #[test]
    fn relu6_feeding_a_flattened_dense_layer() {
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 2, 2, 1])))
            .node(node().name("act").op("Relu6").input("x"))
            .node(konst("flat_shape", tensor_i32(&[2], vec![1, -1])))
            .node(node().name("flat").op("Reshape").input("act").input("flat_shape"))
            .node(konst("w", tensor_f32(&[4, 3], vec![1.0])))
            .node(node().name("fc").op("MatMul").input("flat").input("w"));
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        assert_eq!(op_name(&model, "act"), "ReLu6");
        assert_eq!(op_name(&model, "fc"), "FullyConnected");
    }

    #[test]
    fn resize_takes_its_scale_from_the_folded_factor() {
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 8, 8, 3])))
            .node(node().name("shape").op("Shape").input("x"))
            .node(konst("begin", tensor_i32(&[1], vec![1])))
            .node(node().name("slice").op("StridedSlice").input("shape").input("begin"))
            .node(konst("factor", tensor_i32(&[2], vec![3, 3])))
            .node(node().name("mul").op("Mul").input("slice").input("factor"))
            .node(node().name("up").op("ResizeNearestNeighbor").input("x").input("mul"));
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let up = model.node_by_name("up").unwrap();
        let op = up.op.as_ref().unwrap();
        assert_eq!(op.params, OpParams::Resize(ResizeParams::new(3.0, 3.0)));
        assert_eq!(up.inputs.len(), 1);
    }
}
