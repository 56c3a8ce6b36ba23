use tessel_core::internal::*;

use crate::model::{LoweringContext, TfOpRegister};
use crate::ops::{arity, input};

pub fn register_all_ops(reg: &mut TfOpRegister) {
    reg.insert("Abs", |ctx, id| super::nn::unary(ctx, id, "AbsVal"));
    reg.insert("Add", |ctx, id| eltwise(ctx, id, EltwiseKind::Sum));
    reg.insert("AddN", |ctx, id| eltwise(ctx, id, EltwiseKind::Sum));
    reg.insert("BiasAdd", |ctx, id| eltwise(ctx, id, EltwiseKind::Sum));
    reg.insert("MatMul", mat_mul);
    reg.insert("Minimum", |ctx, id| eltwise(ctx, id, EltwiseKind::MinScalar));
    reg.insert("Mul", |ctx, id| eltwise(ctx, id, EltwiseKind::Prod));
    reg.insert("Rsqrt", |ctx, id| eltwise(ctx, id, EltwiseKind::Rsqrt));
    reg.insert("Sub", |ctx, id| eltwise(ctx, id, EltwiseKind::Sub));
}

fn eltwise(ctx: &mut LoweringContext, id: usize, kind: EltwiseKind) -> TesselResult<()> {
    arity(ctx, id, kind.arity())?;
    ctx.wire_all(id)?;
    ctx.set_op(id, EltwiseParams::new(kind))
}

/// `MatMul`, with an optional fused bias as third input.
///
/// Lowered to `Gemm` when the data is transposed, to `FullyConnected`
/// otherwise. Fully connected weights are stored `[n, k]`.
pub fn mat_mul(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let pb = node.def()?;
    let trans_a = pb.get_attr_opt_bool("transpose_a")?.unwrap_or(false);
    let trans_b = pb.get_attr_opt_bool("transpose_b")?.unwrap_or(false);
    let (mut data, mut weights) = (input(ctx, id, 0)?, input(ctx, id, 1)?);
    if ctx.graph.op(data) == "Const" {
        std::mem::swap(&mut data, &mut weights);
    }

    let target = ctx.target(id)?;
    ctx.wire(target, data)?;
    let w = if ctx.graph.op(weights) != "Const" {
        ctx.tensor_for(weights)?
    } else if trans_a || trans_b {
        ctx.const_tensor_with(weights, "hw", |w| Ok((w, Some(Layout::HW))))?
    } else {
        ctx.const_tensor_with(weights, "fc", |w| {
            Ok((w.permute_axes(&[1, 0])?, Some(Layout::HW)))
        })?
    };
    ctx.builder.add_node_input(target, w)?;
    if let Some(&bias) = node.inputs.get(2) {
        ctx.wire(target, bias)?;
    }

    if trans_a {
        return ctx.set_op(id, GemmParams::new(1.0, 1.0, trans_a, trans_b));
    }
    let num_output = ctx.builder.tensor_shape(w)?.first().copied().unwrap_or(0);
    ctx.set_op(id, FcParams::new(num_output))
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::errors::ImportError;
    use crate::tfpb::*;

    fn dense(transpose_b: bool) -> tensorflow::GraphDef {
        let (dims, values) = if transpose_b {
            ([2, 3], vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0])
        } else {
            ([3, 2], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
        };
        graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 3])))
            .node(konst("w", tensor_f32(&dims, values)))
            .node(
                node()
                    .name("fc")
                    .op("MatMul")
                    .input("x")
                    .input("w")
                    .attr("transpose_b", transpose_b),
            )
    }

    #[test]
    fn fully_connected_weights_are_transposed() {
        for transpose_b in [false, true] {
            let model = crate::tensorflow().model_for_graph_def(&dense(transpose_b)).unwrap();
            let w = model.tensor_by_name("w").unwrap();
            assert_eq!(&*w.shape, &[2, 3]);
            assert_eq!(w.layout, Some(Layout::HW));
            let values = w.to_tensor().unwrap().as_vec::<f32>().unwrap();
            assert_eq!(values, vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
            let fc = model.node_by_name("fc").unwrap().op.clone().unwrap();
            assert_eq!(fc.name, "FullyConnected");
            assert_eq!(fc.params, OpParams::Fc(FcParams::new(2)));
        }
    }

    #[test]
    fn shared_weights_get_one_tensor_per_arrangement() {
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 3])))
            .node(konst("w", tensor_f32(&[3, 2], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])))
            .node(node().name("fc1").op("MatMul").input("x").input("w"))
            .node(
                node().name("fc2").op("MatMul").input("x").input("w").attr("transpose_b", true),
            );
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let inputs = |name: &str| -> Vec<String> {
            let node = model.node_by_name(name).unwrap();
            node.inputs.iter().map(|&t| model.tensors[t].name.clone()).collect()
        };
        assert_eq!(inputs("fc1"), vec!["x", "w/fc"]);
        assert_eq!(inputs("fc2"), vec!["x", "w/hw"]);
        let transposed = model.tensor_by_name("w/fc").unwrap();
        assert_eq!(&*transposed.shape, &[2, 3]);
        let values = transposed.to_tensor().unwrap().as_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
        assert_eq!(&*model.tensor_by_name("w/hw").unwrap().shape, &[3, 2]);
        let natural = model.tensor_by_name("w").unwrap();
        assert_eq!(&*natural.shape, &[3, 2]);
        assert!(natural.consumers.is_empty());
    }

    #[test]
    fn eltwise_arity_is_checked() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("y").op("Placeholder"))
            .node(node().name("z").op("Placeholder"))
            .node(node().name("sum").op("AddN").input("x").input("y").input("z"));
        let err = crate::tensorflow().model_for_graph_def(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::PatternMismatch { node, .. }) if node == "sum"
        ));
    }

    #[test]
    fn min_is_a_scalar_min() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(konst("cap", tensor_f32(&[], vec![3.0])))
            .node(node().name("min").op("Minimum").input("x").input("cap"));
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let min = model.node_by_name("min").unwrap();
        assert_eq!(min.inputs.len(), 2);
        let expected = OpParams::Eltwise(EltwiseParams::new(EltwiseKind::MinScalar));
        assert_eq!(min.op.as_ref().unwrap().params, expected);
    }
}
