use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::graph::BnVariant;
use crate::model::LoweringContext;

/// Inputs are `x, gamma, beta, mean, variance`, in both foreign and engine
/// order.
pub fn fused_batch_norm(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    if node.inputs.len() < 5 {
        let expected = format!("{} with 5 inputs, found {}", node.op, node.inputs.len());
        return Err(ImportError::pattern(&*node.name, expected).into());
    }
    let eps = node.def()?.get_attr_opt_float::<f32>("epsilon")?.unwrap_or(0.001);
    let target = ctx.target(id)?;
    for &input in &node.inputs[..5] {
        ctx.wire(target, input)?;
    }
    ctx.set_op(id, BatchNormParams::new(eps))
}

/// A batch normalization recovered from its arithmetic expansion.
///
/// Foreign inputs come in absorption order: `x, gamma, variance, epsilon,
/// beta, mean`, gamma being absent from the variant without scale. Epsilon
/// is read from its constant and never wired.
pub fn composed_batch_norm(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let with_gamma = node.bn_variant == Some(BnVariant::WithGamma);
    let shift = usize::from(with_gamma);
    if node.inputs.len() < 5 + shift {
        return Err(ImportError::pattern(&*node.name, "a complete batch normalization").into());
    }
    let x = node.inputs[0];
    let gamma = with_gamma.then(|| node.inputs[1]);
    let [var, add_y, beta, mean] = [1, 2, 3, 4].map(|ix| node.inputs[ix + shift]);

    let eps = match ctx.const_value(add_y)?.to_f32_vec()?.first() {
        Some(&eps) => eps,
        None => {
            return Err(ImportError::attribute(&*node.name, "epsilon", "empty constant").into());
        }
    };

    let target = ctx.target(id)?;
    ctx.wire(target, x)?;
    if let Some(gamma) = gamma {
        ctx.wire(target, gamma)?;
    } else {
        let var_tensor = ctx.tensor_for(var)?;
        let dims = ctx.builder.tensor_shape(var_tensor)?;
        let ones = Tensor::from_shape(&dims, &vec![1.0f32; dims.iter().product()])?;
        let name = node.name.replacen("bn.fused", "gamma", 1);
        ctx.feed_const(target, &name, ones, Some(Layout::W))?;
    }
    for input in [beta, mean, var] {
        ctx.wire(target, input)?;
    }
    ctx.set_op(id, BatchNormParams::new(eps))
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::tfpb::*;

    #[test]
    fn epsilon_defaults() {
        let c = |name: &str| konst(name, tensor_f32(&[2], vec![1.0, 2.0]));
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 4, 4, 2])))
            .node(c("gamma"))
            .node(c("beta"))
            .node(c("mean"))
            .node(c("var"))
            .node(
                node()
                    .name("bn")
                    .op("FusedBatchNorm")
                    .input("x")
                    .input("gamma")
                    .input("beta")
                    .input("mean")
                    .input("var"),
            );
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let bn = model.node_by_name("bn").unwrap();
        let params = &bn.op.as_ref().unwrap().params;
        assert_eq!(params, &OpParams::BatchNorm(BatchNormParams::new(0.001)));
        let names: Vec<&str> = bn.inputs.iter().map(|&t| &*model.tensors[t].name).collect();
        assert_eq!(names, vec!["x", "gamma", "beta", "mean", "var"]);
    }
}
