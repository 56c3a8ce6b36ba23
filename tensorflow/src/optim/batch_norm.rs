//! Recognition of batch normalizations that TensorFlow inlined as plain
//! arithmetic.
//!
//! With `gamma`, the expansion reads:
//!
//! ```text
//! add   = var + eps          mul_1 = x * mul
//! rsqrt = rsqrt(add)         mul_2 = mean * mul
//! mul   = rsqrt * gamma      sub   = beta - mul_2
//!                            add_1 = mul_1 + sub
//! ```
//!
//! Without it, `mul` is `x * rsqrt` and `mul_1` is `mean * rsqrt`. The whole
//! tree folds into `add_1`, leaving it with inputs
//! `[x, gamma, var, eps, beta, mean]` (`gamma` absent in the second form).
use tessel_core::internal::*;

use super::TfPass;
use crate::graph::{BnVariant, TfGraph};

#[derive(Clone, Debug, Default)]
pub struct FuseComposedBatchNorm;

impl FuseComposedBatchNorm {
    fn variant(graph: &TfGraph, id: usize) -> Option<BnVariant> {
        let node = &graph.nodes[id];
        if node.op != "Add" || !node.name.contains("/add_1") || node.inputs.len() != 2 {
            return None;
        }
        let (mul, sub) = (node.inputs[0], node.inputs[1]);
        if graph.op(mul) != "Mul" || graph.op(sub) != "Sub" {
            return None;
        }
        if graph.name(mul).contains("/mul_1") || graph.name(sub).contains("/mul_1") {
            Some(BnVariant::WithGamma)
        } else {
            Some(BnVariant::WithoutGamma)
        }
    }

    /// Merges the operand tree of `id` into it, depth first.
    fn absorb(
        graph: &mut TfGraph,
        id: usize,
        variant: BnVariant,
        absorbed: &mut Vec<usize>,
    ) -> TesselResult<()> {
        let name = graph.nodes[id].name.clone();
        let mut skip_first = false;
        if name.contains("/mul") {
            match variant {
                BnVariant::WithGamma if name.contains("/mul_1") => skip_first = true,
                BnVariant::WithGamma if !name.contains("/mul_2") => {
                    // mul also feeds mul_2, which reaches add_1 through sub
                    let mul_2 = graph.nodes[id]
                        .outputs
                        .iter()
                        .copied()
                        .find(|&o| graph.name(o).contains("/mul_2"));
                    if let Some(mul_2) = mul_2 {
                        graph.remove_edge(id, mul_2)?;
                    }
                }
                BnVariant::WithGamma => (),
                BnVariant::WithoutGamma if name.contains("/mul_1") => {
                    // the rsqrt branch was already taken over by add_1
                    let fused = graph.nodes[id]
                        .inputs
                        .iter()
                        .copied()
                        .find(|&i| graph.name(i).contains("/add_1"));
                    if let Some(fused) = fused {
                        graph.remove_edge(fused, id)?;
                    }
                }
                BnVariant::WithoutGamma => skip_first = true,
            }
        }

        let inputs = graph.nodes[id].inputs.clone();
        for (ix, input) in inputs.into_iter().enumerate() {
            if ix == 0 && skip_first {
                continue;
            }
            graph.nodes[input].bn_variant = Some(variant);
            if graph.op(input) == "Const" || absorbed.contains(&input) {
                continue;
            }
            Self::absorb(graph, input, variant, absorbed)?;
            if graph.nodes[id].inputs.contains(&input) {
                graph.merge_parent(id, input)?;
                absorbed.push(input);
            }
        }
        Ok(())
    }
}

impl TfPass for FuseComposedBatchNorm {
    fn name(&self) -> &'static str {
        "fuse-composed-batch-norm"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            if graph.nodes[id].removed {
                continue;
            }
            let Some(variant) = Self::variant(graph, id) else { continue };
            graph.nodes[id].bn_variant = Some(variant);
            let mut absorbed = vec![];
            Self::absorb(graph, id, variant, &mut absorbed)?;
            for a in absorbed {
                graph.remove_if_isolated(a)?;
            }
            let node = &mut graph.nodes[id];
            node.op = "ComposedBN".to_string();
            node.name = node.name.replacen("/add_1", "/bn.fused", 1);
            let inputs = node.inputs.clone();
            for input in inputs {
                if graph.nodes[input].name.contains("/add/y") {
                    graph.nodes[input].skip_materialization = true;
                }
            }
            debug!("Fused {:?} batch norm into {}", variant, graph.nodes[id]);
            done += 1;
        }
        Ok(done)
    }
}
