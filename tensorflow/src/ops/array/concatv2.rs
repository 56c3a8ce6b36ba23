use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::LoweringContext;

/// NHWC axis to NCHW axis.
const NHWC_TO_NCHW: [i32; 4] = [0, 2, 3, 1];

/// The axis operand was moved to the last definition by the rewrite
/// pipeline, every remaining input is data.
pub fn concat_v2(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    if node.defs.len() < 2 {
        return Err(ImportError::pattern(&*node.name, "a constant concatenation axis").into());
    }
    let axis = LoweringContext::def_value(node.last_def()?)?.to_i64_vec()?;
    let axis = match axis.first() {
        Some(&a) if (-4..4).contains(&a) => NHWC_TO_NCHW[a.rem_euclid(4) as usize],
        _ => {
            let reason = format!("expected an axis of a rank 4 tensor, found {:?}", axis);
            return Err(ImportError::attribute(&*node.name, "axis", reason).into());
        }
    };
    trace!("{} concatenates along NCHW axis {}", node, axis);
    ctx.wire_all(id)?;
    ctx.set_op(id, ConcatParams::new(axis))
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::tfpb::*;

    fn concat(axis: i32) -> OpParams {
        let g = graph()
            .node(node().name("a").op("Placeholder").attr("shape", shape(&[1, 4, 4, 2])))
            .node(node().name("b").op("Placeholder").attr("shape", shape(&[1, 4, 4, 3])))
            .node(konst("axis", tensor_i32(&[], vec![axis])))
            .node(node().name("cat").op("ConcatV2").input("a").input("b").input("axis"));
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let cat = model.node_by_name("cat").unwrap();
        assert_eq!(cat.inputs.len(), 2);
        cat.op.clone().unwrap().params
    }

    #[test]
    fn channel_axis_maps_to_one() {
        assert_eq!(concat(3), OpParams::Concat(ConcatParams::new(1)));
        assert_eq!(concat(-1), OpParams::Concat(ConcatParams::new(1)));
        assert_eq!(concat(1), OpParams::Concat(ConcatParams::new(2)));
    }
}
