use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::model::{LoweringContext, TfOpRegister};
use crate::ops::input;

pub fn register_all_ops(reg: &mut TfOpRegister) {
    reg.insert("LSTM", lstm);
}

/// A folded LSTM layer.
///
/// Engine inputs are the data, then the populated weight slots in a fixed
/// order. Zero states become constants named after the layer.
pub fn lstm(ctx: &mut LoweringContext, id: usize) -> TesselResult<()> {
    let node = ctx.node(id)?;
    let Some(cell) = node.recurrent() else {
        return Err(ImportError::pattern(&*node.name, "a folded recurrent layer").into());
    };
    let Some(kernel) = cell.kernel else {
        return Err(ImportError::pattern(&*node.name, "an LSTM kernel").into());
    };
    let mut params = LstmParams::default();
    let target = ctx.target(id)?;
    ctx.wire(target, input(ctx, id, 0)?)?;
    let kernel = ctx.wire(target, kernel)?;
    if let Some(bias) = cell.bias {
        params.has_bias = true;
        ctx.wire(target, bias)?;
    }
    if let Some(w_f_diag) = cell.w_f_diag {
        params.has_peephole = true;
        ctx.wire(target, w_f_diag)?;
    }
    for diag in [cell.w_i_diag, cell.w_o_diag].into_iter().flatten() {
        ctx.wire(target, diag)?;
    }
    let projection = match cell.projection {
        Some(p) => {
            params.has_projection = true;
            Some(ctx.wire(target, p)?)
        }
        None => None,
    };
    if let Some(init_h) = cell.init_h {
        let Some(init_c) = cell.init_c else {
            return Err(ImportError::pattern(&*node.name, "a cell zero state").into());
        };
        params.has_init_state = true;
        for (state, suffix) in [(init_c, "init_c"), (init_h, "init_h")] {
            let value = zero_state(ctx, state)
                .with_context(|| format!("Loading {} of {}", suffix, node.name))?;
            ctx.feed_const(target, &format!("{}/{}", node.name, suffix), value, Some(Layout::W))?;
        }
    }
    if let Some(forget_bias) = cell.forget_bias {
        params.forget_bias = first_f32(ctx, forget_bias)?;
    }

    let dims = ctx.builder.tensor_shape(kernel)?;
    let &[data_size, gates] = &*dims else {
        let reason = format!("expected a rank 2 kernel, found {:?}", dims);
        return Err(ImportError::attribute(&*node.name, "kernel", reason).into());
    };
    params.cell_size = gates / 4;
    params.hidden_size = match projection {
        Some(p) => ctx.builder.tensor_shape(p)?.get(1).copied().unwrap_or(params.cell_size),
        None => params.cell_size,
    };
    params.input_size = data_size.checked_sub(params.hidden_size).ok_or_else(|| {
        let reason = format!("kernel {:?} is narrower than the hidden state", dims);
        ImportError::attribute(&*node.name, "kernel", reason)
    })?;
    debug!("{} lowered with {:?}", node, params);
    ctx.set_op(id, params)
}

fn first_f32(ctx: &LoweringContext, id: usize) -> TesselResult<f32> {
    let value = ctx.const_value(id)?.to_f32_vec()?;
    value.first().copied().ok_or_else(|| format_err!("{} is empty", ctx.graph.nodes[id]))
}

/// Value of an initial state, either a plain constant or a `Fill` of a
/// constant scalar over `[batch, units]`.
fn zero_state(ctx: &LoweringContext, id: usize) -> TesselResult<Tensor> {
    let node = ctx.node(id)?;
    let (dims, value) = match &*node.op {
        "Const" => {
            let value = ctx.const_value(id)?;
            return Tensor::from_shape(value.shape(), &value.to_f32_vec()?);
        }
        "Fill" => (input(ctx, id, 0)?, first_f32(ctx, input(ctx, id, 1)?)?),
        _ => return Err(ImportError::pattern(&*node.name, "a constant or a Fill").into()),
    };
    let dim = |d: i64| -> TesselResult<usize> {
        usize::try_from(d).map_err(|_| {
            let reason = format!("negative state dimension {d}");
            ImportError::attribute(&*node.name, "dims", reason).into()
        })
    };
    let dims: TVec<usize> = match ctx.graph.op(dims) {
        "Const" => {
            ctx.const_value(dims)?.to_i64_vec()?.into_iter().map(dim).collect::<TesselResult<_>>()?
        }
        "ConcatV2" => {
            let (batch, units) = (input(ctx, dims, 0)?, input(ctx, dims, 1)?);
            let first = |id| -> TesselResult<usize> {
                let v = ctx.const_value(id)?.to_i64_vec()?;
                dim(*v.first().ok_or_else(|| format_err!("Empty dimension"))?)
            };
            tvec!(first(batch)?, first(units)?)
        }
        _ => {
            let expected = "state dimensions as a constant or a concatenation";
            return Err(ImportError::pattern(ctx.graph.name(dims), expected).into());
        }
    };
    Tensor::from_shape(&dims, &vec![value; dims.iter().product()])
}

#[cfg(test)]
mod tests {
    use tessel_core::internal::*;

    use crate::errors::ImportError;
    use crate::tfpb::*;

    const CELL: &str = "model/rnn/while/rnn/lstm_cell";

    fn layer(kernel: &str) -> tensorflow::GraphDef {
        layer_with_batch(kernel, 1)
    }

    fn layer_with_batch(kernel: &str, batch: i32) -> tensorflow::GraphDef {
        graph()
            .node(node().name("input").op("Placeholder").attr("shape", shape(&[1, 5])))
            .node(konst(kernel, tensor_f32(&[9, 16], vec![0.1])))
            .node(konst("model/rnn/lstm_cell/bias", tensor_f32(&[16], vec![0.0])))
            .node(konst("model/rnn/LSTMCellZeroState/batch", tensor_i32(&[1], vec![batch])))
            .node(konst("model/rnn/LSTMCellZeroState/units", tensor_i32(&[1], vec![4])))
            .node(konst("model/rnn/LSTMCellZeroState/axis", tensor_i32(&[], vec![0])))
            .node(
                node()
                    .name("model/rnn/LSTMCellZeroState/concat")
                    .op("ConcatV2")
                    .input("model/rnn/LSTMCellZeroState/batch")
                    .input("model/rnn/LSTMCellZeroState/units")
                    .input("model/rnn/LSTMCellZeroState/axis"),
            )
            .node(konst("model/rnn/LSTMCellZeroState/zero", tensor_f32(&[], vec![0.0])))
            .node(
                node()
                    .name("model/rnn/LSTMCellZeroState/zeros")
                    .op("Fill")
                    .input("model/rnn/LSTMCellZeroState/concat")
                    .input("model/rnn/LSTMCellZeroState/zero"),
            )
            .node(konst("model/rnn/LSTMCellZeroState/zeros_1", tensor_f32(&[1, 4], vec![0.0])))
            .node(
                node()
                    .name(format!("{CELL}/MatMul"))
                    .op("MatMul")
                    .input("input")
                    .input(kernel),
            )
            .node(
                node()
                    .name(format!("{CELL}/BiasAdd"))
                    .op("BiasAdd")
                    .input(format!("{CELL}/MatMul"))
                    .input("model/rnn/lstm_cell/bias"),
            )
            .node(konst(format!("{CELL}/add/y"), tensor_f32(&[], vec![0.5])))
            .node(
                node()
                    .name(format!("{CELL}/add"))
                    .op("Add")
                    .input(format!("{CELL}/BiasAdd"))
                    .input(format!("{CELL}/add/y")),
            )
            .node(
                node()
                    .name("model/rnn/while/Exit")
                    .op("Exit")
                    .input(format!("{CELL}/add"))
                    .input("model/rnn/LSTMCellZeroState/zeros")
                    .input("model/rnn/LSTMCellZeroState/zeros_1"),
            )
            .node(node().name("out").op("Softmax").input("model/rnn/while/Exit"))
    }

    #[test]
    fn lstm_layer() {
        let g = layer("model/rnn/lstm_cell/kernel");
        let model = crate::tensorflow().model_for_graph_def(&g).unwrap();
        let lstm = model.node_by_name("model/lstm").unwrap();
        let op = lstm.op.clone().unwrap();
        assert_eq!(op.name, "LSTM");
        let OpParams::Lstm(params) = op.params else { panic!() };
        assert_eq!((params.cell_size, params.hidden_size, params.input_size), (4, 4, 5));
        assert!(params.has_bias && params.has_init_state);
        assert!(!params.has_peephole && !params.has_projection);
        assert_eq!(params.forget_bias, 0.5);
        let names: Vec<&str> = lstm.inputs.iter().map(|&t| &*model.tensors[t].name).collect();
        assert_eq!(
            names,
            vec![
                "input",
                "model/rnn/lstm_cell/kernel",
                "model/rnn/lstm_cell/bias",
                "model/lstm/init_c",
                "model/lstm/init_h",
            ]
        );
        let init_c = model.tensor_by_name("model/lstm/init_c").unwrap();
        assert_eq!(&*init_c.shape, &[1, 4]);
        assert_eq!(init_c.layout, Some(Layout::W));
        assert_eq!(init_c.to_tensor().unwrap().as_vec::<f32>().unwrap(), vec![0.0; 4]);
        assert_eq!(model.outputs, vec![model.node_by_name("out").unwrap().id]);
    }

    #[test]
    fn kernel_is_mandatory() {
        let g = layer("model/rnn/weights");
        let err = crate::tensorflow().model_for_graph_def(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::PatternMismatch { node, .. }) if node == "model/lstm"
        ));
    }

    #[test]
    fn negative_state_dimension() {
        let g = layer_with_batch("model/rnn/lstm_cell/kernel", -1);
        let err = crate::tensorflow().model_for_graph_def(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::AttributeDecode { attr, .. }) if attr == "dims"
        ));
    }
}
