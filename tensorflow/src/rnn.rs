//! Folding of unrolled `while` loops into recurrent cell nodes.
use tessel_core::internal::*;

use crate::graph::{CellKind, NodeKind, RecurrentCell, TfGraph, TfNode};

/// Finds the scope of the first recurrent layer in the sequence.
///
/// A layer shows up as nodes named `<layer>/while/.../<cell marker>/...`.
/// The scope is the layer name cut back after its last `/`.
pub fn find_recurrent_scope(graph: &TfGraph) -> Option<(String, CellKind)> {
    for node in graph.live() {
        let Some(while_pos) = node.name.find("while") else { continue };
        let tail = &node.name[while_pos..];
        let Some(kind) = [CellKind::BasicLstm, CellKind::Lstm, CellKind::Gru]
            .into_iter()
            .find(|k| tail.contains(k.marker()))
        else {
            continue;
        };
        // drop the separator in front of `while`, whatever its width
        let head = &node.name[..while_pos];
        let Some((separator, _)) = head.char_indices().next_back() else { continue };
        let layer = &head[..separator];
        if layer.is_empty() {
            continue;
        }
        let scope = match layer.rfind('/') {
            Some(pos) => layer[..=pos].to_string(),
            None => format!("{layer}/"),
        };
        return Some((scope, kind));
    }
    None
}

/// Replaces every recurrent layer with a single composite node. Returns the
/// number of layers found.
pub fn extract_recurrent_cells(graph: &mut TfGraph) -> TesselResult<usize> {
    let mut count = 0;
    while let Some((scope, kind)) = find_recurrent_scope(graph) {
        let id = strip_scope(graph, &scope, kind)
            .with_context(|| format!("Extracting recurrent scope {scope}"))?;
        debug!("Folded recurrent scope {} into {}", scope, graph.nodes[id]);
        count += 1;
    }
    Ok(count)
}

fn strip_scope(graph: &mut TfGraph, scope: &str, kind: CellKind) -> TesselResult<usize> {
    let inside: Vec<usize> =
        graph.live().filter(|n| n.name.starts_with(scope)).map(|n| n.id).collect();
    ensure!(!inside.is_empty(), "Empty recurrent scope {}", scope);
    let is_inside = |id: usize| inside.contains(&id);
    let position = graph.order.iter().position(|&id| id == inside[0]).unwrap_or(graph.order.len());
    graph.order.retain(|id| !inside.contains(id));

    let mut boundary_inputs = vec![];
    let mut boundary_outputs = vec![];
    for &id in &inside {
        for &i in &graph.nodes[id].inputs {
            if !is_inside(i) && !boundary_inputs.contains(&i) {
                boundary_inputs.push(i);
            }
        }
        for &o in &graph.nodes[id].outputs {
            if !is_inside(o) && !boundary_outputs.contains(&o) {
                boundary_outputs.push(o);
            }
        }
    }

    let name = match kind {
        CellKind::Gru => format!("{scope}gru"),
        _ => format!("{scope}lstm"),
    };
    let cell = graph.nodes.len();
    graph.nodes.push(TfNode::new(cell, None, name, kind.op()));
    graph.order.insert(position.min(graph.order.len()), cell);

    for &id in &inside {
        let node = &mut graph.nodes[id];
        node.inputs.retain(|i| inside.contains(i));
        node.outputs.retain(|o| inside.contains(o));
    }
    for &b in &boundary_inputs {
        redirect(&mut graph.nodes[b].outputs, &inside, cell);
        graph.nodes[cell].inputs.push(b);
    }
    for &b in &boundary_outputs {
        redirect(&mut graph.nodes[b].inputs, &inside, cell);
        graph.nodes[cell].outputs.push(b);
    }

    for &b in &boundary_inputs {
        if graph.nodes[b].op == "Identity" {
            if let Some(&parent) = graph.nodes[b].inputs.first() {
                graph.merge_child(parent, b)?;
                graph.remove(b)?;
            }
        }
    }

    let (mut dynamic, konst): (Vec<usize>, Vec<usize>) =
        graph.nodes[cell].inputs.iter().copied().partition(|&i| graph.nodes[i].op != "Const");
    dynamic.extend(konst);
    graph.nodes[cell].inputs = dynamic;

    let mut rec = RecurrentCell::new(kind, inside);
    if kind != CellKind::Gru {
        populate_lstm(graph, cell, &mut rec);
    }
    let slots: Vec<usize> = rec.slots().collect();
    let mut kept = vec![];
    for &id in &rec.absorbed {
        if !slots.contains(&id) && graph.nodes[id].is_isolated() {
            graph.nodes[id].removed = true;
        } else {
            kept.push(id);
        }
    }
    trace!("{} keeps {} of {} absorbed nodes", graph.nodes[cell], kept.len(), rec.absorbed.len());
    rec.absorbed = kept;
    graph.nodes[cell].kind = NodeKind::Recurrent(Box::new(rec));
    Ok(cell)
}

/// Points the first entry naming an absorbed node at the cell, drops the others.
fn redirect(list: &mut Vec<usize>, inside: &[usize], cell: usize) {
    let mut done = false;
    list.retain_mut(|it| {
        if !inside.contains(it) {
            true
        } else if !done {
            *it = cell;
            done = true;
            true
        } else {
            false
        }
    });
}

fn populate_lstm(graph: &TfGraph, cell: usize, rec: &mut RecurrentCell) {
    let marker = rec.cell.marker();
    let candidates: Vec<usize> =
        graph.nodes[cell].inputs.iter().chain(rec.absorbed.iter()).copied().collect();
    for id in candidates {
        let node = &graph.nodes[id];
        if node.op == "Const" {
            let name = &node.name;
            let slot = if name.contains(&format!("{marker}/kernel")) {
                Some(&mut rec.kernel)
            } else if name.contains(&format!("{marker}/bias")) {
                Some(&mut rec.bias)
            } else if name.contains(&format!("{marker}/w_f_diag")) {
                Some(&mut rec.w_f_diag)
            } else if name.contains(&format!("{marker}/w_i_diag")) {
                Some(&mut rec.w_i_diag)
            } else if name.contains(&format!("{marker}/w_o_diag")) {
                Some(&mut rec.w_o_diag)
            } else if name.contains(&format!("{marker}/projection/kernel")) {
                Some(&mut rec.projection)
            } else {
                None
            };
            if let Some(slot) = slot {
                slot.get_or_insert(id);
            }
        }
        if !rec.absorbed.contains(&id) {
            continue;
        }
        if node.name.ends_with("LSTMCellZeroState/zeros") {
            rec.init_c = Some(id);
        } else if node.name.ends_with("LSTMCellZeroState/zeros_1") {
            rec.init_h = Some(id);
        } else if node.name.ends_with(&format!("{marker}/add/y")) {
            rec.forget_bias = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::tfpb::*;

    fn layer() -> tensorflow::GraphDef {
        let k = |name: &str| konst(name, tensor_f32(&[1], vec![0.0]));
        graph()
            .node(node().name("input").op("Placeholder"))
            .node(node().name("feed").op("Identity").input("input"))
            .node(k("model/rnn/lstm_cell/kernel"))
            .node(k("model/rnn/lstm_cell/bias"))
            .node(k("model/rnn/LSTMCellZeroState/zeros"))
            .node(k("model/rnn/LSTMCellZeroState/zeros_1"))
            .node(
                node()
                    .name("model/rnn/while/rnn/lstm_cell/MatMul")
                    .op("MatMul")
                    .input("feed")
                    .input("model/rnn/lstm_cell/kernel"),
            )
            .node(
                node()
                    .name("model/rnn/while/rnn/lstm_cell/BiasAdd")
                    .op("BiasAdd")
                    .input("model/rnn/while/rnn/lstm_cell/MatMul")
                    .input("model/rnn/lstm_cell/bias"),
            )
            .node(
                node()
                    .name("model/rnn/while/Exit")
                    .op("Exit")
                    .input("model/rnn/while/rnn/lstm_cell/BiasAdd")
                    .input("model/rnn/LSTMCellZeroState/zeros")
                    .input("model/rnn/LSTMCellZeroState/zeros_1"),
            )
            .node(node().name("model/rnn/unused").op("NoOp"))
            .node(node().name("out").op("Softmax").input("model/rnn/while/Exit"))
    }

    #[test]
    fn scope_detection() {
        let g = layer();
        let tf = build_graph(&g).unwrap();
        assert_eq!(find_recurrent_scope(&tf), Some(("model/".to_string(), CellKind::Lstm)));
    }

    #[test]
    fn basic_cell_is_not_a_plain_cell() {
        let g = graph().node(node().name("rnn/while/basic_lstm_cell/MatMul").op("MatMul"));
        let tf = build_graph(&g).unwrap();
        assert_eq!(find_recurrent_scope(&tf), Some(("rnn/".to_string(), CellKind::BasicLstm)));
    }

    #[test]
    fn wide_character_before_while() {
        let g = graph().node(node().name("layeréwhile/lstm_cell/MatMul").op("MatMul"));
        let tf = build_graph(&g).unwrap();
        assert_eq!(find_recurrent_scope(&tf), Some(("layer/".to_string(), CellKind::Lstm)));
        let g = graph().node(node().name("éwhile/lstm_cell/MatMul").op("MatMul"));
        assert_eq!(find_recurrent_scope(&build_graph(&g).unwrap()), None);
    }

    #[test]
    fn stacked_layers() {
        let g = graph()
            .node(node().name("input").op("Placeholder"))
            .node(konst("enc/rnn/lstm_cell/kernel", tensor_f32(&[1], vec![0.0])))
            .node(
                node()
                    .name("enc/rnn/while/lstm_cell/MatMul")
                    .op("MatMul")
                    .input("input")
                    .input("enc/rnn/lstm_cell/kernel"),
            )
            .node(
                node()
                    .name("enc/rnn/while/Exit")
                    .op("Exit")
                    .input("enc/rnn/while/lstm_cell/MatMul"),
            )
            .node(konst("dec/rnn/lstm_cell/kernel", tensor_f32(&[1], vec![0.0])))
            .node(
                node()
                    .name("dec/rnn/while/lstm_cell/MatMul")
                    .op("MatMul")
                    .input("enc/rnn/while/Exit")
                    .input("dec/rnn/lstm_cell/kernel"),
            )
            .node(
                node()
                    .name("dec/rnn/while/Exit")
                    .op("Exit")
                    .input("dec/rnn/while/lstm_cell/MatMul"),
            )
            .node(node().name("out").op("Softmax").input("dec/rnn/while/Exit"));
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(extract_recurrent_cells(&mut tf).unwrap(), 2);
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["input", "enc/lstm", "dec/lstm", "out"]);

        let enc = tf.node_by_name("enc/lstm").unwrap();
        let dec = tf.node_by_name("dec/lstm").unwrap();
        assert_eq!(enc.inputs, vec![0]);
        assert_eq!(enc.outputs, vec![dec.id]);
        assert_eq!(dec.inputs, vec![enc.id]);
        assert_eq!(dec.outputs, vec![7]);
        assert_eq!(tf.nodes[7].inputs, vec![dec.id]);
        assert_eq!(enc.recurrent().unwrap().kernel, Some(1));
        assert_eq!(dec.recurrent().unwrap().kernel, Some(4));
    }

    #[test]
    fn extraction() {
        let g = layer();
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(extract_recurrent_cells(&mut tf).unwrap(), 1);
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["input", "model/lstm", "out"]);
        let cell = tf.node_by_name("model/lstm").unwrap();
        assert_eq!(cell.op, "LSTM");
        assert_eq!(cell.inputs, vec![0]);
        assert_eq!(cell.outputs, vec![10]);
        let rec = cell.recurrent().unwrap();
        assert_eq!(tf.nodes[rec.kernel.unwrap()].name, "model/rnn/lstm_cell/kernel");
        assert_eq!(tf.nodes[rec.bias.unwrap()].name, "model/rnn/lstm_cell/bias");
        assert_eq!(tf.nodes[rec.init_c.unwrap()].name, "model/rnn/LSTMCellZeroState/zeros");
        assert_eq!(tf.nodes[rec.init_h.unwrap()].name, "model/rnn/LSTMCellZeroState/zeros_1");
        assert!(rec.projection.is_none() && rec.forget_bias.is_none());
        assert!(tf.nodes[9].removed);
        assert!(tf.nodes[1].removed);
    }
}
