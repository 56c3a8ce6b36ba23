use std::collections::HashSet;
use std::fs;
use std::path::Path;

use prost::Message;
use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::graph::{TfGraph, TfNode, build_graph};
use crate::optim::Optimizer;
use crate::rnn::extract_recurrent_cells;
use crate::tensor::decode_tensor;
use crate::tfpb::tensorflow::{GraphDef, NodeDef};

/// Emits the target operator of one foreign node.
pub type TfTranslator = fn(&mut LoweringContext<'_, '_>, usize) -> TesselResult<()>;

#[derive(Clone, Debug, Default)]
pub struct TfOpRegister {
    translators: HashMap<String, TfTranslator>,
    generic: HashSet<String>,
}

impl TfOpRegister {
    /// Registers a translator, replacing any previous one for the same op.
    pub fn insert(&mut self, op: &'static str, translator: TfTranslator) {
        self.translators.insert(op.to_string(), translator);
    }

    /// Lets an op through as an opaque `Generic` operator.
    pub fn allow_generic(&mut self, op: &'static str) {
        self.generic.insert(op.to_string());
    }

    pub fn get(&self, op: &str) -> Option<TfTranslator> {
        self.translators.get(op).copied()
    }

    pub fn is_generic(&self, op: &str) -> bool {
        self.generic.contains(op)
    }
}

/// Target entities standing for a foreign node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Materialized {
    /// `None` for constants, which only exist as tensors.
    pub node: Option<NodeId>,
    pub tensor: TensorId,
}

/// Lowering state shared by the translators.
pub struct LoweringContext<'g, 'a> {
    pub graph: &'g TfGraph<'a>,
    pub builder: &'g mut dyn GraphBuilder,
    mapping: HashMap<usize, Materialized>,
    /// Rearranged constants, by foreign node and arrangement tag.
    arrangements: HashMap<(usize, &'static str), TensorId>,
}

impl<'g, 'a> LoweringContext<'g, 'a> {
    pub fn new(graph: &'g TfGraph<'a>, builder: &'g mut dyn GraphBuilder) -> Self {
        LoweringContext { graph, builder, mapping: HashMap::new(), arrangements: HashMap::new() }
    }

    pub fn node(&self, id: usize) -> TesselResult<&'g TfNode<'a>> {
        self.graph.node(id)
    }

    pub fn materialized(&self, id: usize) -> Option<Materialized> {
        self.mapping.get(&id).copied()
    }

    /// The target node created for `id` during materialization.
    pub fn target(&self, id: usize) -> TesselResult<NodeId> {
        self.mapping
            .get(&id)
            .and_then(|m| m.node)
            .ok_or_else(|| format_err!("{} has no target node", self.graph.nodes[id]))
    }

    /// Decoded payload of a constant record.
    pub fn def_value(def: &NodeDef) -> TesselResult<Tensor> {
        decode_tensor(&def.name, def.get_attr_tensor("value")?)
    }

    /// Decoded payload of a `Const` node.
    pub fn const_value(&self, id: usize) -> TesselResult<Tensor> {
        let node = self.node(id)?;
        if node.op != "Const" {
            return Err(ImportError::pattern(&*node.name, "a constant").into());
        }
        Self::def_value(node.def()?)
    }

    /// Target tensor holding the value of a foreign node.
    ///
    /// Constants absorbed out of the sequence, like recurrent weights, are
    /// materialized on first use.
    pub fn tensor_for(&mut self, id: usize) -> TesselResult<TensorId> {
        match self.mapping.get(&id) {
            Some(m) => Ok(m.tensor),
            None => self.constant(id),
        }
    }

    /// Constant tensor in the foreign arrangement, named after the node.
    fn constant(&mut self, id: usize) -> TesselResult<TensorId> {
        let value = self.const_value(id)?;
        let node = self.node(id)?;
        trace!("Materializing constant {} as {:?}", node, value);
        let layout = Layout::for_rank(value.rank());
        let tensor = self.builder.add_const(&node.name, value, layout)?;
        self.mapping.insert(id, Materialized { node: None, tensor });
        Ok(tensor)
    }

    /// Constant in the `arrangement` a translator needs, `prepare` turning
    /// the foreign value into it.
    ///
    /// A constant with a single consumer is rearranged in place. A shared
    /// one keeps its foreign tensor and gets one more tensor per
    /// arrangement, named `<node>/<arrangement>`.
    pub fn const_tensor_with(
        &mut self,
        id: usize,
        arrangement: &'static str,
        prepare: impl FnOnce(Tensor) -> TesselResult<(Tensor, Option<Layout>)>,
    ) -> TesselResult<TensorId> {
        if let Some(&tensor) = self.arrangements.get(&(id, arrangement)) {
            return Ok(tensor);
        }
        let node = self.node(id)?;
        if node.op != "Const" {
            bail!("{} is consumed before it was materialized", node);
        }
        let (value, layout) = prepare(self.const_value(id)?)?;
        let shared = node.outputs.len() > 1 || self.arrangements.keys().any(|&(k, _)| k == id);
        let tensor = match self.mapping.get(&id).copied() {
            Some(m) if !shared => {
                trace!("Rearranging constant {} ({})", node, arrangement);
                self.builder.set_const(m.tensor, value, layout)?;
                m.tensor
            }
            Some(_) => {
                debug!("{} is shared, adding its {} arrangement", node, arrangement);
                let name = format!("{}/{}", node.name, arrangement);
                self.builder.add_const(&name, value, layout)?
            }
            None => {
                let tensor = self.builder.add_const(&node.name, value, layout)?;
                self.mapping.insert(id, Materialized { node: None, tensor });
                tensor
            }
        };
        self.arrangements.insert((id, arrangement), tensor);
        Ok(tensor)
    }

    /// Connects the tensor of foreign node `input` to target node `node`.
    pub fn wire(&mut self, node: NodeId, input: usize) -> TesselResult<TensorId> {
        let tensor = self.tensor_for(input)?;
        self.builder.add_node_input(node, tensor)?;
        Ok(tensor)
    }

    /// Wires every foreign input of `id`, in order.
    pub fn wire_all(&mut self, id: usize) -> TesselResult<NodeId> {
        let target = self.target(id)?;
        for &input in &self.node(id)?.inputs {
            self.wire(target, input)?;
        }
        Ok(target)
    }

    /// Creates a constant out of thin air and feeds it to `node`.
    pub fn feed_const(
        &mut self,
        node: NodeId,
        name: &str,
        value: Tensor,
        layout: Option<Layout>,
    ) -> TesselResult<TensorId> {
        let tensor = self.builder.add_const(name, value, layout)?;
        self.builder.add_node_input(node, tensor)?;
        Ok(tensor)
    }

    pub fn set_op(&mut self, id: usize, op: impl Into<StaticOp>) -> TesselResult<()> {
        let target = self.target(id)?;
        self.builder.set_node_op(target, op.into())
    }

    /// Declares `id` as a graph input of the given shape.
    pub fn source(&mut self, id: usize, shape: &[usize], dt: DatumType) -> TesselResult<()> {
        let tensor = match self.materialized(id) {
            Some(m) => m.tensor,
            None => self.shell(id)?.tensor,
        };
        self.builder.set_tensor_shape(tensor, shape)?;
        self.builder.set_tensor_datum_type(tensor, dt)?;
        let target = self.target(id)?;
        self.builder.set_node_op(target, StaticOp::bare("InputOp"))?;
        self.builder.add_graph_input(target)
    }

    /// Target node with a single float NCHW output tensor, both named after
    /// the foreign node.
    fn shell(&mut self, id: usize) -> TesselResult<Materialized> {
        let name = &self.node(id)?.name;
        let node = self.builder.create_node(name)?;
        let tensor = self.builder.create_tensor(name)?;
        self.builder.set_tensor_layout(tensor, Layout::NCHW)?;
        self.builder.set_tensor_datum_type(tensor, DatumType::F32)?;
        self.builder.add_node_output(node, tensor)?;
        let m = Materialized { node: Some(node), tensor };
        self.mapping.insert(id, m);
        Ok(m)
    }

    fn placeholder(&mut self, id: usize) -> TesselResult<()> {
        let node = self.node(id)?;
        let def = node.def()?;
        // a placeholder that absorbed a reshape takes the reshape target
        let last = node.last_def()?;
        let dims: TVec<i64> = if node.defs.len() > 1 && last.op == "Const" {
            Self::def_value(last)?.to_i64_vec()?.into()
        } else {
            def.get_attr_opt_shape("shape")?.unwrap_or_default()
        };
        let dt = def.get_attr_opt_datum_type("dtype")?.unwrap_or(DatumType::F32);
        self.source(id, &engine_shape(&dims), dt)
    }
}

/// Foreign channel-last dimensions to engine channel-first ones. Unknown
/// dimensions become 1.
pub fn engine_shape(dims: &[i64]) -> TVec<usize> {
    let dims: TVec<usize> = dims.iter().map(|&d| if d < 0 { 1 } else { d as usize }).collect();
    match dims.len() {
        4 => tvec!(dims[0], dims[3], dims[1], dims[2]),
        3 => tvec!(dims[0], dims[2], dims[1]),
        _ => dims,
    }
}

fn is_source(op: &str) -> bool {
    op == "Const" || op == "Placeholder"
}

pub struct Tensorflow {
    pub op_register: TfOpRegister,
    pub optimizer: Optimizer,
}

impl Tensorflow {
    pub fn with_optimizer(self, optimizer: Optimizer) -> Tensorflow {
        Tensorflow { optimizer, ..self }
    }

    pub fn graph_def_for_path(&self, p: impl AsRef<Path>) -> TesselResult<GraphDef> {
        let p = p.as_ref();
        let file = fs::File::open(p).with_context(|| format!("Opening {p:?}"))?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        GraphDef::decode(&*mmap).with_context(|| format!("Decoding GraphDef from {p:?}"))
    }

    pub fn graph_def_for_read(&self, r: &mut dyn std::io::Read) -> TesselResult<GraphDef> {
        let mut v = vec![];
        r.read_to_end(&mut v)?;
        let b = bytes::Bytes::from(v);
        GraphDef::decode(b).context("Can not parse protobuf input")
    }

    /// Builds the foreign graph, folds recurrent layers and runs the
    /// rewrite passes.
    pub fn foreign_graph<'a>(&self, graph_def: &'a GraphDef) -> TesselResult<TfGraph<'a>> {
        let mut graph = build_graph(graph_def)?;
        let cells = extract_recurrent_cells(&mut graph)?;
        if cells > 0 {
            info!("Folded {} recurrent layers", cells);
        }
        self.optimizer.optimize(&mut graph)?;
        Ok(graph)
    }

    pub fn import(&self, graph_def: &GraphDef, builder: &mut dyn GraphBuilder) -> TesselResult<()> {
        let graph = self.foreign_graph(graph_def)?;
        self.lower(&graph, builder)
    }

    /// Emits a simplified foreign graph through `builder`.
    pub fn lower(&self, graph: &TfGraph, builder: &mut dyn GraphBuilder) -> TesselResult<()> {
        let mut translators = vec![];
        for node in graph.live() {
            if is_source(&node.op) {
                continue;
            }
            let translator = if let Some(t) = self.op_register.get(&node.op) {
                t
            } else if self.op_register.is_generic(&node.op) {
                crate::ops::generic as TfTranslator
            } else {
                return Err(ImportError::missing_translator(&*node.op, &*node.name).into());
            };
            translators.push((node.id, translator));
        }

        let mut ctx = LoweringContext::new(graph, builder);
        for node in graph.live() {
            if node.skip_materialization {
                continue;
            }
            if node.op == "Const" {
                ctx.constant(node.id)
                    .with_context(|| format!("Materializing constant {}", node.name))?;
            } else if node.op == "Placeholder" {
                ctx.placeholder(node.id)
                    .with_context(|| format!("Declaring input {}", node.name))?;
            } else {
                ctx.shell(node.id)?;
            }
        }

        for (id, translator) in translators {
            let node = &graph.nodes[id];
            if node.skip_materialization {
                continue;
            }
            translator(&mut ctx, id)
                .with_context(|| format!("Translating {} ({})", node.name, node.op))?;
            if node.outputs.is_empty() {
                let target = ctx.target(id)?;
                ctx.builder.add_graph_output(target)?;
            }
        }
        Ok(())
    }

    pub fn model_for_graph_def(&self, graph_def: &GraphDef) -> TesselResult<StaticGraph> {
        self.model_named("graph", graph_def)
    }

    pub fn model_for_path(&self, p: impl AsRef<Path>) -> TesselResult<StaticGraph> {
        let p = p.as_ref();
        let graph_def = self.graph_def_for_path(p)?;
        let name = p.file_stem().map(|s| s.to_string_lossy().into_owned());
        self.model_named(name.as_deref().unwrap_or("graph"), &graph_def)
    }

    pub fn model_for_read(&self, r: &mut dyn std::io::Read) -> TesselResult<StaticGraph> {
        let graph_def = self.graph_def_for_read(r)?;
        self.model_for_graph_def(&graph_def)
    }

    fn model_named(&self, name: &str, graph_def: &GraphDef) -> TesselResult<StaticGraph> {
        let mut model = StaticGraph::new(name);
        self.import(graph_def, &mut model)?;
        model.check_consistency()?;
        debug!("Imported {}: {} nodes, {} tensors", name, model.nodes.len(), model.tensors.len());
        Ok(model)
    }
}
