//! The interface importers emit through.
use crate::internal::*;
use crate::model::TensorKind;

/// Write side of a static graph.
///
/// Importers only ever create and connect entities through this trait, and
/// read back nothing but tensor shapes.
pub trait GraphBuilder {
    fn create_node(&mut self, name: &str) -> TesselResult<NodeId>;
    fn create_tensor(&mut self, name: &str) -> TesselResult<TensorId>;
    fn create_const_tensor(&mut self, name: &str) -> TesselResult<TensorId>;

    fn set_tensor_shape(&mut self, tensor: TensorId, shape: &[usize]) -> TesselResult<()>;
    fn set_tensor_datum_type(&mut self, tensor: TensorId, dt: DatumType) -> TesselResult<()>;
    fn set_tensor_layout(&mut self, tensor: TensorId, layout: Layout) -> TesselResult<()>;
    fn set_tensor_data_size(&mut self, tensor: TensorId, size: usize) -> TesselResult<()>;
    /// Hands the payload of a constant tensor over to the graph.
    fn set_const_buffer(&mut self, tensor: TensorId, data: Vec<u8>) -> TesselResult<()>;

    fn add_node_input(&mut self, node: NodeId, tensor: TensorId) -> TesselResult<()>;
    fn add_node_output(&mut self, node: NodeId, tensor: TensorId) -> TesselResult<()>;
    fn set_node_op(&mut self, node: NodeId, op: StaticOp) -> TesselResult<()>;

    fn add_graph_input(&mut self, node: NodeId) -> TesselResult<()>;
    fn add_graph_output(&mut self, node: NodeId) -> TesselResult<()>;

    fn tensor_shape(&self, tensor: TensorId) -> TesselResult<TVec<usize>>;

    /// Creates a constant tensor holding `value`.
    fn add_const(
        &mut self,
        name: &str,
        value: Tensor,
        layout: Option<Layout>,
    ) -> TesselResult<TensorId> {
        let id = self.create_const_tensor(name)?;
        self.set_const(id, value, layout)?;
        Ok(id)
    }

    /// Replaces shape, type, layout and payload of a constant tensor.
    fn set_const(
        &mut self,
        tensor: TensorId,
        value: Tensor,
        layout: Option<Layout>,
    ) -> TesselResult<()> {
        self.set_tensor_shape(tensor, value.shape())?;
        self.set_tensor_datum_type(tensor, value.datum_type())?;
        if let Some(layout) = layout {
            self.set_tensor_layout(tensor, layout)?;
        }
        let bytes = value.into_bytes();
        self.set_tensor_data_size(tensor, bytes.len())?;
        self.set_const_buffer(tensor, bytes)
    }
}

impl StaticGraph {
    fn push_tensor(&mut self, name: &str, kind: TensorKind) -> TesselResult<TensorId> {
        if self.tensors_by_name.contains_key(name) {
            bail!("Duplicate tensor name {}", name);
        }
        let id = self.tensors.len();
        self.tensors.push(StaticTensor::new(id, name, kind));
        self.tensors_by_name.insert(name.to_string(), id);
        Ok(id)
    }
}

impl GraphBuilder for StaticGraph {
    fn create_node(&mut self, name: &str) -> TesselResult<NodeId> {
        if self.nodes_by_name.contains_key(name) {
            bail!("Duplicate node name {}", name);
        }
        let id = self.nodes.len();
        self.nodes.push(StaticNode::new(id, name.to_string()));
        self.nodes_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn create_tensor(&mut self, name: &str) -> TesselResult<TensorId> {
        self.push_tensor(name, TensorKind::Var)
    }

    fn create_const_tensor(&mut self, name: &str) -> TesselResult<TensorId> {
        self.push_tensor(name, TensorKind::Const)
    }

    fn set_tensor_shape(&mut self, tensor: TensorId, shape: &[usize]) -> TesselResult<()> {
        self.tensor_mut(tensor)?.shape = shape.into();
        Ok(())
    }

    fn set_tensor_datum_type(&mut self, tensor: TensorId, dt: DatumType) -> TesselResult<()> {
        self.tensor_mut(tensor)?.datum_type = dt;
        Ok(())
    }

    fn set_tensor_layout(&mut self, tensor: TensorId, layout: Layout) -> TesselResult<()> {
        self.tensor_mut(tensor)?.layout = Some(layout);
        Ok(())
    }

    fn set_tensor_data_size(&mut self, tensor: TensorId, size: usize) -> TesselResult<()> {
        self.tensor_mut(tensor)?.data_size = size;
        Ok(())
    }

    fn set_const_buffer(&mut self, tensor: TensorId, data: Vec<u8>) -> TesselResult<()> {
        let tensor = self.tensor_mut(tensor)?;
        ensure!(tensor.is_const(), "Tensor {} is not a constant", tensor.name);
        tensor.data = Some(data);
        Ok(())
    }

    fn add_node_input(&mut self, node: NodeId, tensor: TensorId) -> TesselResult<()> {
        self.node(node)?;
        self.tensor_mut(tensor)?.consumers.push(node);
        self.node_mut(node)?.inputs.push(tensor);
        Ok(())
    }

    fn add_node_output(&mut self, node: NodeId, tensor: TensorId) -> TesselResult<()> {
        self.node(node)?;
        let t = self.tensor_mut(tensor)?;
        if t.producer.is_some() {
            bail!("Tensor {} already has a producer", t.name);
        }
        t.producer = Some(node);
        self.node_mut(node)?.outputs.push(tensor);
        Ok(())
    }

    fn set_node_op(&mut self, node: NodeId, op: StaticOp) -> TesselResult<()> {
        self.node_mut(node)?.op = Some(op);
        Ok(())
    }

    fn add_graph_input(&mut self, node: NodeId) -> TesselResult<()> {
        self.node(node)?;
        if !self.inputs.contains(&node) {
            self.inputs.push(node);
        }
        Ok(())
    }

    fn add_graph_output(&mut self, node: NodeId) -> TesselResult<()> {
        self.node(node)?;
        if !self.outputs.contains(&node) {
            self.outputs.push(node);
        }
        Ok(())
    }

    fn tensor_shape(&self, tensor: TensorId) -> TesselResult<TVec<usize>> {
        Ok(self.tensor(tensor)?.shape.clone())
    }
}
