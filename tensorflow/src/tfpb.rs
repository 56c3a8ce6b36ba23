use std::fs;

pub mod tensorflow {
    include!("prost/tensorflow.rs");
}

use self::tensorflow::attr_value::{ListValue, Value};
use self::tensorflow::tensor_shape_proto::Dim;
use self::tensorflow::{AttrValue, DataType, GraphDef, NodeDef, TensorProto, TensorShapeProto};

use crate::errors::ImportError;
use tessel_core::internal::*;

pub fn graph() -> GraphDef {
    GraphDef { node: vec![], versions: None, version: 0 }
}

pub fn node() -> NodeDef {
    NodeDef {
        name: String::new(),
        op: String::new(),
        input: vec![],
        device: String::new(),
        attr: HashMap::new(),
    }
}

pub fn shape(dims: &[i64]) -> TensorShapeProto {
    TensorShapeProto {
        dim: dims.iter().map(|&size| Dim { size, name: String::new() }).collect(),
        unknown_rank: false,
    }
}

fn empty_tensor(dtype: DataType, dims: &[i64]) -> TensorProto {
    TensorProto { dtype: dtype.into(), tensor_shape: Some(shape(dims)), ..TensorProto::default() }
}

pub fn tensor_f32(dims: &[i64], values: Vec<f32>) -> TensorProto {
    TensorProto { float_val: values, ..empty_tensor(DataType::DtFloat, dims) }
}

pub fn tensor_i32(dims: &[i64], values: Vec<i32>) -> TensorProto {
    TensorProto { int_val: values, ..empty_tensor(DataType::DtInt32, dims) }
}

pub fn tensor_i64(dims: &[i64], values: Vec<i64>) -> TensorProto {
    TensorProto { int64_val: values, ..empty_tensor(DataType::DtInt64, dims) }
}

/// A tensor carried as raw little-endian bytes, as frozen graphs usually do.
pub fn tensor_content(dtype: DataType, dims: &[i64], content: Vec<u8>) -> TensorProto {
    TensorProto { tensor_content: content, ..empty_tensor(dtype, dims) }
}

/// A `Const` node definition.
pub fn konst(name: impl ToString, value: TensorProto) -> NodeDef {
    let dtype = DataType::from_i32(value.dtype).unwrap_or(DataType::DtInvalid);
    node().name(name).op("Const").attr("dtype", dtype).attr("value", value)
}

impl GraphDef {
    pub fn node(mut self, n: NodeDef) -> Self {
        self.node.push(n);
        self
    }

    pub fn write_to_bytes(&self) -> TesselResult<Vec<u8>> {
        use prost::Message;
        let mut buf = vec![];
        self.encode(&mut buf).map_err(|e| format_err!("Protobuf encoding error: {:?}", e))?;
        Ok(buf)
    }

    pub fn save_to<P: AsRef<::std::path::Path>>(&self, p: P) -> TesselResult<()> {
        let buf = self.write_to_bytes()?;
        fs::write(p, buf)?;
        Ok(())
    }
}

impl NodeDef {
    pub fn name<S: ToString>(mut self, n: S) -> NodeDef {
        self.name = n.to_string();
        self
    }

    pub fn op<S: ToString>(mut self, n: S) -> NodeDef {
        self.op = n.to_string();
        self
    }

    pub fn input<S: ToString>(mut self, n: S) -> NodeDef {
        self.input.push(n.to_string());
        self
    }

    pub fn attr<S: ToString, V: Into<AttrValue>>(mut self, n: S, v: V) -> NodeDef {
        self.attr.insert(n.to_string(), v.into());
        self
    }
}

impl NodeDef {
    fn attr_error(&self, name: &str, reason: impl Into<String>) -> TesselError {
        ImportError::attribute(&*self.name, name, reason).into()
    }

    fn missing(&self, name: &str, kind: &str) -> TesselError {
        self.attr_error(name, format!("expected {kind} attribute on {} node", self.op))
    }

    fn get_attr_value(&self, name: &str, kind: &str) -> TesselResult<Option<&Value>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue { value: None }) => Err(self.missing(name, kind)),
            Some(AttrValue { value: Some(v) }) => Ok(Some(v)),
        }
    }

    fn wrong_kind(&self, name: &str, kind: &str, found: &Value) -> TesselError {
        self.attr_error(name, format!("expected {kind}, found {found:?}"))
    }

    pub fn get_attr_raw_str(&self, name: &str) -> TesselResult<&[u8]> {
        self.get_attr_opt_raw_str(name)?.ok_or_else(|| self.missing(name, "string"))
    }

    pub fn get_attr_opt_raw_str(&self, name: &str) -> TesselResult<Option<&[u8]>> {
        match self.get_attr_value(name, "string")? {
            None => Ok(None),
            Some(Value::S(bytes)) => Ok(Some(bytes)),
            Some(other) => Err(self.wrong_kind(name, "string", other)),
        }
    }

    pub fn get_attr_str(&self, name: &str) -> TesselResult<String> {
        self.get_attr_opt_str(name)?.ok_or_else(|| self.missing(name, "UTF-8 string"))
    }

    pub fn get_attr_opt_str(&self, name: &str) -> TesselResult<Option<String>> {
        if let Some(s) = self.get_attr_opt_raw_str(name)? {
            Ok(Some(
                String::from_utf8(s.to_vec())
                    .map_err(|_| self.attr_error(name, "expected an UTF-8 string"))?,
            ))
        } else {
            Ok(None)
        }
    }

    pub fn get_attr_bool(&self, name: &str) -> TesselResult<bool> {
        self.get_attr_opt_bool(name)?.ok_or_else(|| self.missing(name, "bool"))
    }

    pub fn get_attr_opt_bool(&self, name: &str) -> TesselResult<Option<bool>> {
        match self.get_attr_value(name, "bool")? {
            None => Ok(None),
            Some(Value::B(b)) => Ok(Some(*b)),
            Some(other) => Err(self.wrong_kind(name, "bool", other)),
        }
    }

    pub fn get_attr_datum_type(&self, name: &str) -> TesselResult<DatumType> {
        self.get_attr_opt_datum_type(name)?.ok_or_else(|| self.missing(name, "datum_type"))
    }

    pub fn get_attr_opt_datum_type(&self, name: &str) -> TesselResult<Option<DatumType>> {
        match self.get_attr_value(name, "type")? {
            None => Ok(None),
            Some(Value::Type(v)) => {
                let dt = DataType::from_i32(*v)
                    .ok_or_else(|| self.attr_error(name, format!("unknown data type {v}")))?;
                Ok(Some(
                    DatumType::try_from(dt).map_err(|e| self.attr_error(name, e.to_string()))?,
                ))
            }
            Some(other) => Err(self.wrong_kind(name, "type", other)),
        }
    }

    pub fn get_attr_shape(&self, name: &str) -> TesselResult<TVec<i64>> {
        self.get_attr_opt_shape(name)?.ok_or_else(|| self.missing(name, "shape"))
    }

    pub fn get_attr_opt_shape(&self, name: &str) -> TesselResult<Option<TVec<i64>>> {
        match self.get_attr_value(name, "shape")? {
            None => Ok(None),
            Some(Value::Shape(shape)) => Ok(Some(shape.dim.iter().map(|d| d.size).collect())),
            Some(other) => Err(self.wrong_kind(name, "shape", other)),
        }
    }

    pub fn get_attr_list_shape(&self, name: &str) -> TesselResult<Vec<TVec<i64>>> {
        match self.get_attr_value(name, "list(shape)")? {
            None => Err(self.missing(name, "list(shape)")),
            Some(Value::List(list)) => {
                Ok(list.shape.iter().map(|s| s.dim.iter().map(|d| d.size).collect()).collect())
            }
            Some(other) => Err(self.wrong_kind(name, "list(shape)", other)),
        }
    }

    pub fn get_attr_tensor(&self, name: &str) -> TesselResult<&TensorProto> {
        self.get_attr_opt_tensor(name)?.ok_or_else(|| self.missing(name, "tensor"))
    }

    pub fn get_attr_opt_tensor(&self, name: &str) -> TesselResult<Option<&TensorProto>> {
        match self.get_attr_value(name, "tensor")? {
            None => Ok(None),
            Some(Value::Tensor(t)) => Ok(Some(t)),
            Some(other) => Err(self.wrong_kind(name, "tensor", other)),
        }
    }

    pub fn get_attr_int<T: ::num_traits::FromPrimitive>(&self, name: &str) -> TesselResult<T> {
        self.get_attr_opt_int(name)?.ok_or_else(|| self.missing(name, "int"))
    }

    pub fn get_attr_opt_int<T: ::num_traits::FromPrimitive>(
        &self,
        name: &str,
    ) -> TesselResult<Option<T>> {
        match self.get_attr_value(name, "int")? {
            None => Ok(None),
            Some(Value::I(i)) => Ok(Some(
                T::from_i64(*i).ok_or_else(|| self.attr_error(name, format!("{i} out of range")))?,
            )),
            Some(other) => Err(self.wrong_kind(name, "int", other)),
        }
    }

    pub fn get_attr_float<T: ::num_traits::FromPrimitive>(&self, name: &str) -> TesselResult<T> {
        self.get_attr_opt_float(name)?.ok_or_else(|| self.missing(name, "float"))
    }

    pub fn get_attr_opt_float<T: ::num_traits::FromPrimitive>(
        &self,
        name: &str,
    ) -> TesselResult<Option<T>> {
        match self.get_attr_value(name, "float")? {
            None => Ok(None),
            Some(Value::F(f)) => Ok(Some(
                T::from_f32(*f).ok_or_else(|| self.attr_error(name, format!("{f} out of range")))?,
            )),
            Some(other) => Err(self.wrong_kind(name, "float", other)),
        }
    }

    pub fn get_attr_list_int<T: ::num_traits::FromPrimitive>(
        &self,
        name: &str,
    ) -> TesselResult<Vec<T>> {
        self.get_attr_opt_list_int(name)?.ok_or_else(|| self.missing(name, "list(int)"))
    }

    pub fn get_attr_opt_list_int<T: ::num_traits::FromPrimitive>(
        &self,
        name: &str,
    ) -> TesselResult<Option<Vec<T>>> {
        match self.get_attr_value(name, "list(int)")? {
            None => Ok(None),
            Some(Value::List(list)) => Ok(Some(
                list.i
                    .iter()
                    .map(|&i| {
                        T::from_i64(i)
                            .ok_or_else(|| self.attr_error(name, format!("{i} out of range")))
                    })
                    .collect::<TesselResult<_>>()?,
            )),
            Some(other) => Err(self.wrong_kind(name, "list(int)", other)),
        }
    }
}

impl From<DataType> for AttrValue {
    fn from(t: DataType) -> AttrValue {
        AttrValue { value: Some(Value::Type(t.into())) }
    }
}

impl<'a> From<&'a str> for AttrValue {
    fn from(t: &'a str) -> AttrValue {
        AttrValue { value: Some(Value::S(t.as_bytes().to_vec())) }
    }
}

impl From<i32> for AttrValue {
    fn from(t: i32) -> AttrValue {
        AttrValue::from(t as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(t: i64) -> AttrValue {
        AttrValue { value: Some(Value::I(t)) }
    }
}

impl From<f32> for AttrValue {
    fn from(t: f32) -> AttrValue {
        AttrValue { value: Some(Value::F(t)) }
    }
}

impl From<bool> for AttrValue {
    fn from(t: bool) -> AttrValue {
        AttrValue { value: Some(Value::B(t)) }
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(t: Vec<i64>) -> AttrValue {
        AttrValue { value: Some(Value::List(ListValue { i: t, ..ListValue::default() })) }
    }
}

impl From<Vec<TensorShapeProto>> for AttrValue {
    fn from(t: Vec<TensorShapeProto>) -> AttrValue {
        AttrValue { value: Some(Value::List(ListValue { shape: t, ..ListValue::default() })) }
    }
}

impl From<TensorProto> for AttrValue {
    fn from(t: TensorProto) -> AttrValue {
        AttrValue { value: Some(Value::Tensor(t)) }
    }
}

impl From<TensorShapeProto> for AttrValue {
    fn from(t: TensorShapeProto) -> AttrValue {
        AttrValue { value: Some(Value::Shape(t)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let n = node()
            .name("conv")
            .op("Conv2D")
            .attr("padding", "SAME")
            .attr("strides", vec![1i64, 2, 2, 1])
            .attr("use_cudnn_on_gpu", true)
            .attr("epsilon", 0.001f32)
            .attr("T", DataType::DtFloat);
        assert_eq!(n.get_attr_str("padding").unwrap(), "SAME");
        assert_eq!(n.get_attr_list_int::<usize>("strides").unwrap(), vec![1, 2, 2, 1]);
        assert!(n.get_attr_bool("use_cudnn_on_gpu").unwrap());
        assert_eq!(n.get_attr_float::<f32>("epsilon").unwrap(), 0.001);
        assert_eq!(n.get_attr_datum_type("T").unwrap(), DatumType::F32);
        assert_eq!(n.get_attr_opt_str("data_format").unwrap(), None);
    }

    #[test]
    fn wrong_kind_is_a_decode_error() {
        let n = node().name("conv").op("Conv2D").attr("padding", 3i64);
        let err = n.get_attr_str("padding").unwrap_err();
        match err.downcast_ref::<ImportError>() {
            Some(ImportError::AttributeDecode { node, attr, .. }) => {
                assert_eq!(node, "conv");
                assert_eq!(attr, "padding");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(n.get_attr_tensor("value").is_err());
    }

    #[test]
    fn encode_decode_graph() {
        use prost::Message;
        let g = graph()
            .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 3])))
            .node(konst("k", tensor_f32(&[3], vec![1.0, 2.0, 3.0])));
        let bytes = g.write_to_bytes().unwrap();
        let back = GraphDef::decode(&*bytes).unwrap();
        assert_eq!(back, g);
    }
}
