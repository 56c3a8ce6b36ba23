use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::tfpb::tensorflow::{DataType, TensorProto, TensorShapeProto};

impl TryFrom<DataType> for DatumType {
    type Error = TesselError;
    fn try_from(t: DataType) -> TesselResult<DatumType> {
        match t {
            DataType::DtBool => Ok(DatumType::Bool),
            DataType::DtUint8 => Ok(DatumType::U8),
            DataType::DtUint16 => Ok(DatumType::U16),
            DataType::DtUint32 => Ok(DatumType::U32),
            DataType::DtUint64 => Ok(DatumType::U64),
            DataType::DtInt8 => Ok(DatumType::I8),
            DataType::DtInt16 => Ok(DatumType::I16),
            DataType::DtInt32 => Ok(DatumType::I32),
            DataType::DtInt64 => Ok(DatumType::I64),
            DataType::DtHalf => Ok(DatumType::F16),
            DataType::DtFloat => Ok(DatumType::F32),
            DataType::DtDouble => Ok(DatumType::F64),
            _ => bail!("Unsupported DatumType {:?}", t),
        }
    }
}

impl TryFrom<DatumType> for DataType {
    type Error = TesselError;
    fn try_from(dt: DatumType) -> TesselResult<DataType> {
        Ok(match dt {
            DatumType::Bool => DataType::DtBool,
            DatumType::U8 => DataType::DtUint8,
            DatumType::U16 => DataType::DtUint16,
            DatumType::U32 => DataType::DtUint32,
            DatumType::U64 => DataType::DtUint64,
            DatumType::I8 => DataType::DtInt8,
            DatumType::I16 => DataType::DtInt16,
            DatumType::I32 => DataType::DtInt32,
            DatumType::I64 => DataType::DtInt64,
            DatumType::F16 => DataType::DtHalf,
            DatumType::F32 => DataType::DtFloat,
            DatumType::F64 => DataType::DtDouble,
        })
    }
}

/// Dimensions of a shape proto, unknown dims kept negative.
pub fn shape_dims(shape: &TensorShapeProto) -> TVec<i64> {
    shape.dim.iter().map(|d| d.size).collect()
}

/// Pads with the last value, or truncates, to exactly `len` items.
fn fit<T: Datum>(node: &str, mut values: Vec<T>, len: usize) -> TesselResult<Vec<T>> {
    if values.len() < len {
        let Some(&last) = values.last() else {
            let reason = "no data for a non-empty tensor";
            return Err(ImportError::attribute(node, "value", reason).into());
        };
        values.resize(len, last);
    }
    values.truncate(len);
    Ok(values)
}

fn from_repeated<T: Datum>(
    node: &str,
    shape: &[usize],
    values: Vec<T>,
    dt: DatumType,
) -> TesselResult<Tensor> {
    let len = shape.iter().product();
    let values = fit(node, values, len)?;
    let mut bytes = Vec::with_capacity(len * dt.size_of());
    for v in values {
        v.write_le(&mut bytes);
    }
    Tensor::from_raw_bytes(dt, shape, bytes)
}

/// Decodes the payload of a constant.
///
/// `tensor_content` is taken verbatim. Repeated fields are stretched with
/// their last element or truncated to the declared element count. Narrow
/// integer types are stored widened in `int_val` and get narrowed here, as
/// are the bit patterns of half floats in `half_val`.
pub fn decode_tensor(node: &str, t: &TensorProto) -> TesselResult<Tensor> {
    let dtype = DataType::from_i32(t.dtype).ok_or_else(|| {
        ImportError::attribute(node, "value", format!("unknown dtype {}", t.dtype))
    })?;
    let dt = DatumType::try_from(dtype)
        .map_err(|e| ImportError::attribute(node, "value", e.to_string()))?;
    let dims = t.tensor_shape.as_ref().map(shape_dims).unwrap_or_default();
    if dims.iter().any(|&d| d < 0) {
        let reason = format!("unknown dim in {dims:?}");
        return Err(ImportError::attribute(node, "value", reason).into());
    }
    let shape: TVec<usize> = dims.iter().map(|&d| d as usize).collect();
    if !t.tensor_content.is_empty() {
        return Tensor::from_raw_bytes(dt, &shape, t.tensor_content.clone())
            .map_err(|e| ImportError::attribute(node, "value", e.to_string()).into());
    }
    match dt {
        DatumType::F32 => from_repeated(node, &shape, t.float_val.clone(), dt),
        DatumType::F64 => from_repeated(node, &shape, t.double_val.clone(), dt),
        DatumType::I64 => from_repeated(node, &shape, t.int64_val.clone(), dt),
        DatumType::Bool => from_repeated(node, &shape, t.bool_val.clone(), dt),
        DatumType::I32 => from_repeated(node, &shape, t.int_val.clone(), dt),
        DatumType::I16 => {
            from_repeated(node, &shape, t.int_val.iter().map(|&v| v as i16).collect(), dt)
        }
        DatumType::I8 => {
            from_repeated(node, &shape, t.int_val.iter().map(|&v| v as i8).collect(), dt)
        }
        DatumType::U8 => {
            from_repeated(node, &shape, t.int_val.iter().map(|&v| v as u8).collect(), dt)
        }
        DatumType::U16 => {
            from_repeated(node, &shape, t.int_val.iter().map(|&v| v as u16).collect(), dt)
        }
        DatumType::U32 => from_repeated(node, &shape, t.uint32_val.clone(), dt),
        DatumType::U64 => from_repeated(node, &shape, t.uint64_val.clone(), dt),
        DatumType::F16 => {
            let values = t.half_val.iter().map(|&v| f16::from_bits(v as u16)).collect();
            from_repeated(node, &shape, values, dt)
        }
    }
}
