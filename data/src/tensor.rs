//! `Tensor`, a dense little-endian buffer with a datum type and a shape.
use crate::datum::{Datum, DatumType};
use crate::TVec;
use anyhow::{bail, ensure};
use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};
use std::fmt;

/// Tensor is the payload exchanged between the importer and the engine.
///
/// The data is kept as raw bytes so that it can be handed over to the
/// target graph without conversion.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    dt: DatumType,
    shape: TVec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// Wraps an existing byte buffer. Its length must match the shape.
    pub fn from_raw_bytes(dt: DatumType, shape: &[usize], data: Vec<u8>) -> anyhow::Result<Tensor> {
        let len = shape.iter().product::<usize>();
        ensure!(
            data.len() == len * dt.size_of(),
            "Buffer of {} bytes can not hold a {:?} tensor of shape {:?}",
            data.len(),
            dt,
            shape
        );
        Ok(Tensor { dt, shape: shape.into(), data })
    }

    pub fn from_shape<T: Datum>(shape: &[usize], values: &[T]) -> anyhow::Result<Tensor> {
        let len = shape.iter().product::<usize>();
        ensure!(
            values.len() == len,
            "Shape {:?} expects {} values, got {}",
            shape,
            len,
            values.len()
        );
        let mut data = Vec::with_capacity(len * T::datum_type().size_of());
        for v in values {
            v.write_le(&mut data);
        }
        Ok(Tensor { dt: T::datum_type(), shape: shape.into(), data })
    }

    pub fn scalar<T: Datum>(value: T) -> Tensor {
        let mut data = vec![];
        value.write_le(&mut data);
        Tensor { dt: T::datum_type(), shape: tvec!(), data }
    }

    pub fn datum_type(&self) -> DatumType {
        self.dt
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Decodes the content. Fails if `T` is not the tensor datum type.
    pub fn as_vec<T: Datum>(&self) -> anyhow::Result<Vec<T>> {
        if self.dt != T::datum_type() {
            bail!("Tensor is {:?}, accessed as {:?}", self.dt, T::datum_type());
        }
        Ok(self.data.chunks_exact(self.dt.size_of()).map(T::read_le).collect())
    }

    pub fn to_scalar<T: Datum>(&self) -> anyhow::Result<T> {
        if self.len() != 1 {
            bail!("Expected a single value, found a tensor of shape {:?}", self.shape);
        }
        Ok(self.as_vec::<T>()?[0])
    }

    /// Content as i64, for any integer or boolean datum type.
    pub fn to_i64_vec(&self) -> anyhow::Result<Vec<i64>> {
        fn read<T: Datum>(t: &Tensor) -> anyhow::Result<Vec<i64>> {
            Ok(t.as_vec::<T>()?.iter().map(|v| v.as_i64()).collect())
        }
        ensure!(!self.dt.is_float(), "Expected integers, found {:?}", self.dt);
        dispatch_numbers!(read(self.dt)(self))
    }

    /// Content as f32, for any numeric datum type.
    pub fn to_f32_vec(&self) -> anyhow::Result<Vec<f32>> {
        fn read<T: Datum>(t: &Tensor) -> anyhow::Result<Vec<f32>> {
            Ok(t.as_vec::<T>()?.iter().map(|v| v.as_f64() as f32).collect())
        }
        dispatch_numbers!(read(self.dt)(self))
    }

    /// Same data, different shape with the same element count.
    pub fn into_shape(self, shape: &[usize]) -> anyhow::Result<Tensor> {
        ensure!(
            shape.iter().product::<usize>() == self.len(),
            "Can not reshape {:?} to {:?}",
            self.shape,
            shape
        );
        Ok(Tensor { shape: shape.into(), ..self })
    }

    /// Copies the content into an `ndarray` array.
    pub fn to_array<T: Datum>(&self) -> anyhow::Result<ArrayD<T>> {
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), self.as_vec::<T>()?)?)
    }

    pub fn from_array<T: Datum>(array: ArrayD<T>) -> Tensor {
        let array = array.as_standard_layout();
        let mut data = Vec::with_capacity(array.len() * T::datum_type().size_of());
        for v in array.iter() {
            v.write_le(&mut data);
        }
        Tensor { dt: T::datum_type(), shape: array.shape().into(), data }
    }

    /// Moves axes around: output axis `i` is input axis `axes[i]`.
    pub fn permute_axes(&self, axes: &[usize]) -> anyhow::Result<Tensor> {
        let rank = self.rank();
        ensure!(
            axes.len() == rank && (0..rank).all(|a| axes.contains(&a)),
            "Invalid permutation {:?} for shape {:?}",
            axes,
            self.shape
        );
        fn permute<T: Datum>(t: &Tensor, axes: &[usize]) -> anyhow::Result<Tensor> {
            Ok(Tensor::from_array(t.to_array::<T>()?.permuted_axes(IxDyn(axes))))
        }
        dispatch_numbers!(permute(self.dt)(self, axes))
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn head<T: Datum>(t: &Tensor) -> anyhow::Result<String> {
            Ok(t.as_vec::<T>()?.iter().take(8).map(|v| format!("{v:?}")).join(", "))
        }
        let content = (|| -> anyhow::Result<String> { dispatch_numbers!(head(self.dt)(self)) })()
            .unwrap_or_else(|_| format!("{} bytes", self.data.len()));
        let ellipsis = if self.len() > 8 { ", ..." } else { "" };
        write!(f, "{},{:?} {}{}", self.shape.iter().join(","), self.dt, content, ellipsis)
    }
}
