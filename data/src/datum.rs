use byteorder::{ByteOrder, LittleEndian};
use half::f16;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl DatumType {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, DatumType::U8 | DatumType::U16 | DatumType::U32 | DatumType::U64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DatumType::I8 | DatumType::I16 | DatumType::I32 | DatumType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DatumType::F16 | DatumType::F32 | DatumType::F64)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn size_of(&self) -> usize {
        match self {
            DatumType::Bool | DatumType::U8 | DatumType::I8 => 1,
            DatumType::U16 | DatumType::I16 | DatumType::F16 => 2,
            DatumType::U32 | DatumType::I32 | DatumType::F32 => 4,
            DatumType::U64 | DatumType::I64 | DatumType::F64 => 8,
        }
    }

    /// Name of the type as the engine spells it.
    pub fn engine_name(&self) -> &'static str {
        match self {
            DatumType::Bool => "bool",
            DatumType::U8 => "uint8",
            DatumType::U16 => "uint16",
            DatumType::U32 => "uint32",
            DatumType::U64 => "uint64",
            DatumType::I8 => "int8",
            DatumType::I16 => "int16",
            DatumType::I32 => "int32",
            DatumType::I64 => "int64",
            DatumType::F16 => "float16",
            DatumType::F32 => "float32",
            DatumType::F64 => "float64",
        }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.engine_name())
    }
}

/// An element type that can be read from and written to a little-endian
/// byte buffer.
pub trait Datum: Copy + Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    fn datum_type() -> DatumType;
    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(&self, buf: &mut Vec<u8>);
    fn as_f64(&self) -> f64;
    fn as_i64(&self) -> i64;
}

macro_rules! datum {
    ($t:ty, $v:ident, $read:ident, $write:ident) => {
        impl Datum for $t {
            fn datum_type() -> DatumType {
                DatumType::$v
            }

            fn read_le(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }

            fn write_le(&self, buf: &mut Vec<u8>) {
                let mut bytes = [0u8; std::mem::size_of::<$t>()];
                LittleEndian::$write(&mut bytes, *self);
                buf.extend_from_slice(&bytes);
            }

            fn as_f64(&self) -> f64 {
                *self as f64
            }

            fn as_i64(&self) -> i64 {
                *self as i64
            }
        }
    };
}

datum!(u16, U16, read_u16, write_u16);
datum!(u32, U32, read_u32, write_u32);
datum!(u64, U64, read_u64, write_u64);
datum!(i16, I16, read_i16, write_i16);
datum!(i32, I32, read_i32, write_i32);
datum!(i64, I64, read_i64, write_i64);
datum!(f32, F32, read_f32, write_f32);
datum!(f64, F64, read_f64, write_f64);

impl Datum for f16 {
    fn datum_type() -> DatumType {
        DatumType::F16
    }

    fn read_le(bytes: &[u8]) -> Self {
        f16::from_bits(LittleEndian::read_u16(bytes))
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        self.to_bits().write_le(buf)
    }

    fn as_f64(&self) -> f64 {
        self.to_f64()
    }

    fn as_i64(&self) -> i64 {
        self.to_f32() as i64
    }
}

impl Datum for u8 {
    fn datum_type() -> DatumType {
        DatumType::U8
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        buf.push(*self)
    }

    fn as_f64(&self) -> f64 {
        *self as f64
    }

    fn as_i64(&self) -> i64 {
        *self as i64
    }
}

impl Datum for i8 {
    fn datum_type() -> DatumType {
        DatumType::I8
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8)
    }

    fn as_f64(&self) -> f64 {
        *self as f64
    }

    fn as_i64(&self) -> i64 {
        *self as i64
    }
}

impl Datum for bool {
    fn datum_type() -> DatumType {
        DatumType::Bool
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8)
    }

    fn as_f64(&self) -> f64 {
        if *self { 1.0 } else { 0.0 }
    }

    fn as_i64(&self) -> i64 {
        *self as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(DatumType::F16.size_of(), 2);
        assert_eq!(DatumType::F32.size_of(), f32::datum_type().size_of());
        assert_eq!(DatumType::I64.size_of(), 8);
    }

    #[test]
    fn little_endian() {
        let mut buf = vec![];
        1.5f32.write_le(&mut buf);
        (-3i32).write_le(&mut buf);
        assert_eq!(buf.len(), 8);
        assert_eq!(f32::read_le(&buf[0..4]), 1.5);
        assert_eq!(i32::read_le(&buf[4..8]), -3);
    }

    #[test]
    fn half_floats() {
        let mut buf = vec![];
        f16::from_f32(-2.5).write_le(&mut buf);
        assert_eq!(buf, f16::from_f32(-2.5).to_bits().to_le_bytes());
        assert_eq!(f16::read_le(&buf).as_f64(), -2.5);
    }
}
