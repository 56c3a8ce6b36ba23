#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere in tessel, for node inputs and outputs, or
/// tensor dimensions.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type TesselResult<T> = anyhow::Result<T>;
pub type TesselError = anyhow::Error;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::tensor::Tensor;
    pub use half::f16;
    pub use crate::tvec;
    pub use crate::TVec;
    pub use crate::{TesselError, TesselResult};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{anyhow, bail, ensure, format_err, Context as TesselResultExt};
    pub use smallvec as tessel_smallvec;
    pub use std::collections::HashMap;
}

pub use anyhow;
pub use half;
pub use ndarray;

mod datum;
mod tensor;
