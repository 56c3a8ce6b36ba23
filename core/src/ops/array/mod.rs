use crate::internal::*;

#[derive(Debug, Clone, PartialEq, Default, new)]
pub struct ConcatParams {
    /// NCHW axis
    pub axis: i32,
}

/// Target shape. `-1` marks the one dimension inferred at run time.
#[derive(Debug, Clone, PartialEq, Default, new)]
pub struct ReshapeParams {
    pub dims: TVec<i64>,
}

impl ReshapeParams {
    /// Resolves the target shape against an input holding `len` elements.
    pub fn output_shape(&self, len: usize) -> TesselResult<TVec<usize>> {
        let known: i64 = self.dims.iter().filter(|d| **d >= 0).product();
        let unknown = self.dims.iter().filter(|d| **d < 0).count();
        ensure!(unknown <= 1, "At most one unknown dimension in reshape, got {:?}", self.dims);
        let inferred = if unknown == 1 {
            ensure!(
                known > 0 && len as i64 % known == 0,
                "Can not reshape {} elements to {:?}",
                len,
                self.dims
            );
            len as i64 / known
        } else {
            ensure!(known == len as i64, "Can not reshape {} elements to {:?}", len, self.dims);
            0
        };
        Ok(self.dims.iter().map(|&d| if d < 0 { inferred as usize } else { d as usize }).collect())
    }
}
