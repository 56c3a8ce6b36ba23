//! Convolution, pooling and friends.

/// Padding sentinel meaning "computed at run time, output keeps the input
/// spatial size".
pub const PAD_SAME: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvParams {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub dilation_h: usize,
    pub dilation_w: usize,
    /// `0` for valid, `PAD_SAME` for same, positive for explicit symmetric
    pub pad_h: i32,
    pub pad_w: i32,
    /// explicit pads, [top, left, bottom, right]
    pub pads: Option<[usize; 4]>,
    pub output_channel: usize,
    pub group: usize,
}

impl Default for ConvParams {
    fn default() -> ConvParams {
        ConvParams {
            kernel_h: 1,
            kernel_w: 1,
            stride_h: 1,
            stride_w: 1,
            dilation_h: 1,
            dilation_w: 1,
            pad_h: 0,
            pad_w: 0,
            pads: None,
            output_channel: 1,
            group: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolMethod {
    #[default]
    Max,
    Avg,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolParams {
    pub method: PoolMethod,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_h: i32,
    pub pad_w: i32,
    pub global: bool,
}

impl Default for PoolParams {
    fn default() -> PoolParams {
        PoolParams {
            method: PoolMethod::Max,
            kernel_h: 1,
            kernel_w: 1,
            stride_h: 1,
            stride_w: 1,
            pad_h: 0,
            pad_w: 0,
            global: false,
        }
    }
}

impl PoolParams {
    pub fn global_avg() -> PoolParams {
        PoolParams { method: PoolMethod::Avg, global: true, ..PoolParams::default() }
    }
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct BatchNormParams {
    pub eps: f32,
}

impl Default for BatchNormParams {
    fn default() -> BatchNormParams {
        BatchNormParams { eps: 1e-5 }
    }
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct SoftmaxParams {
    pub axis: i32,
}

impl Default for SoftmaxParams {
    fn default() -> SoftmaxParams {
        SoftmaxParams { axis: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, new)]
pub struct ReluParams {
    pub negative_slope: f32,
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct ResizeParams {
    pub scale_h: f32,
    pub scale_w: f32,
}

impl Default for ResizeParams {
    fn default() -> ResizeParams {
        ResizeParams { scale_h: 2.0, scale_w: 2.0 }
    }
}
