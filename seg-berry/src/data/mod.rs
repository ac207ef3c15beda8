//! 帧, 掩膜与外接框.
//!
//! 所有二维数据都以 `(行, 列)` 即 `(h, w)` 的方式访问, 与图像的行列方向一致.

mod bbox;
mod frame;
mod iter;
mod mask;
mod save;

pub mod prepare;

pub use bbox::BoundingBox;
pub use frame::Frame;
pub use mask::{BinaryMask, LabelledMask};
pub use save::ImgWriteRaw;

pub(crate) use iter::PosIter;
pub(crate) use save::save_intensity;
