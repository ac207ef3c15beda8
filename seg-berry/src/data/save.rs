//! 图像的持久化存储.
//!
//! 所有图像都按原样保存: 掩膜为白底黑颗粒, 帧的亮度乘以 255 后截断为 8-bit.

use crate::consts::gray::{BLACK, WHITE};
use crate::{BinaryMask, Frame, LabelledMask};
use image::{GrayImage, ImageResult, Luma};
use ndarray::ArrayView2;
use std::path::Path;

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 对于掩膜, 按原样意味着 "白底黑颗粒", 这也是 [`crate::dataset::read_mask`]
/// 读取的约定; 对于 `Frame`, 意味着亮度乘以 255 后截断为 8-bit.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// `[0, 1]` 亮度转为 8-bit 灰度. 截断而非四舍五入, 超出范围的值饱和.
#[inline]
pub(crate) fn to_gray(x: f64) -> u8 {
    (x * 255.0) as u8
}

/// 将单通道数组逐像素映射后保存.
fn save_mapped<T, P, F>(data: ArrayView2<'_, T>, path: P, f: F) -> ImageResult<()>
where
    P: AsRef<Path>,
    F: Fn(&T) -> u8,
{
    let (height, width) = data.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), pix) in data.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([f(pix)]));
    }
    buf.save(path)
}

/// 保存 `[0, 1]` 亮度数组, 例如单个颗粒的像素.
pub(crate) fn save_intensity<P: AsRef<Path>>(data: ArrayView2<'_, f64>, path: P) -> ImageResult<()> {
    save_mapped(data, path, |x| to_gray(*x))
}

impl ImgWriteRaw for Frame {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        save_intensity(self.view(), path)
    }
}

impl ImgWriteRaw for BinaryMask {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        save_mapped(self.view(), path, |p| if *p { BLACK } else { WHITE })
    }
}

impl ImgWriteRaw for LabelledMask {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        save_mapped(self.view(), path, |l| {
            if crate::consts::label::is_background(*l) {
                WHITE
            } else {
                BLACK
            }
        })
    }
}
