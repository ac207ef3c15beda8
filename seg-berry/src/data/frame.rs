use crate::{BoundingBox, Idx2d};
use image::ImageResult;
use ndarray::{s, Array2, ArrayView2};
use std::ops::Index;
use std::path::Path;

/// 一帧灰度图像, 像素值为 `[0, 1]` 内的归一化亮度.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Array2<f64>,
}

impl Frame {
    /// 直接初始化. 不检查像素值范围.
    #[inline]
    pub fn from_raw(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// 从 8-bit 灰度数组初始化, 像素值除以 255.
    pub fn from_gray(gray: ArrayView2<'_, u8>) -> Self {
        Self {
            data: gray.mapv(|p| p as f64 / 255.0),
        }
    }

    /// 从硬盘读取任意格式的图像, 转换为灰度后归一化.
    pub fn open<P: AsRef<Path>>(path: P) -> ImageResult<Self> {
        let img = image::open(path)?.to_luma8();
        let (w, h) = img.dimensions();
        let data = Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
            img.get_pixel(c as u32, r as u32).0[0] as f64 / 255.0
        });
        Ok(Self { data })
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// 获得 `bbox` 窗口内的视图. `bbox` 必须位于图像内部, 否则程序 panic.
    #[inline]
    pub fn window(&self, bbox: &BoundingBox) -> ArrayView2<'_, f64> {
        self.data
            .slice(s![bbox.top..bbox.bottom, bbox.left..bbox.right])
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<f64> {
        self.data
    }

    /// 垂直翻转 (上下颠倒).
    pub fn flipped_ud(&self) -> Self {
        Self {
            data: self.data.slice(s![..;-1, ..]).to_owned(),
        }
    }
}

impl Index<Idx2d> for Frame {
    type Output = f64;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}
