//! 人工标注图层的预处理.
//!
//! 人工标注以两个图层保存: 背景图层 (原始帧) 与颗粒图层 (颗粒所在处 alpha 非零).
//! 图层文件的解码不在这里完成, 这里只接受已经导出为普通图像的图层.

use crate::label::label_and_fill;
use crate::{BinaryMask, Frame, LabelledMask};
use image::ImageResult;
use log::debug;
use ndarray::{s, Array2, ArrayView2};
use std::path::Path;

/// 逆时针旋转 90 度. 输出形状为 `(w, h)`.
pub fn rot90<T: Clone>(a: ArrayView2<'_, T>) -> Array2<T> {
    a.t().slice(s![..;-1, ..]).to_owned()
}

/// 从两个已解码的图层生成帧与标签掩膜.
///
/// 1. `back` 为背景图层的第一个通道, `alpha` 为颗粒图层的 alpha 通道, 取值均在 `[0, 1]`;
/// 2. 两者都逆时针旋转 90 度;
/// 3. `alpha * 255` 截断为 8-bit 后, 严格大于 `alpha_threshold` 的像素为颗粒;
/// 4. 以 [`label_and_fill`] 过滤并编号.
///
/// 两个图层形状不同时返回 `None`.
pub fn split_layers(
    back: ArrayView2<'_, f64>,
    alpha: ArrayView2<'_, f64>,
    alpha_threshold: u8,
    min_area: usize,
) -> Option<(Frame, LabelledMask)> {
    if back.dim() != alpha.dim() {
        return None;
    }
    let frame = Frame::from_raw(rot90(back));
    let alpha = rot90(alpha);
    let mask = BinaryMask::from_raw(alpha.mapv(|a| super::save::to_gray(a) > alpha_threshold));
    let labelled = label_and_fill(&mask, min_area);
    Some((frame, labelled))
}

/// 校正编辑后图层的方向.
///
/// 标注软件偶尔会把编辑后的图层上下颠倒. 当编辑后的背景 `back` 与未编辑的参考背景
/// `reference_back` 不完全相同时, 将 `back` 与 `mask` 同时上下翻转.
///
/// 返回校正后的帧, 掩膜, 以及是否发生了翻转.
pub fn orient(
    back: Frame,
    mask: LabelledMask,
    reference_back: &Frame,
) -> (Frame, LabelledMask, bool) {
    if &back == reference_back {
        (back, mask, false)
    } else {
        debug!("edited background differs from reference, flipping vertically");
        (back.flipped_ud(), mask.flipped_ud(), true)
    }
}

/// 从硬盘读取导出为图像的两个图层.
///
/// `back_path` 取第一个通道, `mask_path` 取 alpha 通道 (无 alpha 通道的图像视为全不透明).
/// 返回的数组尚未旋转, 可直接传给 [`split_layers`].
pub fn open_layers<P: AsRef<Path>, Q: AsRef<Path>>(
    back_path: P,
    mask_path: Q,
) -> ImageResult<(Array2<f64>, Array2<f64>)> {
    let back = image::open(back_path)?.to_rgba8();
    let alpha = image::open(mask_path)?.to_rgba8();
    let channel = |img: &image::RgbaImage, c: usize| {
        let (w, h) = img.dimensions();
        Array2::from_shape_fn((h as usize, w as usize), |(r, col)| {
            img.get_pixel(col as u32, r as u32).0[c] as f64 / 255.0
        })
    };
    Ok((channel(&back, 0), channel(&alpha, 3)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rot90_counter_clockwise() {
        let a = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(rot90(a.view()), array![[3, 6], [2, 5], [1, 4]]);
    }

    #[test]
    fn test_split_layers() {
        // 2 行 12 列, 旋转后为 12 行 2 列.
        let back = Array2::from_shape_fn((2, 12), |(h, w)| (h * 12 + w) as f64 / 100.0);
        let mut alpha = Array2::zeros((2, 12));
        for w in 0..6 {
            alpha[(0, w)] = 1.0;
            alpha[(1, w)] = 0.5;
        }
        // 100 / 255 截断后恰好是阈值, 不算颗粒.
        alpha[(0, 11)] = 100.5 / 255.0;

        let (frame, mask) = split_layers(back.view(), alpha.view(), 100, 4).unwrap();
        assert_eq!(frame.shape(), (12, 2));
        assert_eq!(mask.shape(), (12, 2));
        assert_eq!(frame[(11, 0)], back[(0, 0)]);
        assert_eq!(mask.labels(), vec![1]);
        assert_eq!(mask.count(1), 12);
        assert_eq!(mask[(0, 0)], 0);

        assert!(split_layers(back.view(), alpha.t(), 100, 4).is_none());
    }

    #[test]
    fn test_orient() {
        let reference = Frame::from_raw(array![[0.0, 0.1], [0.2, 0.3]]);
        let mut m = LabelledMask::zeros((2, 2));
        m[(0, 0)] = 1;

        let (f, l, flipped) = orient(reference.clone(), m.clone(), &reference);
        assert!(!flipped);
        assert_eq!(f, reference);
        assert_eq!(l, m);

        let (f, l, flipped) = orient(reference.flipped_ud(), m.clone(), &reference);
        assert!(flipped);
        assert_eq!(f, reference);
        assert_eq!(l[(1, 0)], 1);
    }

    #[test]
    fn test_open_layers() {
        let dir = tempfile::tempdir().unwrap();
        let back_path = dir.path().join("back.png");
        let mask_path = dir.path().join("mask.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([51, 0, 0, 255]))
            .save(&back_path)
            .unwrap();
        let mut mask = image::RgbaImage::new(3, 2);
        mask.put_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        mask.save(&mask_path).unwrap();

        let (back, alpha) = open_layers(&back_path, &mask_path).unwrap();
        assert_eq!(back.dim(), (2, 3));
        assert!((back[(0, 0)] - 0.2).abs() < 1e-12);
        assert_eq!(alpha[(1, 2)], 1.0);
        assert_eq!(alpha[(0, 0)], 0.0);
    }
}
