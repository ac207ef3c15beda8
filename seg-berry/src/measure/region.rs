//! 单个区域的属性计算.

use super::{Property, Value};
use crate::consts::{BACKGROUND_VALUE, INTENSITY_SCALE};
use crate::eight::fill_holes;
use crate::{Area2d, BoundingBox, Frame};
use itertools::Itertools;
use ndarray::Array2;
use std::f64::consts::{FRAC_PI_4, PI};

/// 标签掩膜中的一个区域, 及其所属帧.
pub(crate) struct Region<'a> {
    label: u32,
    pixels: Area2d,
    bbox: BoundingBox,
    frame: &'a Frame,
}

/// 惯性张量 `[[a, b], [b, c]]` 的特征值 (降序), 以及 `a`, `b`, `c`.
struct Inertia {
    a: f64,
    b: f64,
    c: f64,
    l1: f64,
    l2: f64,
}

impl<'a> Region<'a> {
    /// 初始化. `pixels` 为空时返回 `None`.
    pub(crate) fn new(label: u32, pixels: Area2d, frame: &'a Frame) -> Option<Self> {
        let bbox = BoundingBox::enclosing(pixels.iter())?;
        Some(Self {
            label,
            pixels,
            bbox,
            frame,
        })
    }

    #[inline]
    pub(crate) fn label(&self) -> u32 {
        self.label
    }

    #[inline]
    pub(crate) fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    #[inline]
    pub(crate) fn area(&self) -> usize {
        self.pixels.len()
    }

    /// 外接框内的区域形状 (相对坐标).
    fn footprint(&self) -> Array2<bool> {
        let mut ans = Array2::from_elem(self.bbox.shape(), false);
        for &(h, w) in self.pixels.iter() {
            ans[(h - self.bbox.top, w - self.bbox.left)] = true;
        }
        ans
    }

    /// 颗粒的标准像素表示: 外接框内的帧像素乘以 [`INTENSITY_SCALE`],
    /// 区域以外的像素填充为 [`BACKGROUND_VALUE`] (白色).
    pub(crate) fn canonical_pixels(&self) -> Array2<f64> {
        let window = self.frame.window(&self.bbox);
        let mut ans = Array2::from_elem(self.bbox.shape(), BACKGROUND_VALUE);
        for &(h, w) in self.pixels.iter() {
            let rel = (h - self.bbox.top, w - self.bbox.left);
            ans[rel] = window[rel] * INTENSITY_SCALE;
        }
        ans
    }

    fn intensities(&self) -> impl Iterator<Item = f64> + '_ {
        self.pixels.iter().map(|&p| self.frame[p])
    }

    fn centroid(&self) -> (f64, f64) {
        let n = self.area() as f64;
        let (sr, sc) = self
            .pixels
            .iter()
            .fold((0.0, 0.0), |(r, c), &(h, w)| (r + h as f64, c + w as f64));
        (sr / n, sc / n)
    }

    fn inertia(&self) -> Inertia {
        let n = self.area() as f64;
        let (cr, cc) = self.centroid();
        let (mut mu20, mut mu02, mut mu11) = (0.0, 0.0, 0.0);
        for &(h, w) in self.pixels.iter() {
            let (dr, dc) = (h as f64 - cr, w as f64 - cc);
            mu20 += dr * dr;
            mu02 += dc * dc;
            mu11 += dr * dc;
        }
        let (a, b, c) = (mu02 / n, -mu11 / n, mu20 / n);
        let mean = (a + c) / 2.0;
        let delta = (((a - c) / 2.0).powi(2) + b * b).sqrt();
        Inertia {
            a,
            b,
            c,
            l1: mean + delta,
            l2: (mean - delta).max(0.0),
        }
    }

    /// 计算 `prop` 的取值, 单元格个数等于 [`Property::width`].
    pub(crate) fn value(&self, prop: Property) -> Vec<Value> {
        match prop {
            Property::Label => vec![self.label.into()],
            Property::Area => vec![self.area().into()],
            Property::Bbox => <[usize; 4]>::from(self.bbox)
                .into_iter()
                .map(Value::from)
                .collect(),
            Property::BboxArea => vec![self.bbox.area().into()],
            Property::Centroid => {
                let (r, c) = self.centroid();
                vec![r.into(), c.into()]
            }
            Property::FilledArea => {
                let filled = fill_holes(self.footprint().view());
                vec![filled.iter().filter(|f| **f).count().into()]
            }
            Property::Extent => vec![(self.area() as f64 / self.bbox.area() as f64).into()],
            Property::EquivalentDiameter => {
                vec![(4.0 * self.area() as f64 / PI).sqrt().into()]
            }
            Property::MeanIntensity => {
                vec![(self.intensities().sum::<f64>() / self.area() as f64).into()]
            }
            Property::MinIntensity | Property::MaxIntensity => {
                let (lo, hi) = self
                    .intensities()
                    .minmax_by(f64::total_cmp)
                    .into_option()
                    .unwrap_or_default();
                match prop {
                    Property::MinIntensity => vec![lo.into()],
                    _ => vec![hi.into()],
                }
            }
            Property::MajorAxisLength => vec![(4.0 * self.inertia().l1.sqrt()).into()],
            Property::MinorAxisLength => vec![(4.0 * self.inertia().l2.sqrt()).into()],
            Property::Eccentricity => {
                let Inertia { l1, l2, .. } = self.inertia();
                let e = if l1 == 0.0 { 0.0 } else { (1.0 - l2 / l1).sqrt() };
                vec![e.into()]
            }
            Property::Orientation => {
                let Inertia { a, b, c, .. } = self.inertia();
                let o = if a - c == 0.0 {
                    if b < 0.0 {
                        -FRAC_PI_4
                    } else {
                        FRAC_PI_4
                    }
                } else {
                    0.5 * (-2.0 * b).atan2(c - a)
                };
                vec![o.into()]
            }
        }
    }
}
