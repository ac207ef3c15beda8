//! 外接框, 以及两种匹配策略共用的几何原语.

use crate::Idx2d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 外接框 `(top, left, bottom, right)`, 像素坐标.
///
/// 遵循 `skimage.measure.regionprops` 的约定: `top`/`left` 为包含的最小行/列,
/// `bottom`/`right` 为 **不包含** 的最大行/列. 因此面积为
/// `(bottom - top) * (right - left)`.
///
/// `bottom < top` 或 `right < left` 的框是倒置的; 倒置或面积为零的框是退化的.
/// 退化的框与任何框都不相交, IoU 恒为 0. 这是数值约定, 不视为错误.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    /// 最小行 (含).
    pub top: usize,

    /// 最小列 (含).
    pub left: usize,

    /// 最大行 (不含).
    pub bottom: usize,

    /// 最大列 (不含).
    pub right: usize,
}

impl BoundingBox {
    /// 直接初始化. 不检查是否倒置.
    #[inline]
    pub const fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// 包住所有 `pixels` 的最小外接框. `pixels` 为空时返回 `None`.
    pub fn enclosing<'a, I: IntoIterator<Item = &'a Idx2d>>(pixels: I) -> Option<Self> {
        let mut it = pixels.into_iter();
        let &(h, w) = it.next()?;
        let mut ans = Self::new(h, w, h + 1, w + 1);
        for &(h, w) in it {
            ans.top = ans.top.min(h);
            ans.left = ans.left.min(w);
            ans.bottom = ans.bottom.max(h + 1);
            ans.right = ans.right.max(w + 1);
        }
        Some(ans)
    }

    /// 是否满足 `bottom >= top` 且 `right >= left`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.bottom >= self.top && self.right >= self.left
    }

    /// 是否退化 (倒置, 或面积为零).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.area() == 0
    }

    /// 高 (行数). 倒置时为 0.
    #[inline]
    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    /// 宽 (列数). 倒置时为 0.
    #[inline]
    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    /// 形状 `(高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        (self.height(), self.width())
    }

    /// 面积 `(bottom - top) * (right - left)`. 倒置时为 0.
    #[inline]
    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    /// 对角线长度.
    #[inline]
    pub fn diagonal(&self) -> f64 {
        (self.height() as f64).hypot(self.width() as f64)
    }

    /// 判断像素 `(h, w)` 是否位于框内.
    #[inline]
    pub fn contains(&self, (h, w): Idx2d) -> bool {
        (self.top..self.bottom).contains(&h) && (self.left..self.right).contains(&w)
    }

    /// 两个框的交集.
    ///
    /// 取 `top`, `left` 的较大者和 `bottom`, `right` 的较小者,
    /// 当且仅当 `right >= left` 且 `bottom >= top` 时两框相交.
    /// 因此仅共享一条边的两个框也相交 (交集面积为 0).
    /// 任意一方退化时返回 `None`.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }
        let ans = Self {
            top: self.top.max(other.top),
            left: self.left.max(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.min(other.right),
        };
        ans.is_well_formed().then_some(ans)
    }

    /// 两框是否相交. 参见 [`BoundingBox::intersection`].
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersection(other).is_some()
    }

    /// 交并比 (intersection over union), 取值范围 `[0, 1]`.
    ///
    /// 不相交时为 0; 否则为 `交集面积 / (面积(a) + 面积(b) - 交集面积)`.
    pub fn iou(&self, other: &Self) -> f64 {
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let inter = inter.area() as f64;
        let union = self.area() as f64 + other.area() as f64 - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

impl From<[usize; 4]> for BoundingBox {
    #[inline]
    fn from([top, left, bottom, right]: [usize; 4]) -> Self {
        Self::new(top, left, bottom, right)
    }
}

impl From<BoundingBox> for [usize; 4] {
    #[inline]
    fn from(b: BoundingBox) -> Self {
        [b.top, b.left, b.bottom, b.right]
    }
}
