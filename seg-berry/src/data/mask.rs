use super::PosIter;
use crate::consts::label::*;
use crate::{Area2d, BoundingBox, Idx2d};
use ndarray::{s, Array2, ArrayView2};
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

/// 二值掩膜. `true` 代表颗粒像素.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    data: Array2<bool>,
}

/// 标签掩膜. 与所属帧形状相同; 0 为背景, 正整数为 **本掩膜内** 的颗粒标识.
///
/// 标签不跨掩膜、跨帧稳定. 经 [`crate::label::label_and_filter`] 过滤后的掩膜只含奇数标签.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelledMask {
    data: Array2<u32>,
}

/// 掩膜通用的不可变方法集合.
macro_rules! impl_mask_immut {
    ($mask: ty, $pix: ty) => {
        impl $mask {
            /// 直接初始化.
            #[inline]
            pub fn from_raw(data: Array2<$pix>) -> Self {
                Self { data }
            }

            /// 直接获得底层数据.
            #[inline]
            pub fn into_raw(self) -> Array2<$pix> {
                self.data
            }

            /// 获得底层数据的一份不可变 shallow copy.
            #[inline]
            pub fn view(&self) -> ArrayView2<'_, $pix> {
                self.data.view()
            }

            /// 获得 `bbox` 窗口内的视图. `bbox` 必须位于图像内部, 否则程序 panic.
            #[inline]
            pub fn window(&self, bbox: &BoundingBox) -> ArrayView2<'_, $pix> {
                self.data
                    .slice(s![bbox.top..bbox.bottom, bbox.left..bbox.right])
            }

            /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&$pix> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                self.data.dim()
            }

            /// 获得图像的高.
            #[inline]
            pub fn height(&self) -> usize {
                self.shape().0
            }

            /// 获得图像的宽.
            #[inline]
            pub fn width(&self) -> usize {
                self.shape().1
            }

            /// 以行优先规则, 获取能迭代图像所有索引的迭代器.
            #[inline]
            pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
                PosIter::new(self.shape())
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &$pix)> {
                self.data.indexed_iter()
            }
        }

        impl Index<Idx2d> for $mask {
            type Output = $pix;

            #[inline]
            fn index(&self, index: Idx2d) -> &Self::Output {
                &self.data[index]
            }
        }

        impl IndexMut<Idx2d> for $mask {
            #[inline]
            fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
                &mut self.data[index]
            }
        }
    };
}

impl_mask_immut!(BinaryMask, bool);
impl_mask_immut!(LabelledMask, u32);

impl BinaryMask {
    /// 全背景掩膜.
    #[inline]
    pub fn empty(shape: Idx2d) -> Self {
        Self {
            data: Array2::from_elem(shape, false),
        }
    }

    /// 以谓词 `is_particle` 判定 8-bit 灰度图上的颗粒像素.
    pub fn from_gray(gray: ArrayView2<'_, u8>, is_particle: impl Fn(u8) -> bool) -> Self {
        Self {
            data: gray.mapv(is_particle),
        }
    }

    /// 颗粒像素总数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 是否没有任何颗粒像素?
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.data.iter().any(|p| *p)
    }
}

impl LabelledMask {
    /// 全背景标签掩膜.
    #[inline]
    pub fn zeros(shape: Idx2d) -> Self {
        Self {
            data: Array2::zeros(shape),
        }
    }

    /// 该图是否为全背景图?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 掩膜中出现的所有正标签, 升序且不重复.
    pub fn labels(&self) -> Vec<u32> {
        self.regions().into_keys().collect()
    }

    /// 统计图像中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u32) -> usize {
        self.data.iter().filter(|&p| *p == label).count()
    }

    /// 按标签分组的像素索引 (行优先顺序), 标签升序.
    pub fn regions(&self) -> BTreeMap<u32, Area2d> {
        let mut ans: BTreeMap<u32, Area2d> = BTreeMap::new();
        for (pos, &l) in self.indexed_iter() {
            if is_particle(l) {
                ans.entry(l).or_default().push(pos);
            }
        }
        ans
    }

    /// 所有非背景像素组成的二值掩膜.
    pub fn foreground(&self) -> BinaryMask {
        BinaryMask::from_raw(self.data.mapv(is_particle))
    }

    /// 按奇数规则重新标记. 等价于对 [`LabelledMask::foreground`] 调用
    /// [`crate::label::label_and_filter`]. 注意相互接触的不同标签会被合并为一个区域.
    #[inline]
    pub fn relabel_odd(&self, min_area: usize) -> LabelledMask {
        crate::label::label_and_filter(&self.foreground(), min_area)
    }

    /// 所有标签是否都是奇数?
    #[inline]
    pub fn has_only_odd_labels(&self) -> bool {
        self.data.iter().all(|&l| is_background(l) || l % 2 == 1)
    }

    /// 将 `it` 中的每个索引对应的像素改为 `new`.
    pub(crate) fn fill_batch<'a, I: IntoIterator<Item = &'a Idx2d>>(&mut self, it: I, new: u32) {
        for pos in it.into_iter() {
            self[*pos] = new;
        }
    }

    /// 垂直翻转 (上下颠倒).
    pub fn flipped_ud(&self) -> Self {
        Self {
            data: self.data.slice(s![..;-1, ..]).to_owned(),
        }
    }
}
