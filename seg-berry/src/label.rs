//! 连通区域标记与面积过滤.
//!
//! 过滤后的标签为奇数 `1, 3, 5, ...`: 第 `k` 个保留下来的区域得到 `2k + 1`.
//! 任意两个标签之和都是偶数, 因此嵌套颗粒的标签叠加后不会与已有标签冲突.

use crate::consts::label::nth_odd;
use crate::eight::fill_holes;
use crate::{Area2d, BinaryMask, BoundingBox, LabelledMask};
use log::debug;
use ndarray::Array2;

/// 8-邻接连通区域标记, 不过滤. 标签为 `1, 2, 3, ...`, 按区域发现顺序 (行优先) 分配.
///
/// 这与读取已保存的分割掩膜时的标记方式一致.
pub fn label(mask: &BinaryMask) -> LabelledMask {
    let mut ans = LabelledMask::zeros(mask.shape());
    for (k, area) in mask.regions8().iter().enumerate() {
        ans.fill_batch(area, k as u32 + 1);
    }
    ans
}

/// 8-邻接连通区域标记, 丢弃面积 (像素数) **不大于** `min_area` 的区域,
/// 剩余区域按发现顺序依次标记为 `1, 3, 5, ...`, 其余像素均为 0.
///
/// 全背景输入得到全 0 掩膜. `min_area == 0` 时保留所有非空区域.
pub fn label_and_filter(mask: &BinaryMask, min_area: usize) -> LabelledMask {
    let mut ans = LabelledMask::zeros(mask.shape());
    let kept = large_regions(mask, min_area);
    for (k, area) in kept.iter().enumerate() {
        ans.fill_batch(area.iter(), nth_odd(k));
    }
    ans
}

/// 与 [`label_and_filter`] 相同的过滤和奇数编号, 但每个区域以 **填充空洞后** 的形状
/// 叠加写入: 位于另一颗粒空洞中的颗粒, 其像素值为两者标签之和 (偶数).
///
/// 这是人工标注图层的处理方式, 奇数编号正是为此设计的.
pub fn label_and_fill(mask: &BinaryMask, min_area: usize) -> LabelledMask {
    let mut ans = LabelledMask::zeros(mask.shape());
    let kept = large_regions(mask, min_area);
    for (k, area) in kept.iter().enumerate() {
        let Some(bbox) = BoundingBox::enclosing(area.iter()) else {
            continue;
        };
        let mut footprint = Array2::from_elem(bbox.shape(), false);
        for &(h, w) in area.iter() {
            footprint[(h - bbox.top, w - bbox.left)] = true;
        }
        let filled = fill_holes(footprint.view());
        let l = nth_odd(k);
        for ((h, w), _) in filled.indexed_iter().filter(|(_, f)| **f) {
            ans[(h + bbox.top, w + bbox.left)] += l;
        }
    }
    ans
}

/// 面积严格大于 `min_area` 的区域, 按发现顺序.
fn large_regions(mask: &BinaryMask, min_area: usize) -> Vec<Area2d> {
    let regions = mask.regions8();
    let total = regions.len();
    let kept: Vec<Area2d> = regions.into_iter().filter(|a| a.len() > min_area).collect();
    debug!(
        "labelled {total} regions, kept {} with area > {min_area}",
        kept.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::collections::BTreeSet;

    fn mask(rows: &[&str]) -> BinaryMask {
        let h = rows.len();
        let w = rows[0].len();
        BinaryMask::from_raw(Array2::from_shape_fn((h, w), |(r, c)| {
            rows[r].as_bytes()[c] == b'#'
        }))
    }

    /// 各标签区域的面积, 与编号无关.
    fn areas(m: &LabelledMask) -> Vec<usize> {
        let mut v: Vec<usize> = m.regions().values().map(|a| a.len()).collect();
        v.sort_unstable();
        v
    }

    fn sample() -> BinaryMask {
        mask(&[
            "##......#", //
            "##...#...", //
            ".....##..", //
            "###..###.", //
            "###......", //
            "###....##", //
        ])
    }

    #[test]
    fn test_small_block_removed() {
        let mut m = BinaryMask::empty((8, 8));
        for h in 2..5 {
            for w in 3..6 {
                m[(h, w)] = true;
            }
        }
        let l = label_and_filter(&m, 10);
        assert!(l.is_background());
        assert_eq!(l.shape(), (8, 8));

        // 面积恰好等于阈值也会被丢弃.
        assert!(label_and_filter(&m, 9).is_background());
        assert_eq!(label_and_filter(&m, 8).labels(), vec![1]);
    }

    #[test]
    fn test_empty_input() {
        let l = label_and_filter(&BinaryMask::empty((5, 7)), 0);
        assert!(l.is_background());
    }

    #[test]
    fn test_odd_labels_in_discovery_order() {
        let l = label_and_filter(&sample(), 0);
        assert_eq!(l.labels(), vec![1, 3, 5, 7, 9]);
        assert!(l.has_only_odd_labels());
        assert_eq!(l[(0, 0)], 1);
        assert_eq!(l[(0, 8)], 3);
        assert_eq!(l[(1, 5)], 5);
        assert_eq!(l[(3, 0)], 7);
        assert_eq!(l[(5, 8)], 9);
        assert_eq!(l[(2, 0)], 0);
    }

    #[test]
    fn test_min_area_zero_keeps_everything() {
        let m = sample();
        assert_eq!(label_and_filter(&m, 0).regions().len(), m.regions8().len());
        assert_eq!(label_and_filter(&m, 0).foreground(), m);
    }

    #[test]
    fn test_labelling_idempotent() {
        for min_area in [0, 1, 2, 4, 6] {
            let once = label_and_filter(&sample(), min_area);
            let twice = once.relabel_odd(min_area);
            assert_eq!(once, twice);
            assert_eq!(areas(&once), areas(&twice));
        }
    }

    #[test]
    fn test_area_monotonic() {
        let m = sample();
        let kept = |t: usize| -> BTreeSet<Vec<(usize, usize)>> {
            label_and_filter(&m, t).regions().into_values().collect()
        };
        for t1 in 0..10 {
            for t2 in t1 + 1..10 {
                assert!(kept(t2).is_subset(&kept(t1)), "{t1} {t2}");
            }
        }
    }

    #[test]
    fn test_label_plain() {
        let l = label(&sample());
        assert_eq!(l.labels(), vec![1, 2, 3, 4, 5]);
        assert_eq!(l[(5, 7)], 5);
    }

    #[test]
    fn test_label_and_fill_nested_sum() {
        let m = mask(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.###.#", //
            "#.....#", //
            "#######", //
        ]);
        let l = label_and_fill(&m, 0);
        // 外环 label 1 (填充后覆盖整个框), 内块 label 3, 叠加为 4.
        assert_eq!(l[(0, 0)], 1);
        assert_eq!(l[(1, 1)], 1);
        assert_eq!(l[(2, 2)], 4);
        assert_eq!(l.count(4), 6);
        assert_eq!(l.count(1), 42 - 6);

        // 过滤掉内块后, 空洞只属于外环.
        let l = label_and_fill(&m, 6);
        assert_eq!(l.labels(), vec![1]);
        assert_eq!(l.count(1), 42);
    }
}
