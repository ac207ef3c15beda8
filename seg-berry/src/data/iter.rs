use crate::Idx2d;

/// 行优先索引迭代器, 也可以限定在一个矩形窗口内迭代.
///
/// 虽然如下函数也能实现相同的功能:
///
/// ```
/// type Idx2d = (usize, usize);
///
/// fn pos_iter_auto((h, w): Idx2d) -> impl Iterator<Item = Idx2d> {
///     (0..h).flat_map(move |first| (0..w).map(move |second| (first, second)))
/// }
///
/// // ...
/// ```
///
/// 但该迭代器对象占用的空间远大于手写的 `PosIter`. 连通区域标记会在每帧上
/// 逐像素扫描, 因此保留该结构.
#[derive(Debug)]
pub struct PosIter {
    cur_h: usize,
    cur_w: usize,
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
}

impl PosIter {
    /// 迭代 `(0, 0)` 到 `(h, w)` (不含) 的所有索引.
    #[inline]
    pub fn new((h, w): Idx2d) -> Self {
        Self::window((0, 0), (h, w))
    }

    /// 迭代 `[top, bottom) x [left, right)` 窗口内的所有索引.
    /// 空窗口 (含倒置窗口) 不产生任何索引.
    #[inline]
    pub fn window((top, left): Idx2d, (bottom, right): Idx2d) -> Self {
        Self {
            cur_h: top,
            cur_w: left,
            top,
            left,
            bottom,
            right,
        }
    }
}

impl Iterator for PosIter {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.top >= self.bottom || self.left >= self.right || self.cur_h >= self.bottom {
            return None;
        }
        let ret_pos = (self.cur_h, self.cur_w);
        if self.cur_w + 1 == self.right {
            self.cur_w = self.left;
            self.cur_h += 1;
        } else {
            self.cur_w += 1;
        }
        Some(ret_pos)
    }
}

#[cfg(test)]
mod completeness_tests {
    use super::PosIter;
    use crate::Idx2d;

    fn pos_iter_builtin((h, w): Idx2d) -> impl Iterator<Item = Idx2d> {
        (0..h).flat_map(move |first| (0..w).map(move |second| (first, second)))
    }

    #[test]
    fn test_builtin_iter_size_larger() {
        use std::mem::size_of_val as sizeof;

        let tup = (1, 1);
        assert!(sizeof(&pos_iter_builtin(tup)) > sizeof(&PosIter::new(tup)));
    }

    #[test]
    fn test_pos_iter() {
        for i in 0..=4 {
            for j in 0..=4 {
                let tup = (i, j);
                assert!(Iterator::eq(pos_iter_builtin(tup), PosIter::new(tup)));
            }
        }
    }

    #[test]
    fn test_window_iter() {
        let got: Vec<Idx2d> = PosIter::window((1, 2), (3, 4)).collect();
        assert_eq!(got, vec![(1, 2), (1, 3), (2, 2), (2, 3)]);

        // 空窗口和倒置窗口.
        assert_eq!(PosIter::window((2, 2), (2, 5)).count(), 0);
        assert_eq!(PosIter::window((3, 3), (1, 1)).count(), 0);
    }
}
