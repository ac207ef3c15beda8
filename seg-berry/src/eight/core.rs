use super::neighbour8;
use crate::data::PosIter;
use crate::{Area2d, Areas2d, BinaryMask, Idx2d};
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// 8-邻接连通区域.
impl BinaryMask {
    /// 按照 8-相邻规则获取所有颗粒区域. 两个颗粒像素 `p1` 和 `p2` 属于同一个区域,
    /// 当且仅当存在一条从 `p1` 到 `p2` 的 8-相邻路径, 且路径上的所有像素都是颗粒像素.
    ///
    /// 区域按其第一个像素的行优先顺序排列 (即发现顺序); 区域内像素为 BFS 顺序.
    /// 每次运行产生同样的结果.
    pub fn regions8(&self) -> Areas2d {
        let mut ans = Areas2d::new();
        let mut visited = Array2::from_elem(self.shape(), false);
        let mut bfs_q: VecDeque<Idx2d> = VecDeque::with_capacity(16);

        for seed in self.pos_iter() {
            if visited[seed] || !self[seed] {
                continue;
            }
            visited[seed] = true;
            bfs_q.push_back(seed);
            let mut this_area = Area2d::with_capacity(8);
            while let Some(cur) = bfs_q.pop_front() {
                this_area.push(cur);
                for neigh in neighbour8(cur) {
                    if matches!(self.get(neigh), Some(true)) && !visited[neigh] {
                        visited[neigh] = true;
                        bfs_q.push_back(neigh);
                    }
                }
            }
            ans.push(this_area);
        }
        ans
    }
}

/// 填充二值小图 `footprint` 中的空洞, 与 `skimage.measure.regionprops` 的
/// `filled_image` 一致: 与图像边缘 8-相邻连通的背景保持为背景, 其余背景像素都视为空洞.
pub fn fill_holes(footprint: ArrayView2<'_, bool>) -> Array2<bool> {
    let (h, w) = footprint.dim();
    let mut outside = Array2::from_elem((h, w), false);
    let mut q: VecDeque<Idx2d> = PosIter::new((h, w))
        .filter(|&(r, c)| (r == 0 || c == 0 || r + 1 == h || c + 1 == w) && !footprint[(r, c)])
        .collect();
    for &pos in q.iter() {
        outside[pos] = true;
    }

    while let Some(cur) = q.pop_front() {
        for neigh in neighbour8(cur) {
            if matches!(footprint.get(neigh), Some(false)) && !outside[neigh] {
                outside[neigh] = true;
                q.push_back(neigh);
            }
        }
    }
    outside.mapv(|o| !o)
}
