//! 数据集操作: 累积, 加载与导出.
//!
//! [`Dataset`] 为每个流程维护一张颗粒属性表, 为每个候选流程维护一张匹配表.
//! 所有表只能追加; 快照按帧标识排序, 因此累积结果与帧的处理顺序无关.

mod error;
mod export;
mod loader;
mod table;
mod taxonomy;

use crate::matching::{MatchPolicy, MatchRecord};
use crate::measure::{Particle, Property};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use crate::measure::Value;
pub use error::DatasetError;
pub use export::{
    ecotaxa_types, read_frame, read_mask, save_mask, write_csv, write_ecotaxa_tsv,
    write_particles,
};
pub use loader::{load_frame, BenchmarkLayout, FrameInputs, Pipeline, StackPaths};
pub use table::{MatchTable, ParticleTable, Row, TableSnapshot, DIAGONAL_COLUMN};
pub use taxonomy::TaxonomyExport;

/// 数据集运行时错误.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 一帧处理完毕后, 要累积到数据集中的全部结果.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    /// 帧标识.
    pub frame_id: String,

    /// 各流程的颗粒记录.
    pub particles: Vec<(String, Vec<Particle>)>,

    /// 各候选流程与参考流程的匹配记录.
    pub matches: Vec<(String, Vec<MatchRecord>)>,
}

impl FrameOutput {
    /// 空输出.
    pub fn new<S: Into<String>>(frame_id: S) -> Self {
        Self {
            frame_id: frame_id.into(),
            ..Default::default()
        }
    }
}

/// 整个数据集的不可变快照.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSnapshot {
    /// 流程名 -> 颗粒属性表.
    pub particles: BTreeMap<String, TableSnapshot>,

    /// 候选流程名 -> 匹配表.
    pub matches: BTreeMap<String, TableSnapshot>,
}

impl DatasetSnapshot {
    /// 写出所有表格: `<dir>/<流程名>_particles_props.csv` 与 `<dir>/matches_<候选流程名>.csv`.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> DatasetResult<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for (name, table) in self.particles.iter() {
            write_csv(table, dir.join(format!("{name}_particles_props.csv")))?;
        }
        for (name, table) in self.matches.iter() {
            write_csv(table, dir.join(format!("matches_{name}.csv")))?;
        }
        Ok(())
    }
}

/// 一次批处理的累积器.
#[derive(Clone, Debug)]
pub struct Dataset {
    reference: String,
    particles: BTreeMap<String, ParticleTable>,
    matches: BTreeMap<String, MatchTable>,
    taxonomy: Option<TaxonomyExport>,
}

impl Dataset {
    /// 创建空数据集.
    ///
    /// `reference` 为参考流程名, `candidates` 为候选流程名; 所有颗粒属性表都以
    /// `properties` 固定表结构, 候选流程的表另有 [`DIAGONAL_COLUMN`] 列.
    /// 宽松策略下匹配表带有 `bbox_iou` 列.
    pub fn new<S: AsRef<str>>(
        reference: &str,
        candidates: &[S],
        properties: &[Property],
        policy: MatchPolicy,
    ) -> Self {
        let scored = matches!(policy, MatchPolicy::LooseIoU { .. });
        let mut particles = BTreeMap::new();
        particles.insert(reference.to_owned(), ParticleTable::new(properties));
        let mut matches = BTreeMap::new();
        for c in candidates.iter().map(AsRef::as_ref) {
            particles.insert(
                c.to_owned(),
                ParticleTable::new(properties).with_bbox_diagonal(),
            );
            matches.insert(c.to_owned(), MatchTable::new(reference, c, scored));
        }
        Self {
            reference: reference.to_owned(),
            particles,
            matches,
            taxonomy: None,
        }
    }

    /// 为参考流程的颗粒附加分类信息. 只能在追加任何帧之前调用.
    ///
    /// 之后追加的参考颗粒若在 `taxonomy` 中没有对应行, 其分类列留空, 并由 [`Dataset::append`] 报告.
    pub fn with_taxonomy(mut self, taxonomy: TaxonomyExport) -> Self {
        if let Some(table) = self.particles.remove(&self.reference) {
            let table = table.with_extra_columns(taxonomy.columns());
            self.particles.insert(self.reference.clone(), table);
        }
        self.taxonomy = Some(taxonomy);
        self
    }

    /// 参考流程名.
    #[inline]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// 流程 `name` 的颗粒属性表.
    pub fn particle_table(&self, name: &str) -> Option<&ParticleTable> {
        self.particles.get(name)
    }

    /// 候选流程 `name` 的匹配表.
    pub fn match_table(&self, name: &str) -> Option<&MatchTable> {
        self.matches.get(name)
    }

    /// 追加一帧的输出. 要么全部追加, 要么 (出错时) 数据集不变.
    ///
    /// 返回在分类表中找不到对应行的参考颗粒, 每个为一个 [`DatasetError::JoinMismatch`].
    /// 这些颗粒照常追加, 分类列留空; 同一帧的候选颗粒和匹配记录也照常追加.
    ///
    /// # 错误
    ///
    /// 未知流程名, 或记录携带表结构以外的属性时返回 [`DatasetError::UnknownColumn`].
    pub fn append(&mut self, output: &FrameOutput) -> DatasetResult<Vec<DatasetError>> {
        let frame_id = output.frame_id.as_str();

        let mut particle_rows = Vec::with_capacity(output.particles.len());
        let mut misses = Vec::new();
        for (name, records) in output.particles.iter() {
            let table = self
                .particles
                .get(name)
                .ok_or_else(|| DatasetError::UnknownColumn(name.clone()))?;
            let taxonomy = if *name == self.reference {
                self.taxonomy.as_ref()
            } else {
                None
            };
            let (rows, mut missed) = table.rows_for(records, taxonomy)?;
            misses.append(&mut missed);
            particle_rows.push((name, rows));
        }
        let mut match_rows = Vec::with_capacity(output.matches.len());
        for (name, records) in output.matches.iter() {
            let table = self
                .matches
                .get(name)
                .ok_or_else(|| DatasetError::UnknownColumn(format!("{name}_ids")))?;
            match_rows.push((name, table.rows_for(records)));
        }

        for (name, rows) in particle_rows {
            if let Some(t) = self.particles.get_mut(name) {
                t.insert_rows(frame_id, rows);
            }
        }
        for (name, rows) in match_rows {
            if let Some(t) = self.matches.get_mut(name) {
                t.insert_rows(frame_id, rows);
            }
        }
        for miss in misses.iter() {
            warn!("{miss}");
        }
        debug!("frame {frame_id}: appended to dataset");
        Ok(misses)
    }

    /// 所有表的快照.
    pub fn snapshot(&self) -> DatasetSnapshot {
        DatasetSnapshot {
            particles: self
                .particles
                .iter()
                .map(|(k, t)| (k.clone(), t.snapshot()))
                .collect(),
            matches: self
                .matches
                .iter()
                .map(|(k, t)| (k.clone(), t.snapshot()))
                .collect(),
        }
    }
}

/// 可在多个线程间共享的数据集. 唯一的同步点是追加.
#[derive(Debug)]
pub struct SharedDataset {
    inner: Mutex<Dataset>,
}

impl SharedDataset {
    /// 包装.
    pub fn new(dataset: Dataset) -> Self {
        Self {
            inner: Mutex::new(dataset),
        }
    }

    /// 追加一帧的输出, 见 [`Dataset::append`].
    /// 持锁线程 panic 后锁被污染, 但表格只在校验通过后才被修改, 仍可继续使用.
    pub fn append(&self, output: &FrameOutput) -> DatasetResult<Vec<DatasetError>> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.append(output)
    }

    /// 当前快照.
    pub fn snapshot(&self) -> DatasetSnapshot {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.snapshot()
    }

    /// 取回数据集.
    pub fn into_inner(self) -> Dataset {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::label_and_filter;
    use crate::matching::{match_particles, MatchSide};
    use crate::measure::{measure, MeasureOptions};
    use crate::{BinaryMask, Frame};
    use ndarray::Array2;

    /// 在 `(h, w)` 处放置 `size x size` 方块, 生成一帧的完整输出.
    fn frame_output(frame_id: &str, reference: &[(usize, usize, usize)], candidate: &[(usize, usize, usize)]) -> FrameOutput {
        let frame = Frame::from_raw(Array2::from_shape_fn((32, 32), |(h, w)| {
            ((h * 5 + w * 11) % 23) as f64 / 23.0
        }));
        let records = |blocks: &[(usize, usize, usize)]| {
            let mut m = BinaryMask::empty((32, 32));
            for &(h, w, size) in blocks {
                for dh in 0..size {
                    for dw in 0..size {
                        m[(h + dh, w + dw)] = true;
                    }
                }
            }
            let mask = label_and_filter(&m, 0);
            measure(&frame, &mask, frame_id, &MeasureOptions::default())
                .unwrap()
                .records
        };
        let r = records(reference);
        let c = records(candidate);
        let matches = match_particles(
            &MatchSide::new(frame_id, &r),
            &MatchSide::new(frame_id, &c),
            MatchPolicy::default(),
        )
        .unwrap();
        FrameOutput {
            frame_id: frame_id.to_owned(),
            particles: vec![("man".into(), r), ("reg".into(), c)],
            matches: vec![("reg".into(), matches)],
        }
    }

    fn outputs() -> Vec<FrameOutput> {
        vec![
            frame_output("2021-04-19_10-30-00_000003", &[(0, 0, 6), (20, 20, 5)], &[(1, 1, 6)]),
            frame_output("2021-04-19_10-30-00_000001", &[(10, 10, 8)], &[(12, 12, 8), (0, 0, 3)]),
            frame_output("2021-04-19_10-30-00_000002", &[], &[(5, 5, 5)]),
        ]
    }

    fn dataset() -> Dataset {
        Dataset::new("man", &["reg"], &Property::defaults(), MatchPolicy::default())
    }

    #[test]
    fn test_accumulation_commutative() {
        let outs = outputs();
        let mut forward = dataset();
        for o in outs.iter() {
            forward.append(o).unwrap();
        }
        let mut backward = dataset();
        for o in outs.iter().rev() {
            backward.append(o).unwrap();
        }
        let snap = forward.snapshot();
        assert_eq!(snap, backward.snapshot());
        assert_eq!(snap.particles["man"].len(), 3);
        assert_eq!(snap.particles["reg"].len(), 4);
        assert_eq!(snap.matches["reg"].len(), 2);
        assert_eq!(
            snap.matches["reg"].columns(),
            ["img_name", "man_ids", "reg_ids", "bbox_iou"]
        );
    }

    #[test]
    fn test_shared_dataset_parallel_appends() {
        let outs = outputs();
        let shared = SharedDataset::new(dataset());
        std::thread::scope(|s| {
            for o in outs.iter() {
                let shared = &shared;
                s.spawn(move || {
                    shared.append(o).unwrap();
                });
            }
        });
        let mut serial = dataset();
        for o in outs.iter() {
            serial.append(o).unwrap();
        }
        assert_eq!(shared.snapshot(), serial.snapshot());
        assert_eq!(shared.into_inner().snapshot(), serial.snapshot());
    }

    #[test]
    fn test_append_is_atomic() {
        let mut d = dataset();
        let mut bad = outputs().remove(0);
        bad.particles.push(("sem".into(), Vec::new()));
        assert!(matches!(d.append(&bad), Err(DatasetError::UnknownColumn(_))));
        assert!(d.particle_table("man").unwrap().is_empty());
        assert!(d.match_table("reg").unwrap().is_empty());
    }

    #[test]
    fn test_taxonomy_join() {
        let out = frame_output("2021-04-19_10-30-00_000001", &[(10, 10, 8)], &[]);
        let text = "img_name,bbox0,bbox1,bbox2,bbox3,area,taxon\n\
                    2021-04-19_10-30-00_000001,10,10,18,18,64,Copepoda\n";
        let taxo = TaxonomyExport::parse(text, "t.csv").unwrap();
        let mut d = dataset().with_taxonomy(taxo.clone());
        d.append(&out).unwrap();
        let snap = d.snapshot();
        let man = &snap.particles["man"];
        let taxon = man.column_index("taxon").unwrap();
        assert_eq!(man.rows()[0][taxon], Value::from("Copepoda"));
        // 候选流程不做连接.
        assert!(snap.particles["reg"].column_index("taxon").is_none());

    }

    #[test]
    fn test_taxonomy_miss_keeps_frame() {
        // 参考流程两个颗粒, 分类表只有大颗粒的一行; 候选颗粒与大颗粒匹配.
        let frame_id = "2021-04-19_10-30-00_000001";
        let out = frame_output(frame_id, &[(0, 0, 8), (20, 20, 3)], &[(1, 1, 8)]);
        let text = "img_name,bbox0,bbox1,bbox2,bbox3,taxon\n\
                    2021-04-19_10-30-00_000001,0,0,8,8,Copepoda\n";
        let taxo = TaxonomyExport::parse(text, "t.csv").unwrap();
        let mut d = dataset().with_taxonomy(taxo);
        let misses = d.append(&out).unwrap();
        assert_eq!(misses.len(), 1);
        assert!(matches!(
            &misses[0],
            DatasetError::JoinMismatch { bbox, .. } if *bbox == crate::BoundingBox::new(20, 20, 23, 23)
        ));

        let snap = d.snapshot();
        let man = &snap.particles["man"];
        let taxon = man.column_index("taxon").unwrap();
        assert_eq!(man.len(), 2);
        assert_eq!(man.rows()[0][taxon], Value::from("Copepoda"));
        assert_eq!(man.rows()[1][taxon], Value::Empty);
        assert_eq!(snap.particles["reg"].len(), 1);
        assert_eq!(snap.matches["reg"].len(), 1);
    }

    #[test]
    fn test_snapshot_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = dataset();
        for o in outputs().iter() {
            d.append(o).unwrap();
        }
        d.snapshot().write_to(dir.path()).unwrap();
        let text = std::fs::read_to_string(dir.path().join("matches_reg.csv")).unwrap();
        assert!(text.starts_with("img_name,man_ids,reg_ids,bbox_iou\n"));
        assert_eq!(text.lines().count(), 3);
        assert!(dir.path().join("man_particles_props.csv").exists());
        assert!(dir.path().join("reg_particles_props.csv").exists());
    }
}
