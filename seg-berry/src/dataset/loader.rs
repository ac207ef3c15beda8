//! 基准数据集的目录布局与单帧加载.
//!
//! 目录布局为:
//!
//! ```text
//! <root>/manual/segmented/<frame_id>.png          人工分割掩膜 (真值)
//! <root>/manual/manual_stacks/<frame_id>/         导出的人工标注图层
//! <root>/regular_apeep/enhanced/<frame_id>.png    背景帧
//! <root>/regular_apeep/segmented/<frame_id>.png   常规自动分割掩膜
//! <root>/semantic_apeep/segmented/<frame_id>.png  语义自动分割掩膜
//! ```

use super::export::{read_frame, read_mask};
use super::DatasetResult;
use crate::{Frame, LabelledMask};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 产生分割掩膜的流程.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Pipeline {
    /// 人工标注, 作为参考.
    Manual,

    /// 常规自动分割.
    Regular,

    /// 语义自动分割.
    Semantic,
}

impl Pipeline {
    /// 两个候选流程.
    pub const CANDIDATES: [Pipeline; 2] = [Self::Regular, Self::Semantic];

    /// 表格列名与文件名中使用的短名.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Manual => "man",
            Self::Regular => "reg",
            Self::Semantic => "sem",
        }
    }

    /// 数据集中的目录名.
    pub const fn dir_name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Regular => "regular_apeep",
            Self::Semantic => "semantic_apeep",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Regular => "regular",
            Self::Semantic => "semantic",
        })
    }
}

impl FromStr for Pipeline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "manual" | "man" => Ok(Self::Manual),
            "regular" | "reg" => Ok(Self::Regular),
            "semantic" | "sem" => Ok(Self::Semantic),
            other => Err(format!("unknown pipeline `{other}`")),
        }
    }
}

/// 基准数据集的目录布局.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkLayout {
    root: PathBuf,
}

impl BenchmarkLayout {
    /// 以数据集根目录初始化. 不检查目录是否存在.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 流程 `p` 的分割掩膜目录.
    pub fn segmented_dir(&self, p: Pipeline) -> PathBuf {
        self.root.join(p.dir_name()).join("segmented")
    }

    /// 流程 `p` 在帧 `frame_id` 上的分割掩膜.
    pub fn mask_path(&self, p: Pipeline, frame_id: &str) -> PathBuf {
        self.segmented_dir(p).join(format!("{frame_id}.png"))
    }

    /// 帧 `frame_id` 的背景图像.
    pub fn background_path(&self, frame_id: &str) -> PathBuf {
        self.root
            .join(Pipeline::Regular.dir_name())
            .join("enhanced")
            .join(format!("{frame_id}.png"))
    }

    /// 导出的人工标注图层目录.
    pub fn manual_stacks_dir(&self) -> PathBuf {
        self.root.join(Pipeline::Manual.dir_name()).join("manual_stacks")
    }

    /// 人工颗粒图像与 EcoTaxa 导入文件的目录.
    pub fn manual_particles_dir(&self, frame_id: &str) -> PathBuf {
        self.root
            .join(Pipeline::Manual.dir_name())
            .join("particles")
            .join(frame_id)
    }

    /// 人工分类导出表.
    pub fn taxonomy_path(&self) -> PathBuf {
        self.root
            .join(Pipeline::Manual.dir_name())
            .join("02.ecotaxa_export_test_set.csv")
    }

    /// 匹配结果输出目录.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("matches_bbox")
    }

    /// 列出所有帧标识: 人工分割掩膜目录下 `*.png` 的文件名主干, 升序.
    pub fn discover_frames(&self) -> DatasetResult<Vec<String>> {
        let mut ans = Vec::new();
        for entry in fs::read_dir(self.segmented_dir(Pipeline::Manual))? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "png") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ans.push(stem.to_owned());
                }
            }
        }
        ans.sort_unstable();
        Ok(ans)
    }

    /// 列出所有人工标注图层目录, 按名称升序. 目录名即帧标识.
    pub fn discover_stacks(&self) -> DatasetResult<Vec<(String, StackPaths)>> {
        let mut ans = Vec::new();
        for entry in fs::read_dir(self.manual_stacks_dir())? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                ans.push((name.to_owned(), StackPaths::in_dir(&path)));
            }
        }
        ans.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Ok(ans)
    }
}

/// 一组导出的人工标注图层.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackPaths {
    /// 编辑后的背景图层.
    pub back: PathBuf,

    /// 颗粒图层 (alpha 通道).
    pub mask: PathBuf,

    /// 未编辑的背景图层, 用于判断方向.
    pub reference: PathBuf,
}

impl StackPaths {
    /// `dir` 下的 `back.png`, `mask.png` 与 `frame.png`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            back: dir.join("back.png"),
            mask: dir.join("mask.png"),
            reference: dir.join("frame.png"),
        }
    }
}

/// 一帧的全部输入: 背景帧, 以及各流程的标签掩膜.
#[derive(Clone, Debug)]
pub struct FrameInputs {
    /// 背景帧.
    pub frame: Frame,

    /// 各流程的标签掩膜, 顺序与加载器的流程顺序一致.
    pub masks: Vec<(Pipeline, LabelledMask)>,
}

impl FrameInputs {
    /// 流程 `p` 的掩膜.
    pub fn mask(&self, p: Pipeline) -> Option<&LabelledMask> {
        self.masks.iter().find(|(q, _)| *q == p).map(|(_, m)| m)
    }
}

/// 读取帧 `frame_id` 的背景与 `pipelines` 的掩膜.
pub fn load_frame(
    layout: &BenchmarkLayout,
    frame_id: &str,
    pipelines: &[Pipeline],
) -> DatasetResult<FrameInputs> {
    let frame = read_frame(layout.background_path(frame_id))?;
    let masks = pipelines
        .iter()
        .map(|p| Ok((*p, read_mask(layout.mask_path(*p, frame_id))?)))
        .collect::<DatasetResult<Vec<_>>>()?;
    Ok(FrameInputs { frame, masks })
}
