//! 匹配基准的运行函数.

use crate::profile::{FrameOutcome, Profile};
use crate::result::RunResult;
use anyhow::{anyhow, Context};
use log::{info, warn};
use rayon::prelude::*;
use seg_berry::dataset::{
    load_frame, BenchmarkLayout, Dataset, FrameOutput, Pipeline, SharedDataset, TaxonomyExport,
};
use seg_berry::matching::{match_particles, MatchPolicy, MatchSide};
use seg_berry::measure::{measure, MeasureOptions, Property};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// 匹配基准的配置.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// 匹配策略.
    pub policy: MatchPolicy,

    /// 测量的属性.
    pub properties: Vec<Property>,

    /// 是否与人工分类导出表连接.
    pub taxonomy: bool,

    /// 任一帧出错即终止.
    pub fail_fast: bool,

    /// 输出目录. 为 `None` 时使用数据集默认目录.
    pub output: Option<PathBuf>,
}

/// 处理一帧: 读取三个流程的掩膜, 测量, 并将两个候选流程分别与人工流程匹配.
pub fn process_frame(
    layout: &BenchmarkLayout,
    frame_id: &str,
    config: &MatchConfig,
) -> anyhow::Result<FrameOutput> {
    let pipelines = [Pipeline::Manual, Pipeline::Regular, Pipeline::Semantic];
    let inputs = load_frame(layout, frame_id, &pipelines)?;
    let options = MeasureOptions {
        properties: config.properties.clone(),
        ..Default::default()
    };

    let mut measured = Vec::with_capacity(pipelines.len());
    for (p, mask) in inputs.masks.iter() {
        let records = measure(&inputs.frame, mask, frame_id, &options)
            .with_context(|| format!("measuring `{p}` particles"))?
            .records;
        measured.push((*p, mask, records));
    }

    let (_, ref_mask, ref_records) = measured
        .iter()
        .find(|(p, ..)| *p == Pipeline::Manual)
        .ok_or_else(|| anyhow!("no manual mask"))?;
    let reference = MatchSide::new(frame_id, ref_records).with_mask(ref_mask);

    let mut output = FrameOutput::new(frame_id);
    for (p, mask, records) in measured.iter().filter(|(p, ..)| *p != Pipeline::Manual) {
        let candidate = MatchSide::new(frame_id, records).with_mask(mask);
        let matches = match_particles(&reference, &candidate, config.policy)?;
        output.matches.push((p.tag().to_owned(), matches));
    }
    output.particles = measured
        .into_iter()
        .map(|(p, _, records)| (p.tag().to_owned(), records))
        .collect();
    Ok(output)
}

/// 实际运行.
pub fn run(layout: &BenchmarkLayout, config: &MatchConfig) -> anyhow::Result<RunResult> {
    let frames = layout
        .discover_frames()
        .with_context(|| format!("listing frames under {}", layout.root().display()))?;
    info!("Matching particles on {} frames with policy {}", frames.len(), config.policy);

    let candidates = Pipeline::CANDIDATES.map(|p| p.tag());
    let mut dataset = Dataset::new(
        Pipeline::Manual.tag(),
        &candidates,
        &config.properties,
        config.policy,
    );
    if config.taxonomy {
        let path = layout.taxonomy_path();
        let taxonomy = TaxonomyExport::open(&path)
            .with_context(|| format!("reading taxonomy export {}", path.display()))?;
        info!("Joining manual particles with {} taxonomy rows", taxonomy.len());
        dataset = dataset.with_taxonomy(taxonomy);
    }
    let shared = SharedDataset::new(dataset);
    let finished = AtomicUsize::new(0);

    let mut profile = Profile::new();
    let outcomes = frames
        .par_iter()
        .map(|frame_id| -> anyhow::Result<FrameOutcome> {
            let start = Instant::now();
            let result = process_frame(layout, frame_id, config).and_then(|out| {
                let misses = shared.append(&out)?;
                Ok((out, misses))
            });
            let n = finished.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 10 == 0 {
                info!("Done with {n} out of {}", frames.len());
            }
            match result {
                Ok((out, misses)) => Ok(FrameOutcome::Done {
                    frame_id: frame_id.clone(),
                    particles: out
                        .particles
                        .iter()
                        .map(|(k, v)| (k.clone(), v.len() as u64))
                        .collect(),
                    matches: out
                        .matches
                        .iter()
                        .map(|(k, v)| (k.clone(), v.len() as u64))
                        .collect(),
                    join_misses: misses.iter().map(ToString::to_string).collect(),
                    cost: start.elapsed(),
                }),
                Err(e) if config.fail_fast => Err(e.context(format!("frame {frame_id}"))),
                Err(e) => {
                    warn!("Skipping frame {frame_id}: {e:#}");
                    Ok(FrameOutcome::Skipped {
                        frame_id: frame_id.clone(),
                        reason: format!("{e:#}"),
                    })
                }
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    outcomes.into_iter().for_each(|o| profile.record(o));

    let output = config.output.clone().unwrap_or_else(|| layout.output_dir());
    shared
        .snapshot()
        .write_to(&output)
        .with_context(|| format!("writing tables to {}", output.display()))?;
    Ok(RunResult::new("match", profile.finish(), vec![output]))
}
