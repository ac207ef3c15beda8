//! 人工标注预处理: 从导出的标注图层生成人工分割掩膜, 颗粒图像与 EcoTaxa 导入文件.

use crate::profile::{FrameOutcome, Profile};
use crate::result::RunResult;
use anyhow::{anyhow, Context};
use log::{info, warn};
use rayon::prelude::*;
use seg_berry::dataset::{
    save_mask, write_ecotaxa_tsv, write_particles, BenchmarkLayout, ParticleTable, Pipeline,
    StackPaths,
};
use seg_berry::measure::{measure, MeasureOptions, Property};
use seg_berry::prepare::{open_layers, orient, split_layers};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// 人工标注预处理的配置.
#[derive(Clone, Debug)]
pub struct ManualConfig {
    /// 最小颗粒面积.
    pub min_area: usize,

    /// alpha 阈值.
    pub alpha_threshold: u8,

    /// 样本 (断面) 标识.
    pub sample_id: String,

    /// 测量的属性.
    pub properties: Vec<Property>,

    /// 任一标注出错即终止.
    pub fail_fast: bool,
}

/// 处理一组标注图层. 返回保留下来的颗粒数.
pub fn process_stack(
    layout: &BenchmarkLayout,
    frame_id: &str,
    stack: &StackPaths,
    config: &ManualConfig,
) -> anyhow::Result<u64> {
    let layers = |back: &PathBuf| -> anyhow::Result<_> {
        let (back, alpha) = open_layers(back, &stack.mask)?;
        split_layers(back.view(), alpha.view(), config.alpha_threshold, config.min_area)
            .ok_or_else(|| anyhow!("background and mask layers differ in shape"))
    };
    let (back, mask) = layers(&stack.back).context("reading edited layers")?;
    let (reference, _) = layers(&stack.reference).context("reading reference layer")?;

    let (back, mask, flipped) = orient(back, mask, &reference);
    if flipped {
        info!("Flipping image {frame_id}");
    }

    let mask_path = layout.mask_path(Pipeline::Manual, frame_id);
    if let Some(parent) = mask_path.parent() {
        fs::create_dir_all(parent)?;
    }
    save_mask(&mask, &mask_path)?;

    if mask.is_background() {
        return Ok(0);
    }
    let options = MeasureOptions::new(config.sample_id.clone(), config.properties.clone());
    let measured = measure(&back, &mask, frame_id, &options)?;

    let dir = layout.manual_particles_dir(frame_id);
    write_particles(&measured.particles, &dir)?;
    let mut table = ParticleTable::new(&config.properties);
    table.append(frame_id, &measured.records)?;
    write_ecotaxa_tsv(
        &table.snapshot(),
        dir.join(format!("ecotaxa_particles_{frame_id}.tsv")),
    )?;
    Ok(measured.records.len() as u64)
}

/// 实际运行.
pub fn run(layout: &BenchmarkLayout, config: &ManualConfig) -> anyhow::Result<RunResult> {
    let stacks = layout.discover_stacks().with_context(|| {
        format!("listing manual stacks under {}", layout.manual_stacks_dir().display())
    })?;
    info!("Processing {} manual stacks", stacks.len());

    let mut profile = Profile::new();
    let outcomes = stacks
        .par_iter()
        .map(|(frame_id, stack)| -> anyhow::Result<FrameOutcome> {
            let start = Instant::now();
            match process_stack(layout, frame_id, stack, config) {
                Ok(n) => {
                    info!("Done image {frame_id}");
                    Ok(FrameOutcome::Done {
                        frame_id: frame_id.clone(),
                        particles: vec![(Pipeline::Manual.tag().to_owned(), n)],
                        matches: Vec::new(),
                        join_misses: Vec::new(),
                        cost: start.elapsed(),
                    })
                }
                Err(e) if config.fail_fast => Err(e.context(format!("stack {frame_id}"))),
                Err(e) => {
                    warn!("Skipping stack {frame_id}: {e:#}");
                    Ok(FrameOutcome::Skipped {
                        frame_id: frame_id.clone(),
                        reason: format!("{e:#}"),
                    })
                }
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    outcomes.into_iter().for_each(|o| profile.record(o));

    Ok(RunResult::new(
        "manual",
        profile.finish(),
        vec![layout.segmented_dir(Pipeline::Manual)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seg_berry::dataset::read_mask;
    use std::path::Path;

    const FRAME_ID: &str = "2021-04-19_10-30-00_000001";

    /// 背景为 8 行 20 列的渐变; 颗粒图层在第 1..6 行, 第 2..14 列不透明.
    fn write_stack(dir: &Path, flip_back: bool) {
        fs::create_dir_all(dir).unwrap();
        let back = image::RgbaImage::from_fn(20, 8, |x, y| {
            let v = (y * 20 + x) as u8;
            image::Rgba([v, v, v, 255])
        });
        back.save(dir.join("frame.png")).unwrap();
        if flip_back {
            // 旋转后的上下翻转, 即原图的左右翻转.
            image::imageops::flip_horizontal(&back)
                .save(dir.join("back.png"))
                .unwrap();
        } else {
            back.save(dir.join("back.png")).unwrap();
        }
        let mask = image::RgbaImage::from_fn(20, 8, |x, y| {
            let a = if (1..6).contains(&y) && (2..14).contains(&x) { 255 } else { 0 };
            image::Rgba([255, 0, 0, a])
        });
        mask.save(dir.join("mask.png")).unwrap();
    }

    fn config() -> ManualConfig {
        ManualConfig {
            min_area: 50,
            alpha_threshold: 100,
            sample_id: "transect".into(),
            properties: Property::defaults(),
            fail_fast: false,
        }
    }

    #[test]
    fn test_process_stack() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BenchmarkLayout::new(dir.path());
        let stack_dir = layout.manual_stacks_dir().join(FRAME_ID);
        write_stack(&stack_dir, false);

        let n = process_stack(&layout, FRAME_ID, &StackPaths::in_dir(&stack_dir), &config()).unwrap();
        assert_eq!(n, 1);

        let mask = read_mask(layout.mask_path(Pipeline::Manual, FRAME_ID)).unwrap();
        assert_eq!(mask.shape(), (20, 8));
        assert_eq!(mask.labels(), vec![1]);
        assert_eq!(mask.count(1), 60);

        let particles = layout.manual_particles_dir(FRAME_ID);
        let tsv = particles.join(format!("ecotaxa_particles_{FRAME_ID}.tsv"));
        assert_eq!(fs::read_to_string(tsv).unwrap().lines().count(), 3);
        let pngs = fs::read_dir(&particles)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().unwrap() == "png")
            .count();
        assert_eq!(pngs, 1);
    }

    #[test]
    fn test_run_flips_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BenchmarkLayout::new(dir.path());
        write_stack(&layout.manual_stacks_dir().join(FRAME_ID), true);
        // 目录名不是合法的帧标识.
        write_stack(&layout.manual_stacks_dir().join("frame-without-time"), false);

        let result = run(&layout, &config()).unwrap();
        assert_eq!(result.profile().get_done(), 1);
        assert_eq!(result.profile().get_skipped().len(), 1);

        let mut c = config();
        c.fail_fast = true;
        assert!(run(&layout, &c).is_err());
    }
}
