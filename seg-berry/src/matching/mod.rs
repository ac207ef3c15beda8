//! 跨流程颗粒匹配.
//!
//! 同一帧上, 参考 (人工标注) 颗粒集与候选 (自动分割) 颗粒集两两比较,
//! 由 [`MatchPolicy`] 决定哪些颗粒对互相对应. 匹配结果允许多对多:
//! 自动分割经常把相互接触的生物切开或合并.

mod error;
mod policy;

use crate::{BoundingBox, LabelledMask};
use crate::measure::Particle;
use log::debug;

pub use error::MatchError;
pub use policy::{MatchPolicy, ParsePolicyError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 匹配运行时错误.
pub type MatchResult<T> = Result<T, MatchError>;

/// 一条匹配记录: 在帧 `frame_id` 上, 参考颗粒与候选颗粒相互对应.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchRecord {
    /// 帧标识.
    pub frame_id: String,

    /// 参考颗粒身份.
    pub reference_id: String,

    /// 候选颗粒身份.
    pub candidate_id: String,

    /// 外接框 IoU. 仅宽松策略下存在.
    pub score: Option<f64>,
}

/// 匹配的一方: 一帧上某个流程的颗粒记录, 以及 (严格策略需要的) 标签掩膜.
#[derive(Copy, Clone, Debug)]
pub struct MatchSide<'a> {
    frame_id: &'a str,
    records: &'a [Particle],
    mask: Option<&'a LabelledMask>,
}

impl<'a> MatchSide<'a> {
    /// 仅含颗粒记录, 适用于宽松策略.
    #[inline]
    pub fn new(frame_id: &'a str, records: &'a [Particle]) -> Self {
        Self {
            frame_id,
            records,
            mask: None,
        }
    }

    /// 附带生成这些记录的标签掩膜.
    #[inline]
    pub fn with_mask(mut self, mask: &'a LabelledMask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// 帧标识.
    #[inline]
    pub fn frame_id(&self) -> &str {
        self.frame_id
    }

    /// 颗粒记录.
    #[inline]
    pub fn records(&self) -> &[Particle] {
        self.records
    }
}

/// 在 `window` 内, 是否存在至少一个像素同时满足 `a == label_a` 且 `b == label_b`.
///
/// 只扫描窗口, 不扫描整帧. `window` 必须位于两张掩膜内部.
fn masks_overlap(
    a: &LabelledMask,
    label_a: u32,
    b: &LabelledMask,
    label_b: u32,
    window: &BoundingBox,
) -> bool {
    a.window(window)
        .iter()
        .zip(b.window(window).iter())
        .any(|(&pa, &pb)| pa == label_a && pb == label_b)
}

/// 将参考颗粒集与候选颗粒集按 `policy` 两两匹配.
///
/// 输出按参考颗粒顺序, 其次按候选颗粒顺序排列. 结果是确定的.
///
/// # 错误
///
/// 1. 两方帧标识不同时返回 [`MatchError::FrameMismatch`];
/// 2. 严格策略下任意一方缺少掩膜时返回 [`MatchError::MissingMask`];
/// 3. 严格策略下两张掩膜形状不同时返回 [`MatchError::ShapeMismatch`].
pub fn match_particles(
    reference: &MatchSide,
    candidate: &MatchSide,
    policy: MatchPolicy,
) -> MatchResult<Vec<MatchRecord>> {
    if reference.frame_id != candidate.frame_id {
        return Err(MatchError::FrameMismatch(
            reference.frame_id.to_owned(),
            candidate.frame_id.to_owned(),
        ));
    }
    let frame_id = reference.frame_id;
    let record = |r: &Particle, c: &Particle, score: Option<f64>| MatchRecord {
        frame_id: frame_id.to_owned(),
        reference_id: r.identity().to_owned(),
        candidate_id: c.identity().to_owned(),
        score,
    };

    let mut ans = Vec::new();
    match policy {
        MatchPolicy::LooseIoU { threshold } => {
            for r in reference.records.iter() {
                for c in candidate.records.iter() {
                    let iou = r.bbox().iou(&c.bbox());
                    if iou > threshold {
                        ans.push(record(r, c, Some(iou)));
                    }
                }
            }
        }
        MatchPolicy::StrictMaskOverlap => {
            let (Some(ref_mask), Some(cand_mask)) = (reference.mask, candidate.mask) else {
                return Err(MatchError::MissingMask(frame_id.to_owned()));
            };
            if ref_mask.shape() != cand_mask.shape() {
                return Err(MatchError::ShapeMismatch(ref_mask.shape(), cand_mask.shape()));
            }
            for r in reference.records.iter() {
                for c in candidate.records.iter() {
                    let Some(window) = r.bbox().intersection(&c.bbox()) else {
                        continue;
                    };
                    if masks_overlap(ref_mask, r.label(), cand_mask, c.label(), &window) {
                        ans.push(record(r, c, None));
                    }
                }
            }
        }
    }
    debug!(
        "frame {frame_id}: {} x {} particles -> {} matches ({policy})",
        reference.records.len(),
        candidate.records.len(),
        ans.len()
    );
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::label_and_filter;
    use crate::measure::{measure, MeasureOptions};
    use crate::{BinaryMask, Frame};
    use ndarray::Array2;

    const FRAME_ID: &str = "2021-04-19_10-30-00_000001";

    fn paint(m: &mut BinaryMask, (top, left, bottom, right): (usize, usize, usize, usize)) {
        for h in top..bottom {
            for w in left..right {
                m[(h, w)] = true;
            }
        }
    }

    /// 根据矩形列表生成标签掩膜并测量.
    fn pipeline(frame: &Frame, rects: &[(usize, usize, usize, usize)]) -> (LabelledMask, Vec<Particle>) {
        let mut m = BinaryMask::empty(frame.shape());
        for r in rects {
            paint(&mut m, *r);
        }
        let mask = label_and_filter(&m, 0);
        let records = measure(frame, &mask, FRAME_ID, &MeasureOptions::default())
            .unwrap()
            .records;
        (mask, records)
    }

    fn frame() -> Frame {
        Frame::from_raw(Array2::from_shape_fn((40, 40), |(h, w)| {
            ((h * 7 + w * 3) % 17) as f64 / 17.0
        }))
    }

    #[test]
    fn test_loose_threshold() {
        let f = frame();
        let (_, reference) = pipeline(&f, &[(0, 0, 10, 10)]);
        let (_, candidate) = pipeline(&f, &[(5, 5, 15, 15)]);
        let r = MatchSide::new(FRAME_ID, &reference);
        let c = MatchSide::new(FRAME_ID, &candidate);

        let m = match_particles(&r, &c, MatchPolicy::LooseIoU { threshold: 0.1 }).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].reference_id, reference[0].identity());
        assert_eq!(m[0].candidate_id, candidate[0].identity());
        assert!((m[0].score.unwrap() - 25.0 / 175.0).abs() < 1e-12);

        let m = match_particles(&r, &c, MatchPolicy::LooseIoU { threshold: 0.2 }).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_many_to_many() {
        let f = frame();
        // 一个大颗粒被自动分割切成了两半.
        let (_, reference) = pipeline(&f, &[(2, 2, 12, 22), (30, 30, 35, 35)]);
        let (_, candidate) = pipeline(&f, &[(2, 2, 12, 11), (2, 13, 12, 22)]);
        let m = match_particles(
            &MatchSide::new(FRAME_ID, &reference),
            &MatchSide::new(FRAME_ID, &candidate),
            MatchPolicy::LooseIoU { threshold: 0.1 },
        )
        .unwrap();
        assert_eq!(m.len(), 2);
        assert!(m.iter().all(|r| r.reference_id == reference[0].identity()));
        assert_eq!(m[0].candidate_id, candidate[0].identity());
        assert_eq!(m[1].candidate_id, candidate[1].identity());
    }

    #[test]
    fn test_strict_requires_shared_pixels() {
        let f = frame();
        // 参考颗粒为 L 形, 候选颗粒落在 L 的空白角内: 外接框相交但像素不重叠.
        let (ref_mask, reference) = pipeline(&f, &[(0, 0, 12, 3), (9, 0, 12, 12)]);
        let (cand_mask, candidate) = pipeline(&f, &[(2, 6, 7, 11), (10, 5, 14, 8)]);
        let r = MatchSide::new(FRAME_ID, &reference).with_mask(&ref_mask);
        let c = MatchSide::new(FRAME_ID, &candidate).with_mask(&cand_mask);

        let loose = match_particles(&r, &c, MatchPolicy::LooseIoU { threshold: 0.0 }).unwrap();
        assert_eq!(loose.len(), 2);

        let strict = match_particles(&r, &c, MatchPolicy::StrictMaskOverlap).unwrap();
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].candidate_id, candidate[1].identity());
        assert_eq!(strict[0].score, None);
    }

    #[test]
    fn test_strict_implies_intersecting_boxes() {
        let f = frame();
        let rects_a = [(0, 0, 6, 6), (8, 8, 20, 12), (25, 2, 30, 30), (33, 33, 39, 39)];
        let rects_b = [(3, 3, 9, 9), (10, 10, 26, 14), (27, 20, 29, 38), (0, 30, 5, 35)];
        let (ma, a) = pipeline(&f, &rects_a);
        let (mb, b) = pipeline(&f, &rects_b);
        let r = MatchSide::new(FRAME_ID, &a).with_mask(&ma);
        let c = MatchSide::new(FRAME_ID, &b).with_mask(&mb);

        let strict = match_particles(&r, &c, MatchPolicy::StrictMaskOverlap).unwrap();
        let loose = match_particles(&r, &c, MatchPolicy::LooseIoU { threshold: 0.0 }).unwrap();
        assert!(!strict.is_empty());
        for s in strict.iter() {
            let ra = a.iter().find(|p| p.identity() == s.reference_id).unwrap();
            let cb = b.iter().find(|p| p.identity() == s.candidate_id).unwrap();
            assert!(ra.bbox().intersects(&cb.bbox()));
            assert!(ra.bbox().iou(&cb.bbox()) > 0.0);
            assert!(loose
                .iter()
                .any(|l| l.reference_id == s.reference_id && l.candidate_id == s.candidate_id));
        }
    }

    #[test]
    fn test_errors() {
        let f = frame();
        let (mask, records) = pipeline(&f, &[(0, 0, 4, 4)]);
        let r = MatchSide::new(FRAME_ID, &records);
        let other = MatchSide::new("2021-04-19_10-30-00_000002", &records);
        assert!(matches!(
            match_particles(&r, &other, MatchPolicy::default()),
            Err(MatchError::FrameMismatch(..))
        ));
        assert_eq!(
            match_particles(&r, &r.with_mask(&mask), MatchPolicy::StrictMaskOverlap),
            Err(MatchError::MissingMask(FRAME_ID.into()))
        );
        let small = LabelledMask::zeros((3, 3));
        assert!(matches!(
            match_particles(
                &r.with_mask(&mask),
                &r.with_mask(&small),
                MatchPolicy::StrictMaskOverlap
            ),
            Err(MatchError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn test_empty_sides() {
        let r = MatchSide::new(FRAME_ID, &[]);
        assert!(match_particles(&r, &r, MatchPolicy::default()).unwrap().is_empty());
    }
}
