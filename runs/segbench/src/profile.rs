//! 批处理运行统计.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// 累加计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时.
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间 (以微秒为单位).
    #[inline]
    fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 单帧处理结果.
#[derive(Clone, Debug)]
pub enum FrameOutcome {
    /// 处理成功.
    Done {
        /// 帧标识.
        frame_id: String,
        /// 各流程的颗粒数.
        particles: Vec<(String, u64)>,
        /// 各候选流程的匹配数.
        matches: Vec<(String, u64)>,
        /// 在分类表中找不到对应行的人工颗粒.
        join_misses: Vec<String>,
        /// 处理耗时.
        cost: Duration,
    },

    /// 输入有误, 已跳过.
    Skipped {
        /// 帧标识.
        frame_id: String,
        /// 原因.
        reason: String,
    },
}

/// 批处理数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功处理的帧数.
    done: u64,

    /// 被跳过的帧, 以及原因.
    skipped: Vec<(String, String)>,

    /// 各流程的颗粒总数.
    particles: BTreeMap<String, u64>,

    /// 各候选流程的匹配总数.
    matches: BTreeMap<String, u64>,

    /// 在分类表中找不到对应行的人工颗粒.
    join_misses: Vec<String>,

    /// 成功处理帧的耗时总和. 并行时大于实际时间.
    frame_time: Duration,

    /// 整个任务花费的总时间.
    real_time: AccTimer,

    /// 最耗时的一帧.
    most: Option<(String, Duration)>,
}

impl Profile {
    /// 初始化, 并开始计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            done: 0,
            skipped: Vec::new(),
            particles: BTreeMap::new(),
            matches: BTreeMap::new(),
            join_misses: Vec::new(),
            frame_time: Duration::ZERO,
            real_time: AccTimer::new(),
            most: None,
        }
    }

    /// 记录一帧的结果.
    pub fn record(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Done {
                frame_id,
                particles,
                matches,
                mut join_misses,
                cost,
            } => {
                self.done += 1;
                for (name, n) in particles {
                    *self.particles.entry(name).or_default() += n;
                }
                for (name, n) in matches {
                    *self.matches.entry(name).or_default() += n;
                }
                self.join_misses.append(&mut join_misses);
                self.frame_time += cost;
                if self.most.as_ref().map_or(true, |(_, d)| cost > *d) {
                    self.most = Some((frame_id, cost));
                }
            }
            FrameOutcome::Skipped { frame_id, reason } => self.skipped.push((frame_id, reason)),
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 成功处理的帧数.
    #[inline]
    pub fn get_done(&self) -> u64 {
        self.done
    }

    /// 被跳过的帧.
    #[inline]
    pub fn get_skipped(&self) -> &[(String, String)] {
        &self.skipped
    }

    /// 各流程的颗粒总数.
    #[inline]
    pub fn get_particles(&self) -> &BTreeMap<String, u64> {
        &self.particles
    }

    /// 各候选流程的匹配总数.
    #[inline]
    pub fn get_matches(&self) -> &BTreeMap<String, u64> {
        &self.matches
    }

    /// 在分类表中找不到对应行的人工颗粒.
    #[inline]
    pub fn get_join_misses(&self) -> &[String] {
        &self.join_misses
    }

    /// 以微秒为单位获得算法运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得每帧平均处理时间.
    #[inline]
    pub fn get_avg_frame_time_us(&self) -> Option<f64> {
        match self.done {
            0 => None,
            done => Some(self.frame_time.as_micros() as f64 / done as f64),
        }
    }

    /// 最耗时的一帧.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<(&str, Duration)> {
        self.most.as_ref().map(|(id, d)| (id.as_str(), *d))
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(id: &str, reg: u64, ms: u64) -> FrameOutcome {
        FrameOutcome::Done {
            frame_id: id.into(),
            particles: vec![("man".into(), 2), ("reg".into(), reg)],
            matches: vec![("reg".into(), 1)],
            join_misses: vec![format!("{id}: no row")],
            cost: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_record() {
        let mut p = Profile::new();
        assert_eq!(p.get_avg_frame_time_us(), None);
        p.record(done("a", 3, 4));
        p.record(done("b", 1, 8));
        p.record(FrameOutcome::Skipped {
            frame_id: "c".into(),
            reason: "missing mask".into(),
        });
        let p = p.finish();
        assert_eq!(p.get_done(), 2);
        assert_eq!(p.get_skipped().len(), 1);
        assert_eq!(p.get_particles()["man"], 4);
        assert_eq!(p.get_particles()["reg"], 4);
        assert_eq!(p.get_matches()["reg"], 2);
        assert_eq!(p.get_join_misses(), ["a: no row", "b: no row"]);
        assert_eq!(p.get_avg_frame_time_us(), Some(6000.0));
        assert_eq!(p.get_most_time_consuming(), Some(("b", Duration::from_millis(8))));
    }
}
