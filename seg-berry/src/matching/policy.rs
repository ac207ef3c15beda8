//! 匹配策略.

use crate::consts::IOU_THRESHOLD;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 判断两个颗粒是否互相对应的规则.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchPolicy {
    /// 外接框 IoU **严格大于** `threshold` 即匹配.
    LooseIoU {
        /// IoU 阈值, 取值于 `[0, 1)`.
        threshold: f64,
    },

    /// 外接框相交, 且交集窗口内至少有一个像素同时属于两个颗粒.
    StrictMaskOverlap,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::LooseIoU {
            threshold: IOU_THRESHOLD,
        }
    }
}

/// 策略字符串解析错误.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePolicyError(String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid match policy `{}`, expected `iou`, `iou:<threshold>` or `strict`",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for MatchPolicy {
    type Err = ParsePolicyError;

    /// 接受 `strict`, `iou` (默认阈值) 与 `iou:<threshold>`, 阈值须位于 `[0, 1)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePolicyError(s.to_owned());
        match s.trim() {
            "strict" => Ok(Self::StrictMaskOverlap),
            "iou" => Ok(Self::default()),
            other => {
                let t = other.strip_prefix("iou:").ok_or_else(err)?;
                let threshold: f64 = t.trim().parse().map_err(|_| err())?;
                if (0.0..1.0).contains(&threshold) {
                    Ok(Self::LooseIoU { threshold })
                } else {
                    Err(err())
                }
            }
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LooseIoU { threshold } => write!(f, "iou:{threshold}"),
            Self::StrictMaskOverlap => f.write_str("strict"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MatchPolicy;

    #[test]
    fn test_parse() {
        assert_eq!("strict".parse(), Ok(MatchPolicy::StrictMaskOverlap));
        assert_eq!("iou".parse(), Ok(MatchPolicy::LooseIoU { threshold: 0.1 }));
        assert_eq!(
            "iou:0.25".parse(),
            Ok(MatchPolicy::LooseIoU { threshold: 0.25 })
        );
        assert!("iou:1.5".parse::<MatchPolicy>().is_err());
        assert!("iou:-0.1".parse::<MatchPolicy>().is_err());
        assert!("pixels".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for p in [
            MatchPolicy::default(),
            MatchPolicy::StrictMaskOverlap,
            MatchPolicy::LooseIoU { threshold: 0.3 },
        ] {
            assert_eq!(p.to_string().parse(), Ok(p));
        }
    }
}
