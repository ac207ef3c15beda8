//! 帧标识中的采集时间.

use super::{MeasureError, MeasureResult};
use crate::consts::FRAME_ID_FORMAT;
use chrono::NaiveDateTime;

/// 从帧标识解析出的采集日期和时间.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameStamp {
    /// `YYYYMMDD`.
    pub date: String,

    /// `HHMMSS`.
    pub time: String,
}

impl FrameStamp {
    /// 解析形如 `2021-04-19_10-30-00_123456` 的帧标识.
    pub fn parse(frame_id: &str) -> MeasureResult<Self> {
        let dt = NaiveDateTime::parse_from_str(frame_id, FRAME_ID_FORMAT)
            .map_err(|_| MeasureError::MalformedFrameIdentifier(frame_id.to_owned()))?;
        Ok(Self {
            date: dt.format("%Y%m%d").to_string(),
            time: dt.format("%H%M%S").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::FrameStamp;
    use crate::measure::MeasureError;

    #[test]
    fn test_parse_frame_id() {
        let s = FrameStamp::parse("2021-04-19_10-30-00_123456").unwrap();
        assert_eq!(s.date, "20210419");
        assert_eq!(s.time, "103000");
    }

    #[test]
    fn test_malformed_frame_id() {
        for bad in [
            "",
            "frame_001",
            "2021-04-19 10:30:00.123456",
            "2021-04-19_10-30-00",
            "2021-13-19_10-30-00_123456",
            "2021-04-19_10-30-00_123456.png",
        ] {
            assert_eq!(
                FrameStamp::parse(bad),
                Err(MeasureError::MalformedFrameIdentifier(bad.to_string()))
            );
        }
    }
}
