//! 测量时的运行时错误.

use thiserror::Error;

/// 颗粒测量的运行时错误.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MeasureError {
    /// 帧标识不符合 `YYYY-MM-DD_HH-MM-SS_ffffff` 格式. 参数为原始帧标识.
    #[error("malformed frame identifier `{0}`, expected YYYY-MM-DD_HH-MM-SS_ffffff")]
    MalformedFrameIdentifier(String),

    /// 未知的属性名.
    #[error("unknown region property `{0}`")]
    UnknownProperty(String),

    /// 帧与标签掩膜的形状不一致. 参数分别为帧和掩膜的 `(高, 宽)`.
    #[error("frame shape {0:?} does not match mask shape {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),
}
