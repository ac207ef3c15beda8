use thiserror::Error;

/// 匹配错误.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// 两方颗粒来自不同的帧.
    #[error("cannot match particles across frames: {0} vs {1}")]
    FrameMismatch(String, String),

    /// 严格策略需要两方的标签掩膜.
    #[error("strict mask overlap on frame {0} requires both labelled masks")]
    MissingMask(String),

    /// 两张标签掩膜形状不同.
    #[error("labelled mask shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),
}
