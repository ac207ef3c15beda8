use crate::BoundingBox;
use std::io;
use thiserror::Error;

/// 数据集累积与读写错误.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// 颗粒记录携带了表结构以外的属性.
    #[error("property column `{0}` is not part of the table schema")]
    UnknownColumn(String),

    /// 人工颗粒在分类导出表中找不到对应行.
    #[error("no taxonomy row for frame {frame_id} at bbox {bbox:?}")]
    JoinMismatch {
        /// 帧标识.
        frame_id: String,
        /// 颗粒外接框.
        bbox: BoundingBox,
    },

    /// 文件读写错误.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// 图像编解码错误.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// 文本表格解析错误.
    #[error("{path}:{line}: {reason}")]
    Parse {
        /// 文件路径.
        path: String,
        /// 行号, 从 1 开始.
        line: usize,
        /// 原因.
        reason: String,
    },
}
