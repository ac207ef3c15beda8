//! 对 `seg-berry::dataset` 的更一层封装. 提供更直接的数据集定位与加载.

use seg_berry::dataset::{self, BenchmarkLayout};
use std::env;
use std::path::PathBuf;

/// 数据集根目录的环境变量.
pub const DATA_DIR_ENV: &str = "SEGBENCH_DATA_DIR";

/// 获取基准数据集根目录.
///
/// 1. 若环境变量 `$SEGBENCH_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/segmentation_benchmark`;
/// 3. 无法确定用户主目录时返回 `None`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATA_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["segmentation_benchmark"]),
    }
}

/// 优先使用命令行给出的 `explicit`, 否则同 [`data_dir_from_env_or_home`].
pub fn data_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(data_dir_from_env_or_home)
}

/// 获取基准数据集目录布局.
#[inline]
pub fn layout(explicit: Option<PathBuf>) -> Option<BenchmarkLayout> {
    data_dir(explicit).map(BenchmarkLayout::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let d = PathBuf::from("/tmp/somewhere");
        assert_eq!(data_dir(Some(d.clone())), Some(d.clone()));
        assert_eq!(layout(Some(d.clone())).unwrap().root(), d.as_path());
    }
}
