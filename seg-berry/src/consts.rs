//! 通用常量.

/// 标签掩膜中的取值.
pub mod label {
    /// 背景像素的标签.
    pub const BACKGROUND: u32 = 0;

    /// 过滤后第一个颗粒的标签.
    pub const FIRST_ODD: u32 = 1;

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(l: u32) -> bool {
        l == BACKGROUND
    }

    /// 像素是否属于某个颗粒?
    #[inline]
    pub const fn is_particle(l: u32) -> bool {
        l != BACKGROUND
    }

    /// 第 `k` 个 (从 0 开始计数) 保留下来的区域的标签, 即 `2k + 1`.
    ///
    /// 任意两个这样的标签之和都是偶数, 因此不会与任何已分配的标签冲突.
    #[inline]
    pub const fn nth_odd(k: usize) -> u32 {
        (2 * k + 1) as u32
    }
}

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色. 保存掩膜时, 颗粒像素为黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色. 保存掩膜时, 背景像素为白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 颗粒像素数组中, 颗粒以外像素的填充值 (白色).
pub const BACKGROUND_VALUE: f64 = 1.0;

/// 提取颗粒像素时乘上的系数, 使颗粒像素严格暗于背景填充值.
pub const INTENSITY_SCALE: f64 = 0.997;

/// 默认最小颗粒面积 (像素). 面积 **不大于** 该值的区域会被丢弃.
pub const MIN_AREA: usize = 50;

/// 人工标注 alpha 图层的默认阈值 (0..=255). 严格大于该值的像素视为颗粒.
pub const ALPHA_THRESHOLD: u8 = 100;

/// 宽松匹配策略的默认 IoU 阈值.
pub const IOU_THRESHOLD: f64 = 0.1;

/// 帧标识 (同时也是采集时间) 的格式, 例如 `2021-04-19_10-30-00_123456`.
pub const FRAME_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S_%6f";

/// 默认测量的属性.
pub const DEFAULT_PROPERTIES: [&str; 3] = ["label", "bbox", "area"];

/// 颗粒属性表的固定前导列. 颗粒属性表中这些列在 EcoTaxa 导入文件里以文本 `[t]` 标记.
pub const LEADING_COLUMNS: [&str; 8] = [
    "img_file_name",
    "object_id",
    "object_label",
    "sample_id",
    "acq_id",
    "process_id",
    "object_date",
    "object_time",
];
