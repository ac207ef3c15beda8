#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为水下颗粒 (浮游生物) 图像的分割结果提供可复现的颗粒测量,
//! 以及人工标注 (真值) 与自动分割流程之间的跨流程颗粒匹配.
//!
//! 该 crate 目前仅提供 `safe` 接口, 全部核心操作均为同步的纯函数.
//!
//! # 注意
//!
//! 1. 所有实体 (掩膜, 颗粒记录, 匹配记录) 都以单帧为作用域,
//!   不会在帧之间共享或修改. 只有 [`dataset::Dataset`] 跨帧累积结果.
//! 2. 数据格式的解码 (PSD 图层, 视频帧) 不在本 crate 范围内,
//!   这里只处理已经解码好的灰度图像.
//!
//! # 功能
//!
//! ### 连通区域标记与面积过滤 ✅
//!
//! 8-邻接连通区域, 过滤小区域, 并以奇数 (1, 3, 5, ...) 重新编号.
//! 若一个颗粒嵌套在另一个颗粒内部, 两者标签之和为偶数, 不会与任何已有标签冲突.
//!
//! 实现位于 `seg-berry/src/label.rs` 和 `seg-berry/src/eight`.
//!
//! ### 颗粒测量 ✅
//!
//! 每个区域生成一条颗粒记录: 以像素内容 MD5 作为身份, 外加几何/时间属性.
//! 属性语义与 `skimage.measure.regionprops` 保持一致.
//!
//! 实现位于 `seg-berry/src/measure`.
//!
//! ### 跨流程匹配 ✅
//!
//! 两种匹配策略:
//!
//! 1. 宽松策略: 外接框 IoU 大于阈值即匹配, 并记录 IoU;
//! 2. 严格策略: 外接框相交, 且两张掩膜在相交窗口内至少有一个像素同时属于两个颗粒.
//!
//! 实现位于 `seg-berry/src/matching`.
//!
//! ### 数据集累积与导出 ✅
//!
//! 按帧累积颗粒属性表与匹配表. 快照按帧标识排序, 与帧的处理顺序无关.
//!
//! 实现位于 `seg-berry/src/dataset`.

/// 二维索引 `(行, 列)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 一个连通区域的全部像素索引.
type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

/// 帧, 掩膜与外接框等基础数据结构.
mod data;

pub use data::{prepare, BinaryMask, BoundingBox, Frame, ImgWriteRaw, LabelledMask};

pub mod consts;

pub mod eight;

pub mod label;

pub mod measure;

pub mod matching;

pub mod dataset;

pub mod prelude;
