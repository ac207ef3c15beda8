//! 颗粒测量.
//!
//! 从一帧图像和它的一张标签掩膜中, 为每个正标签区域生成一条颗粒记录.
//! 颗粒以其像素内容的 MD5 作为身份; 相同的像素内容总是得到相同的身份.
//!
//! # 注意
//!
//! 身份只取决于像素内容. 两个形状相同、像素内容完全相同的区域 (例如退化的,
//! 全部被白色填充的小区域) 会得到相同的身份. 需要严格唯一时, 请使用
//! [`Particle::composite_key`].

mod error;
mod property;
mod region;
mod stamp;

use crate::consts::LEADING_COLUMNS;
use crate::{Area2d, BoundingBox, Frame, LabelledMask};
use log::{debug, warn};
use md5::{Digest, Md5};
use ndarray::Array2;
use region::Region;
use std::collections::BTreeMap;

pub use error::MeasureError;
pub use property::{Property, Value};
pub use stamp::FrameStamp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 测量运行时错误.
pub type MeasureResult<T> = Result<T, MeasureError>;

/// 测量选项.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureOptions {
    /// 样本 (断面) 标识.
    pub sample_id: String,

    /// 处理标识. 为 `None` 时使用帧标识.
    pub process_id: Option<String>,

    /// 要测量的属性, 按输出顺序排列.
    pub properties: Vec<Property>,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            sample_id: String::new(),
            process_id: None,
            properties: Property::defaults(),
        }
    }
}

impl MeasureOptions {
    /// 以样本标识和属性列表初始化.
    pub fn new<S: Into<String>>(sample_id: S, properties: Vec<Property>) -> Self {
        Self {
            sample_id: sample_id.into(),
            process_id: None,
            properties,
        }
    }
}

/// 一条颗粒记录. 创建后不再修改.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    identity: String,
    label: u32,
    bbox: BoundingBox,
    area: usize,
    frame_id: String,
    sample_id: String,
    process_id: String,
    date: String,
    time: String,
    properties: Vec<(Property, Vec<Value>)>,
}

impl Particle {
    /// 像素内容的 MD5 (小写十六进制). 颗粒的主键.
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// 颗粒图像的文件名, `<identity>.png`.
    #[inline]
    pub fn file_name(&self) -> String {
        format!("{}.png", self.identity)
    }

    /// 在所属标签掩膜中的标签.
    #[inline]
    pub fn label(&self) -> u32 {
        self.label
    }

    /// 外接框.
    #[inline]
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// 面积 (像素数).
    #[inline]
    pub fn area(&self) -> usize {
        self.area
    }

    /// 所属帧标识.
    #[inline]
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// 样本标识.
    #[inline]
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// 处理标识.
    #[inline]
    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    /// 采集日期 `YYYYMMDD`.
    #[inline]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// 采集时间 `HHMMSS`.
    #[inline]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// 除标签以外的请求属性及其取值, 按请求顺序.
    #[inline]
    pub fn properties(&self) -> &[(Property, Vec<Value>)] {
        &self.properties
    }

    /// 属性 `prop` 的取值. 未测量时返回 `None`.
    pub fn property(&self, prop: Property) -> Option<&[Value]> {
        self.properties
            .iter()
            .find(|(p, _)| *p == prop)
            .map(|(_, v)| v.as_slice())
    }

    /// 严格唯一的复合键 `(帧标识, 标签, 身份)`.
    #[inline]
    pub fn composite_key(&self) -> (&str, u32, &str) {
        (&self.frame_id, self.label, &self.identity)
    }

    /// 固定前导列的取值, 顺序与 [`LEADING_COLUMNS`] 一致.
    pub fn leading_values(&self) -> Vec<Value> {
        vec![
            self.file_name().into(),
            self.identity.as_str().into(),
            self.label.into(),
            self.sample_id.as_str().into(),
            self.frame_id.as_str().into(),
            self.process_id.as_str().into(),
            self.date.as_str().into(),
            self.time.as_str().into(),
        ]
    }

    /// 完整的一行: 前导列, 然后是其余属性列 (按请求顺序).
    pub fn row(&self) -> Vec<Value> {
        let mut ans = self.leading_values();
        ans.extend(self.properties.iter().flat_map(|(_, v)| v.iter().cloned()));
        ans
    }
}

/// 与 [`Particle::row`] 对应的列名.
pub fn columns(properties: &[Property]) -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(
            properties
                .iter()
                .filter(|p| **p != Property::Label)
                .flat_map(|p| p.columns()),
        )
        .collect()
}

/// 一帧一张掩膜的测量结果.
#[derive(Clone, Debug, Default)]
pub struct Measured {
    /// 身份 -> 颗粒标准像素数组.
    pub particles: BTreeMap<String, Array2<f64>>,

    /// 颗粒记录, 按标签升序.
    pub records: Vec<Particle>,
}

/// 像素数组的 MD5: 行优先、小端 `f64` 原始字节.
pub fn content_hash(pixels: &Array2<f64>) -> String {
    let mut hasher = Md5::new();
    for v in pixels.iter() {
        hasher.update(v.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// 单帧测量的共享上下文.
struct FrameContext<'a> {
    frame: &'a Frame,
    frame_id: &'a str,
    process_id: &'a str,
    sample_id: &'a str,
    stamp: FrameStamp,
    extra: Vec<Property>,
}

impl<'a> FrameContext<'a> {
    /// 检查输入并解析帧标识.
    fn new(
        frame: &'a Frame,
        mask: &LabelledMask,
        frame_id: &'a str,
        options: &'a MeasureOptions,
    ) -> MeasureResult<Self> {
        if frame.shape() != mask.shape() {
            return Err(MeasureError::ShapeMismatch(frame.shape(), mask.shape()));
        }
        Ok(Self {
            frame,
            frame_id,
            process_id: options.process_id.as_deref().unwrap_or(frame_id),
            sample_id: &options.sample_id,
            stamp: FrameStamp::parse(frame_id)?,
            extra: options
                .properties
                .iter()
                .copied()
                .filter(|p| *p != Property::Label)
                .collect(),
        })
    }

    /// 测量一个区域, 得到颗粒记录与标准像素数组.
    fn particle(&self, label: u32, pixels: Area2d) -> Option<(Particle, Array2<f64>)> {
        let region = Region::new(label, pixels, self.frame)?;
        let pixels = region.canonical_pixels();
        let particle = Particle {
            identity: content_hash(&pixels),
            label: region.label(),
            bbox: region.bbox(),
            area: region.area(),
            frame_id: self.frame_id.to_owned(),
            sample_id: self.sample_id.to_owned(),
            process_id: self.process_id.to_owned(),
            date: self.stamp.date.clone(),
            time: self.stamp.time.clone(),
            properties: self.extra.iter().map(|p| (*p, region.value(*p))).collect(),
        };
        Some((particle, pixels))
    }

    /// 按标签顺序汇总. 身份冲突时保留先出现的像素数组, 但记录全部保留.
    fn collect<I: IntoIterator<Item = (Particle, Array2<f64>)>>(&self, it: I) -> Measured {
        let mut ans = Measured::default();
        for (particle, pixels) in it {
            if ans.particles.contains_key(particle.identity()) {
                warn!(
                    "frame {}: label {} collides on identity {}",
                    self.frame_id,
                    particle.label(),
                    particle.identity()
                );
            } else {
                ans.particles.insert(particle.identity.clone(), pixels);
            }
            ans.records.push(particle);
        }
        debug!("frame {}: measured {} particles", self.frame_id, ans.records.len());
        ans
    }
}

/// 测量 `mask` 中的所有颗粒.
///
/// 1. 按标签升序处理每个正标签区域;
/// 2. 取区域外接框内的帧像素, 乘以 `0.997`, 区域外的像素置为白色 (`1.0`),
///   得到颗粒的标准像素表示, 其 MD5 即颗粒身份;
/// 3. 按 `options.properties` 计算属性, 解析帧标识得到日期和时间.
///
/// 帧标识不合法时返回 [`MeasureError::MalformedFrameIdentifier`],
/// 帧与掩膜形状不同时返回 [`MeasureError::ShapeMismatch`].
/// 同样的输入总是得到同样的身份和同样的记录顺序.
pub fn measure(
    frame: &Frame,
    mask: &LabelledMask,
    frame_id: &str,
    options: &MeasureOptions,
) -> MeasureResult<Measured> {
    let ctx = FrameContext::new(frame, mask, frame_id, options)?;
    let it = mask
        .regions()
        .into_iter()
        .filter_map(|(label, pixels)| ctx.particle(label, pixels));
    Ok(ctx.collect(it))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 借助 `rayon`, 并行地测量 `mask` 中的所有颗粒. 结果与 [`measure`] 完全相同.
#[cfg(feature = "rayon")]
pub fn par_measure(
    frame: &Frame,
    mask: &LabelledMask,
    frame_id: &str,
    options: &MeasureOptions,
) -> MeasureResult<Measured> {
    let ctx = FrameContext::new(frame, mask, frame_id, options)?;
    let regions: Vec<(u32, Area2d)> = mask.regions().into_iter().collect();
    let measured: Vec<(Particle, Array2<f64>)> = regions
        .into_par_iter()
        .filter_map(|(label, pixels)| ctx.particle(label, pixels))
        .collect();
    Ok(ctx.collect(measured))
}
