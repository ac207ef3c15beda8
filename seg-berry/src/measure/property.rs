//! 可测量的区域属性, 以及属性表中的单元格取值.

use super::{MeasureError, MeasureResult};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 区域属性. 名称与语义均与 `skimage.measure.regionprops` 一致.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Property {
    /// 标签.
    Label,

    /// 面积 (像素数).
    Area,

    /// 外接框 `(min_row, min_col, max_row, max_col)`, 最大值不含. 占 4 列.
    Bbox,

    /// 外接框面积.
    BboxArea,

    /// 质心 `(row, col)`. 占 2 列.
    Centroid,

    /// 填充空洞后的面积.
    FilledArea,

    /// 面积与外接框面积之比.
    Extent,

    /// 与区域面积相同的圆的直径.
    EquivalentDiameter,

    /// 区域内的平均亮度.
    MeanIntensity,

    /// 区域内的最小亮度.
    MinIntensity,

    /// 区域内的最大亮度.
    MaxIntensity,

    /// 与区域二阶矩相同的椭圆的长轴长度.
    MajorAxisLength,

    /// 与区域二阶矩相同的椭圆的短轴长度.
    MinorAxisLength,

    /// 与区域二阶矩相同的椭圆的离心率.
    Eccentricity,

    /// 行轴与椭圆长轴之间的夹角, 弧度, 范围 `[-pi/2, pi/2]`.
    Orientation,
}

impl Property {
    /// 所有支持的属性.
    pub const ALL: [Property; 15] = [
        Self::Label,
        Self::Area,
        Self::Bbox,
        Self::BboxArea,
        Self::Centroid,
        Self::FilledArea,
        Self::Extent,
        Self::EquivalentDiameter,
        Self::MeanIntensity,
        Self::MinIntensity,
        Self::MaxIntensity,
        Self::MajorAxisLength,
        Self::MinorAxisLength,
        Self::Eccentricity,
        Self::Orientation,
    ];

    /// `regionprops` 中的属性名.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Area => "area",
            Self::Bbox => "bbox",
            Self::BboxArea => "bbox_area",
            Self::Centroid => "centroid",
            Self::FilledArea => "filled_area",
            Self::Extent => "extent",
            Self::EquivalentDiameter => "equivalent_diameter",
            Self::MeanIntensity => "mean_intensity",
            Self::MinIntensity => "min_intensity",
            Self::MaxIntensity => "max_intensity",
            Self::MajorAxisLength => "major_axis_length",
            Self::MinorAxisLength => "minor_axis_length",
            Self::Eccentricity => "eccentricity",
            Self::Orientation => "orientation",
        }
    }

    /// 该属性占据的列数.
    pub const fn width(&self) -> usize {
        match self {
            Self::Bbox => 4,
            Self::Centroid => 2,
            _ => 1,
        }
    }

    /// 属性表中的列名, 形如 `object_area`, 多列属性形如 `object_bbox-0`.
    pub fn columns(&self) -> Vec<String> {
        match self.width() {
            1 => vec![format!("object_{}", self.name())],
            n => (0..n)
                .map(|i| format!("object_{}-{i}", self.name()))
                .collect(),
        }
    }

    /// 解析一组属性名.
    pub fn parse_list<S: AsRef<str>, I: IntoIterator<Item = S>>(
        names: I,
    ) -> MeasureResult<Vec<Property>> {
        names.into_iter().map(|n| n.as_ref().parse()).collect()
    }

    /// 默认测量的属性: `label`, `bbox`, `area`.
    pub fn defaults() -> Vec<Property> {
        vec![Self::Label, Self::Bbox, Self::Area]
    }
}

impl FromStr for Property {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| MeasureError::UnknownProperty(s.to_owned()))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 属性表中的一个单元格.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// 文本.
    Text(String),

    /// 整数.
    Int(i64),

    /// 浮点数.
    Float(f64),

    /// 缺失值, 输出为空字符串.
    Empty,
}

impl Value {
    /// 是否为缺失值?
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Self::Int(u as i64)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Self::Int(u as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::{Property, Value};
    use crate::measure::MeasureError;

    #[test]
    fn test_parse_names() {
        for p in Property::ALL {
            assert_eq!(p.name().parse::<Property>(), Ok(p));
        }
        assert_eq!(
            Property::parse_list(["label", " bbox", "area"]),
            Ok(Property::defaults())
        );
        assert_eq!(
            "perimeter_crofton".parse::<Property>(),
            Err(MeasureError::UnknownProperty("perimeter_crofton".into()))
        );
    }

    #[test]
    fn test_columns() {
        assert_eq!(Property::Area.columns(), vec!["object_area"]);
        assert_eq!(
            Property::Bbox.columns(),
            vec!["object_bbox-0", "object_bbox-1", "object_bbox-2", "object_bbox-3"]
        );
        assert_eq!(Property::Centroid.columns().len(), 2);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(3usize).to_string(), "3");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Empty.to_string(), "");
    }
}
