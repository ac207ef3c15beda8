//! 图像与表格的读写.

use super::table::TableSnapshot;
use super::DatasetResult;
use crate::consts::LEADING_COLUMNS;
use crate::data::save_intensity;
use crate::label::label;
use crate::{BinaryMask, Frame, ImgWriteRaw, LabelledMask};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// EcoTaxa 导入文件中的文本列类型标记.
const TEXT_TYPE: &str = "[t]";

/// EcoTaxa 导入文件中的数值列类型标记.
const FLOAT_TYPE: &str = "[f]";

/// 读取灰度帧, 像素值除以 255.
pub fn read_frame<P: AsRef<Path>>(path: P) -> DatasetResult<Frame> {
    Ok(Frame::open(path)?)
}

/// 读取已保存的分割掩膜: 像素值为 0 (黑色) 的是颗粒, 然后以 8-邻接标记.
pub fn read_mask<P: AsRef<Path>>(path: P) -> DatasetResult<LabelledMask> {
    let img = image::open(path)?.to_luma8();
    let (w, h) = img.dimensions();
    let gray = Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        img.get_pixel(c as u32, r as u32).0[0]
    });
    let binary = BinaryMask::from_gray(gray.view(), |p| p == 0);
    Ok(label(&binary))
}

/// 保存分割掩膜: 颗粒为黑色, 背景为白色.
pub fn save_mask<P: AsRef<Path>>(mask: &LabelledMask, path: P) -> DatasetResult<()> {
    Ok(mask.save_raw(path)?)
}

/// 将颗粒像素数组逐个写为 `<dir>/<identity>.png`, 目录不存在时创建.
pub fn write_particles<P: AsRef<Path>>(
    particles: &BTreeMap<String, Array2<f64>>,
    dir: P,
) -> DatasetResult<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for (identity, pixels) in particles.iter() {
        save_intensity(pixels.view(), dir.join(format!("{identity}.png")))?;
    }
    Ok(())
}

/// 每一列的 EcoTaxa 类型标记: 前导列为文本 `[t]`, 其余为数值 `[f]`.
pub fn ecotaxa_types(columns: &[String]) -> Vec<&'static str> {
    columns
        .iter()
        .map(|c| {
            if LEADING_COLUMNS.contains(&c.as_str()) {
                TEXT_TYPE
            } else {
                FLOAT_TYPE
            }
        })
        .collect()
}

/// 将颗粒属性表写为制表符分隔的 EcoTaxa 导入文件.
///
/// 文件不存在时写出表头与类型标记行; 已存在时直接在末尾追加数据行, 不重复表头.
pub fn write_ecotaxa_tsv<P: AsRef<Path>>(table: &TableSnapshot, path: P) -> DatasetResult<()> {
    let path = path.as_ref();
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = BufWriter::new(file);
    if !exists {
        table.write_header(&mut w, '\t')?;
        writeln!(w, "{}", ecotaxa_types(table.columns()).join("\t"))?;
    }
    table.write_rows(&mut w, '\t')?;
    w.flush()?;
    Ok(())
}

/// 将表格写为逗号分隔文件, 覆盖已有文件.
pub fn write_csv<P: AsRef<Path>>(table: &TableSnapshot, path: P) -> DatasetResult<()> {
    let file = fs::File::create(path)?;
    table.write_csv(BufWriter::new(file))?;
    Ok(())
}
