//! 人工分类导出表.
//!
//! 导出表为逗号分隔文本, 至少包含 `img_name, bbox0, bbox1, bbox2, bbox3` 列,
//! 其余列 (分类名, 标注者等) 原样附加到人工颗粒属性表上.
//! 以 `(帧标识, 外接框)` 与人工颗粒记录连接.

use super::table::has_unique_columns;
use super::{DatasetError, DatasetResult};
use crate::consts::LEADING_COLUMNS;
use crate::measure::{Particle, Value};
use crate::BoundingBox;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 用于连接的列, 不会作为额外列附加.
const KEY_COLUMNS: [&str; 5] = ["img_name", "bbox0", "bbox1", "bbox2", "bbox3"];

/// 导出表中存在, 但与颗粒属性表重复的列. 直接丢弃.
const DROPPED_COLUMNS: [&str; 1] = ["area"];

/// 与前导列同名的导出列加上此前缀.
const RENAME_PREFIX: &str = "taxo_";

/// 已解析的分类导出表.
#[derive(Clone, Debug, Default)]
pub struct TaxonomyExport {
    columns: Vec<String>,
    rows: HashMap<(String, BoundingBox), Vec<String>>,
}

/// 拆分一行逗号分隔文本. 支持双引号包围的字段与加倍的内部引号, 不支持跨行字段.
pub(crate) fn split_csv_line(line: &str) -> Vec<String> {
    let mut ans = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if cur.is_empty() => quoted = true,
            (',', false) => ans.push(std::mem::take(&mut cur)),
            (c, _) => cur.push(c),
        }
    }
    ans.push(cur);
    ans
}

impl TaxonomyExport {
    /// 解析导出表文本. `origin` 仅用于错误信息.
    pub fn parse(text: &str, origin: &str) -> DatasetResult<Self> {
        let parse_err = |line: usize, reason: String| DatasetError::Parse {
            path: origin.to_owned(),
            line,
            reason,
        };

        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());
        let Some((_, header)) = lines.next() else {
            return Err(parse_err(1, "empty taxonomy export".to_owned()));
        };
        let header = split_csv_line(header);
        let mut key_pos = [0usize; 5];
        for (k, name) in KEY_COLUMNS.iter().enumerate() {
            key_pos[k] = header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| parse_err(1, format!("missing column `{name}`")))?;
        }
        let extra: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                !KEY_COLUMNS.contains(&h.as_str()) && !DROPPED_COLUMNS.contains(&h.as_str())
            })
            .map(|(i, h)| {
                if LEADING_COLUMNS.contains(&h.as_str()) {
                    (i, format!("{RENAME_PREFIX}{h}"))
                } else {
                    (i, h.clone())
                }
            })
            .collect();
        let columns: Vec<String> = extra.iter().map(|(_, h)| h.clone()).collect();
        if !has_unique_columns(&columns) {
            return Err(parse_err(1, "duplicated column names".to_owned()));
        }

        let mut rows = HashMap::new();
        for (n, line) in lines {
            let fields = split_csv_line(line);
            if fields.len() != header.len() {
                return Err(parse_err(
                    n + 1,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                ));
            }
            let mut b = [0usize; 4];
            for (k, slot) in b.iter_mut().enumerate() {
                let raw = fields[key_pos[k + 1]].trim();
                *slot = raw
                    .parse()
                    .map_err(|_| parse_err(n + 1, format!("invalid bbox value `{raw}`")))?;
            }
            let frame = fields[key_pos[0]].trim();
            let frame = frame.strip_suffix(".png").unwrap_or(frame).to_owned();
            let cells = extra.iter().map(|(i, _)| fields[*i].clone()).collect();
            let key = (frame, BoundingBox::from(b));
            if rows.contains_key(&key) {
                return Err(parse_err(
                    n + 1,
                    format!("duplicated row for frame {} at bbox {:?}", key.0, key.1),
                ));
            }
            rows.insert(key, cells);
        }
        Ok(Self { columns, rows })
    }

    /// 从硬盘读取并解析.
    pub fn open<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    /// 附加到颗粒属性表上的列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否没有任何行?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 查找 `(frame_id, bbox)` 对应的额外列.
    pub fn lookup(&self, frame_id: &str, bbox: BoundingBox) -> Option<&[String]> {
        self.rows
            .get(&(frame_id.to_owned(), bbox))
            .map(Vec::as_slice)
    }

    /// 颗粒 `p` 的额外列取值. 找不到对应行时返回 [`DatasetError::JoinMismatch`].
    pub fn join(&self, p: &Particle) -> DatasetResult<Vec<Value>> {
        self.lookup(p.frame_id(), p.bbox())
            .map(|cells| cells.iter().map(|c| Value::from(c.as_str())).collect())
            .ok_or_else(|| DatasetError::JoinMismatch {
                frame_id: p.frame_id().to_owned(),
                bbox: p.bbox(),
            })
    }
}
