//! 按帧累积的表格.
//!
//! 表结构在创建时固定, 之后只能追加行. 行按帧标识分组存储, 快照按帧标识排序,
//! 帧内保持追加顺序. 因此无论帧以何种顺序处理, 得到的快照都相同.

use super::{DatasetError, DatasetResult, TaxonomyExport};
use crate::matching::MatchRecord;
use crate::measure::{self, Particle, Property, Value};
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

/// 表中的一行.
pub type Row = Vec<Value>;

/// 外接框对角线长度列, 只出现在候选流程的颗粒属性表中.
pub const DIAGONAL_COLUMN: &str = "object_diag_bbox";

/// 表格的不可变快照.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSnapshot {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// 字段中含有分隔符, 引号或换行时加引号, 内部引号加倍.
pub(crate) fn quote_field(field: &str, sep: char) -> String {
    if field.contains([sep, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

fn write_line<W: Write, S: AsRef<str>, I: IntoIterator<Item = S>>(
    w: &mut W,
    fields: I,
    sep: char,
) -> io::Result<()> {
    let line = fields
        .into_iter()
        .map(|f| quote_field(f.as_ref(), sep))
        .collect::<Vec<_>>()
        .join(&sep.to_string());
    writeln!(w, "{line}")
}

impl TableSnapshot {
    /// 列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 所有行, 按帧标识排序.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
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

    /// 列名为 `name` 的那一列的下标.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 写出表头.
    pub fn write_header<W: Write>(&self, w: &mut W, sep: char) -> io::Result<()> {
        write_line(w, self.columns.iter(), sep)
    }

    /// 写出所有行 (不含表头).
    pub fn write_rows<W: Write>(&self, w: &mut W, sep: char) -> io::Result<()> {
        for row in self.rows.iter() {
            write_line(w, row.iter().map(|v| v.to_string()), sep)?;
        }
        Ok(())
    }

    /// 以逗号分隔写出, 含表头.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        self.write_header(&mut w, ',')?;
        self.write_rows(&mut w, ',')?;
        w.flush()
    }
}

/// 一个流程的颗粒属性表.
#[derive(Clone, Debug)]
pub struct ParticleTable {
    properties: Vec<Property>,
    columns: Vec<String>,
    diagonal: bool,
    extra_columns: Vec<String>,
    rows: BTreeMap<String, Vec<Row>>,
}

impl ParticleTable {
    /// 以属性列表固定表结构: 前导列, 然后是属性列.
    pub fn new(properties: &[Property]) -> Self {
        let properties: Vec<Property> = properties
            .iter()
            .copied()
            .filter(|p| *p != Property::Label)
            .collect();
        Self {
            columns: measure::columns(&properties),
            properties,
            diagonal: false,
            extra_columns: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    /// 在属性列之后追加 [`DIAGONAL_COLUMN`] 列. 只能在追加任何行之前调用.
    pub fn with_bbox_diagonal(mut self) -> Self {
        debug_assert!(self.rows.is_empty());
        if !self.diagonal {
            let at = self.columns.len() - self.extra_columns.len();
            self.columns.insert(at, DIAGONAL_COLUMN.to_owned());
            self.diagonal = true;
        }
        self
    }

    /// 在属性列之后追加额外的列 (例如分类信息). 只能在追加任何行之前调用.
    pub fn with_extra_columns<S: AsRef<str>, I: IntoIterator<Item = S>>(mut self, it: I) -> Self {
        debug_assert!(self.rows.is_empty());
        let extra: Vec<String> = it.into_iter().map(|s| s.as_ref().to_owned()).collect();
        self.columns.extend(extra.iter().cloned());
        self.extra_columns.extend(extra);
        self
    }

    /// 全部列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 总行数.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// 是否没有任何行?
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(Vec::is_empty)
    }

    /// 为 `p` 生成一行. 额外列留空.
    ///
    /// `p` 携带表结构以外的属性时返回 [`DatasetError::UnknownColumn`];
    /// 表结构中有而 `p` 没有的属性留空.
    fn row_of(&self, p: &Particle) -> DatasetResult<Row> {
        if let Some((unknown, _)) = p
            .properties()
            .iter()
            .find(|(prop, _)| *prop != Property::Label && !self.properties.contains(prop))
        {
            return Err(DatasetError::UnknownColumn(unknown.columns().join(",")));
        }
        let mut row = p.leading_values();
        for prop in self.properties.iter() {
            match p.property(*prop) {
                Some(v) => row.extend(v.iter().cloned()),
                None => row.extend(std::iter::repeat(Value::Empty).take(prop.width())),
            }
        }
        if self.diagonal {
            row.push(Value::Float(p.bbox().diagonal()));
        }
        row.extend(std::iter::repeat(Value::Empty).take(self.extra_columns.len()));
        Ok(row)
    }

    /// 为一帧的所有记录生成行, 不修改表. 任一记录不合法时整体失败.
    ///
    /// 给出 `taxonomy` 时连接分类信息. 找不到对应行的记录其分类列留空,
    /// 对应的 [`DatasetError::JoinMismatch`] 随行一起返回.
    pub(crate) fn rows_for(
        &self,
        records: &[Particle],
        taxonomy: Option<&TaxonomyExport>,
    ) -> DatasetResult<(Vec<Row>, Vec<DatasetError>)> {
        let n_extra = self.extra_columns.len();
        let mut rows = Vec::with_capacity(records.len());
        let mut misses = Vec::new();
        for p in records.iter() {
            let mut row = self.row_of(p)?;
            match taxonomy.map(|taxo| taxo.join(p)) {
                Some(Ok(cells)) => {
                    let start = row.len() - n_extra;
                    for (slot, cell) in row[start..].iter_mut().zip(cells) {
                        *slot = cell;
                    }
                }
                Some(Err(e)) => misses.push(e),
                None => {}
            }
            rows.push(row);
        }
        Ok((rows, misses))
    }

    /// 直接插入已生成的行.
    pub(crate) fn insert_rows(&mut self, frame_id: &str, rows: Vec<Row>) {
        self.rows.entry(frame_id.to_owned()).or_default().extend(rows);
    }

    /// 追加一帧的颗粒记录.
    ///
    /// 任一记录携带表结构以外的属性时返回 [`DatasetError::UnknownColumn`], 表不被修改.
    pub fn append(&mut self, frame_id: &str, records: &[Particle]) -> DatasetResult<()> {
        let (rows, _) = self.rows_for(records, None)?;
        self.insert_rows(frame_id, rows);
        Ok(())
    }

    /// 按帧标识排序的快照.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            columns: self.columns.clone(),
            rows: self.rows.values().flatten().cloned().collect(),
        }
    }
}

/// 参考流程与一个候选流程之间的匹配表.
#[derive(Clone, Debug)]
pub struct MatchTable {
    columns: Vec<String>,
    scored: bool,
    rows: BTreeMap<String, Vec<Row>>,
}

impl MatchTable {
    /// 列为 `img_name, <reference>_ids, <candidate>_ids`, `scored` 时再加 `bbox_iou`.
    pub fn new(reference: &str, candidate: &str, scored: bool) -> Self {
        let mut columns = vec![
            "img_name".to_owned(),
            format!("{reference}_ids"),
            format!("{candidate}_ids"),
        ];
        if scored {
            columns.push("bbox_iou".to_owned());
        }
        Self {
            columns,
            scored,
            rows: BTreeMap::new(),
        }
    }

    /// 全部列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 总行数.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// 是否没有任何行?
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(Vec::is_empty)
    }

    pub(crate) fn rows_for(&self, records: &[MatchRecord]) -> Vec<Row> {
        records
            .iter()
            .map(|r| {
                let mut row: Row = vec![
                    r.frame_id.as_str().into(),
                    r.reference_id.as_str().into(),
                    r.candidate_id.as_str().into(),
                ];
                if self.scored {
                    row.push(r.score.map_or(Value::Empty, Value::Float));
                }
                row
            })
            .collect()
    }

    pub(crate) fn insert_rows(&mut self, frame_id: &str, rows: Vec<Row>) {
        self.rows.entry(frame_id.to_owned()).or_default().extend(rows);
    }

    /// 追加一帧的匹配记录.
    pub fn append(&mut self, frame_id: &str, records: &[MatchRecord]) {
        let rows = self.rows_for(records);
        self.insert_rows(frame_id, rows);
    }

    /// 按帧标识排序的快照.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            columns: self.columns.clone(),
            rows: self.rows.values().flatten().cloned().collect(),
        }
    }
}

/// 检查列名不重复.
pub(crate) fn has_unique_columns(columns: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(columns.len());
    columns.iter().all(|c| seen.insert(c.as_str()))
}
