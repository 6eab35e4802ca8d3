//! 表格数据模型
//!
//! 数据源的每个接口都返回一张记录表：列名 + 行。
//! 单元格保留 JSON 原始值（字符串、整数、浮点数、日期字符串），
//! 列类型由数据源决定，这里只负责推断、筛选和展示。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 单元格展示的最大宽度（字符数）
const MAX_CELL_WIDTH: usize = 32;

/// 记录表
///
/// `rows` 中每一行的长度始终等于 `columns.len()`，缺失值为 `null`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct DataTable {
    /// 列名（snake_case）
    pub columns: Vec<String>,
    /// 行数据
    pub rows: Vec<Vec<Value>>,
}

/// 反序列化时的原始形态，经 [`DataTable::new`] 补齐行宽
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl From<RawTable> for DataTable {
    fn from(raw: RawTable) -> Self {
        DataTable::new(raw.columns, raw.rows)
    }
}

/// 列类型（推断结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Str,
    Bool,
    /// 整列为空
    Null,
    /// 同一列出现多种类型
    Mixed,
}

impl ColumnType {
    /// 与数据框工具一致的类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Str => "object",
            ColumnType::Bool => "bool",
            ColumnType::Null => "null",
            ColumnType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单列概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: ColumnType,
    pub non_null: usize,
    pub nulls: usize,
}

/// 表格概要：行列数、空值数和列类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_info: Vec<ColumnInfo>,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RangeIndex: {} entries", self.rows)?;
        writeln!(f, "Data columns (total {} columns):", self.columns)?;

        let name_width = self
            .column_info
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(6)
            .max(6);

        writeln!(
            f,
            " {:>3}  {:<name_width$}  {:>14}  {}",
            "#",
            "Column",
            "Non-Null Count",
            "Dtype",
            name_width = name_width
        )?;
        for (i, col) in self.column_info.iter().enumerate() {
            writeln!(
                f,
                " {:>3}  {:<name_width$}  {:>5} non-null  {}",
                i,
                col.name,
                col.non_null,
                col.dtype,
                name_width = name_width
            )?;
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for col in &self.column_info {
            *counts.entry(col.dtype.as_str()).or_default() += 1;
        }
        let summary: Vec<String> = counts
            .iter()
            .map(|(dtype, n)| format!("{}({})", dtype, n))
            .collect();
        write!(f, "dtypes: {}", summary.join(", "))
    }
}

/// 表中一行的只读视图
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a DataTable,
    index: usize,
}

impl<'a> Row<'a> {
    /// 行号
    pub fn index(&self) -> usize {
        self.index
    }

    /// 按列名取原始值，列不存在时为 None
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table
            .column_index(column)
            .map(|c| self.get_at(c).unwrap_or(&Value::Null))
    }

    /// 按列名取数值（数字或数字字符串）
    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(value_as_f64)
    }

    /// 按列名取整数
    pub fn i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(value_as_i64)
    }

    /// 按列名取字符串
    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(|v| v.as_str())
    }

    /// 按列名取文本表示（数字也会转成字符串），空值为 None
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            v => Some(value_to_string(v)),
        }
    }

    /// 转成 JSON 对象
    pub fn to_map(&self) -> Map<String, Value> {
        self.table
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let value = self.get_at(c).cloned().unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }

    fn get_at(&self, c: usize) -> Option<&'a Value> {
        self.table.rows.get(self.index).and_then(|row| row.get(c))
    }
}

impl DataTable {
    /// 用列名和行数据直接构造；短行补 null，长行截断
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// 从 JSON 对象列表构造
    ///
    /// 上游接口使用 camelCase 字段名，这里统一转换为 snake_case。
    /// 列顺序按首次出现的顺序，缺失字段补 null。
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::new();

        for record in records {
            let mut cells = Vec::with_capacity(record.len());
            for (key, value) in record {
                let name = camel_to_snake(&key);
                let col = match index.get(&name) {
                    Some(&c) => c,
                    None => {
                        columns.push(name.clone());
                        index.insert(name, columns.len() - 1);
                        columns.len() - 1
                    }
                };
                cells.push((col, value));
            }
            sparse_rows.push(cells);
        }

        let width = columns.len();
        let rows = sparse_rows
            .into_iter()
            .map(|cells| {
                let mut row = vec![Value::Null; width];
                for (col, value) in cells {
                    row[col] = value;
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// 从 JSON 值列表构造，非对象元素被忽略
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::from_records(values.into_iter().filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        }))
    }

    /// (行数, 列数)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// 取第 `index` 行
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    /// 遍历所有行
    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn f64_at(&self, row: usize, column: &str) -> Option<f64> {
        self.value(row, column).and_then(value_as_f64)
    }

    pub fn str_at(&self, row: usize, column: &str) -> Option<&str> {
        self.value(row, column).and_then(|v| v.as_str())
    }

    /// 整列转为浮点数，列不存在时为 None
    pub fn column_f64(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| value_as_f64(cell(r, col))).collect())
    }

    /// 整列转为整数，列不存在时为 None
    pub fn column_i64(&self, name: &str) -> Option<Vec<Option<i64>>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| value_as_i64(cell(r, col))).collect())
    }

    /// 每列空值数量
    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let nulls = self.rows.iter().filter(|r| cell(r, c).is_null()).count();
                (name.clone(), nulls)
            })
            .collect()
    }

    /// 每列推断类型
    pub fn dtypes(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(c, name)| (name.clone(), infer_column_type(self.rows.iter().map(|r| cell(r, c)))))
            .collect()
    }

    /// 表格概要
    pub fn info(&self) -> TableInfo {
        let column_info = self
            .null_counts()
            .into_iter()
            .zip(self.dtypes())
            .map(|((name, nulls), (_, dtype))| ColumnInfo {
                name,
                dtype,
                non_null: self.rows.len() - nulls,
                nulls,
            })
            .collect();

        TableInfo {
            rows: self.rows.len(),
            columns: self.columns.len(),
            column_info,
        }
    }

    /// 前 n 行
    pub fn head(&self, n: usize) -> DataTable {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// 选取指定列（按给定顺序），不存在的列被忽略
    pub fn select(&self, names: &[&str]) -> DataTable {
        let picked: Vec<(String, usize)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|c| (n.to_string(), c)))
            .collect();

        Self {
            columns: picked.iter().map(|(n, _)| n.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| picked.iter().map(|(_, c)| r[*c].clone()).collect())
                .collect(),
        }
    }

    /// 按条件筛选行
    pub fn filter<F>(&self, predicate: F) -> DataTable
    where
        F: Fn(Row<'_>) -> bool,
    {
        let rows = self
            .iter_rows()
            .filter(|row| predicate(*row))
            .map(|row| self.rows[row.index].clone())
            .collect();

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// 按列排序，空值始终排在最后；列不存在时原样返回
    pub fn sort_by_column(&self, name: &str, descending: bool) -> DataTable {
        let Some(col) = self.column_index(name) else {
            return self.clone();
        };

        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (cell(a, col).is_null(), cell(b, col).is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare_values(cell(a, col), cell(b, col));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        });

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// 删除全为空值的列
    pub fn drop_null_columns(&self) -> DataTable {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&c| self.rows.iter().any(|r| !cell(r, c).is_null()))
            .collect();

        Self {
            columns: keep.iter().map(|&c| self.columns[c].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&c| cell(r, c).clone()).collect())
                .collect(),
        }
    }

    /// 逐行计算派生列；同名列会被替换
    pub fn with_column<F>(&self, name: &str, f: F) -> DataTable
    where
        F: Fn(Row<'_>) -> Option<f64>,
    {
        let values: Vec<Value> = self.iter_rows().map(|row| f64_to_value(f(row))).collect();

        let mut table = self.clone();
        match table.column_index(name) {
            Some(col) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    if let Some(cell) = row.get_mut(col) {
                        *cell = value;
                    }
                }
            }
            None => {
                table.columns.push(name.to_string());
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        table
    }

    /// 重命名列，源列不存在或目标列已存在时不做任何事
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if self.has_column(to) {
            return;
        }
        if let Some(col) = self.column_index(from) {
            self.columns[col] = to.to_string();
        }
    }

    /// 原地转换某一列的值
    pub fn map_column<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Value) -> Value,
    {
        if let Some(col) = self.column_index(name) {
            for cell in self.rows.iter_mut().filter_map(|row| row.get_mut(col)) {
                *cell = f(cell);
            }
        }
    }

    /// 在指定位置插入一列；值数量不足时补 null
    pub fn insert_column(&mut self, index: usize, name: &str, mut values: Vec<Value>) {
        let index = index.min(self.columns.len());
        values.resize(self.rows.len(), Value::Null);
        self.columns.insert(index, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(index, value);
        }
    }

    /// 按整数键列分组并对数值列求和（跳过空值）
    ///
    /// 键为空的行被忽略；某组所有值都为空时和为 0。
    pub fn group_sum(&self, key: &str, value: &str) -> BTreeMap<i64, f64> {
        let mut groups = BTreeMap::new();
        for row in self.iter_rows() {
            let Some(k) = row.i64(key) else { continue };
            let entry = groups.entry(k).or_insert(0.0);
            if let Some(v) = row.f64(value) {
                *entry += v;
            }
        }
        groups
    }

    /// 所有行转成 JSON 对象
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.iter_rows().map(|row| row.to_map()).collect()
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "Empty DataTable\nColumns: []\nIndex: []");
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                (0..self.columns.len())
                    .map(|c| truncate(&value_to_string(cell(r, c))))
                    .collect()
            })
            .collect();

        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                cells
                    .iter()
                    .map(|r| r[c].chars().count())
                    .chain(std::iter::once(truncate(name).chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "", index_width = index_width)?;
        for (name, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", truncate(name), width = width)?;
        }

        for (i, row) in cells.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:<index_width$}", i, index_width = index_width)?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell, width = width)?;
            }
        }
        Ok(())
    }
}

/// 取一行中的单元格，越界视为空值
fn cell(row: &[Value], c: usize) -> &Value {
    row.get(c).unwrap_or(&Value::Null)
}

/// camelCase / PascalCase 转 snake_case
///
/// `priceToEarning` -> `price_to_earning`，`industryID` -> `industry_id`
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let boundary = i > 0 && {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower)
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// JSON 值转浮点数：数字或可解析的字符串，NaN/无穷视为空
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// JSON 值转整数：整数、无小数部分的浮点数或可解析的字符串
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// 可选浮点数转 JSON 值，None/NaN 为 null
pub fn f64_to_value(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => "NaN".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(MAX_CELL_WIDTH - 3).collect();
        out.push_str("...");
        out
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (value_as_f64(a), value_as_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => value_to_string(a).cmp(&value_to_string(b)),
    }
}

fn infer_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let (mut int, mut float, mut text, mut boolean, mut other) = (false, false, false, false, false);

    for value in values {
        match value {
            Value::Null => {}
            Value::Bool(_) => boolean = true,
            Value::Number(n) if n.is_f64() => float = true,
            Value::Number(_) => int = true,
            Value::String(_) => text = true,
            _ => other = true,
        }
    }

    let kinds = [int || float, text, boolean, other]
        .iter()
        .filter(|k| **k)
        .count();

    match kinds {
        0 => ColumnType::Null,
        1 if float => ColumnType::Float,
        1 if int => ColumnType::Int,
        1 if text => ColumnType::Str,
        1 if boolean => ColumnType::Bool,
        _ => ColumnType::Mixed,
    }
}
