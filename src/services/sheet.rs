//! 题单表格读取
//! 支持本地 CSV/TSV 与 Excel 文件，以及公开的 Google Sheets 链接

use calamine::{open_workbook_auto, DataType, Reader};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::SheetError;
use crate::services::extractor::Cell;

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// 一张表格：来源名 + 原始行
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub label: String,
    pub rows: Vec<Vec<Cell>>,
    /// 无法解析而被跳过的行数
    pub malformed_rows: usize,
}

impl Sheet {
    pub fn new(label: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            label: label.into(),
            rows,
            malformed_rows: 0,
        }
    }
}

/// 去掉目录与 `.csv` / `.xlsx` / `.xls` 扩展名
pub fn clean_source_label(filename: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"(?i)\.(csv|xlsx|xls)$").expect("static regex"));

    let base = Path::new(filename.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    pattern.replace(base, "").trim().to_string()
}

/// Google Sheets 分享链接转为 CSV 导出链接，其余链接原样返回
pub fn google_sheet_export_url(url: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("static regex"));

    if !url.contains("docs.google.com/spreadsheets") {
        return url.to_string();
    }
    match pattern.captures(url).and_then(|caps| caps.get(1)) {
        Some(id) => format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
            id.as_str()
        ),
        None => url.to_string(),
    }
}

/// 读取本地表格文件，Excel 只读第一个工作表
pub fn read_sheet_file(path: &Path) -> Result<Sheet, SheetError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    let label = clean_source_label(&path.to_string_lossy());

    if EXCEL_EXTENSIONS.contains(&extension.as_str()) {
        return read_excel(path, label);
    }

    let delimiter = match extension.as_str() {
        "csv" | "" => b',',
        "tsv" | "txt" => b'\t',
        other => return Err(SheetError::UnsupportedFormat(other.to_string())),
    };

    let file = std::fs::File::open(path).map_err(|source| SheetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_delimited(file, delimiter, label)
}

/// 下载公开表格（CSV 导出）并解析
pub async fn fetch_sheet(
    client: &reqwest::Client,
    url: &str,
    label: &str,
) -> Result<Sheet, SheetError> {
    let export_url = google_sheet_export_url(url);
    let response = client.get(&export_url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SheetError::FetchStatus {
            url: export_url,
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    parse_delimited(bytes.as_ref(), b',', clean_source_label(label))
}

/// 无表头、允许行长度不一致；坏行计数后跳过
pub fn parse_delimited<R: std::io::Read>(
    reader: R,
    delimiter: u8,
    label: String,
) -> Result<Sheet, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut sheet = Sheet::new(label, Vec::new());
    for record in reader.records() {
        match record {
            Ok(record) => sheet.rows.push(
                record
                    .iter()
                    .map(|value| Cell::Text(value.to_string()))
                    .collect(),
            ),
            Err(err) if err.is_io_error() => return Err(SheetError::Csv(err)),
            Err(_) => sheet.malformed_rows += 1,
        }
    }

    Ok(sheet)
}

fn read_excel(path: &Path, label: String) -> Result<Sheet, SheetError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|err| SheetError::Excel(err.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetError::Excel("工作簿中没有工作表".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| SheetError::Excel(format!("无法读取工作表 '{}'", sheet_name)))?
        .map_err(|err| SheetError::Excel(err.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_excel).collect())
        .collect();

    Ok(Sheet::new(label, rows))
}

fn cell_from_excel(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::String(text) => Cell::Text(text.clone()),
        DataType::Float(n) => Cell::Number(*n),
        DataType::Int(n) => Cell::Number(*n as f64),
        DataType::Bool(b) => Cell::Bool(*b),
        other => Cell::Text(other.to_string()),
    }
}
