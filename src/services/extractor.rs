//! 表格行启发式提取
//! 把任意一行单元格转换为候选题目：链接、题名、主题猜测、难度猜测

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::models::{Difficulty, Problem, UNCATEGORIZED};
use crate::services::topics::TopicTable;

/// 低信息量的单元格内容，不能作为题名
const STOP_WORDS: &[&str] = &["easy", "medium", "hard", "done", "pending", "yes", "no"];

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("static regex"))
}

fn difficulty_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^(easy|medium|hard)$").expect("static regex"))
}

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// 仅字符串单元格可以成为题名或主题
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

/// 提取器配置
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// 题名候选的最小字符数（trim 后）
    pub min_name_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { min_name_len: 2 }
    }
}

/// 行提取器
///
/// 题名回退规则固定为：
/// 1. 没有合格的题名候选时，取链接路径最后一段，连字符换成空格；
/// 2. 有链接但路径为空时，生成 `Problem Row {n}`；
/// 3. 既没有题名候选也没有链接的行直接丢弃。
#[derive(Debug, Clone)]
pub struct RowExtractor<'a> {
    config: ExtractorConfig,
    topics: &'a TopicTable,
}

impl<'a> RowExtractor<'a> {
    pub fn new(config: ExtractorConfig, topics: &'a TopicTable) -> Self {
        Self { config, topics }
    }

    /// 提取一行；`row_index` 从 0 开始
    pub fn extract(&self, row: &[Cell], row_index: usize, source: &str) -> Option<Problem> {
        if row.iter().all(Cell::is_blank) {
            return None;
        }

        let link = find_link(row);
        let candidates = self.name_candidates(row);

        let name = match longest(&candidates) {
            Some(name) => name.to_string(),
            None => fallback_name(&link, row_index)?,
        };

        let topic = candidates
            .iter()
            .filter(|c| **c != name)
            .find_map(|c| self.topics.lookup(c))
            .unwrap_or(UNCATEGORIZED)
            .to_string();

        Some(Problem {
            name,
            link,
            topic,
            difficulty: find_difficulty(row),
            source: source.to_string(),
        })
    }

    /// 合格的题名候选（trim 后），保持原始列顺序
    fn name_candidates<'r>(&self, row: &'r [Cell]) -> Vec<&'r str> {
        row.iter()
            .filter_map(Cell::as_text)
            .map(str::trim)
            .filter(|text| {
                !text.contains("http")
                    && !numeric_pattern().is_match(text)
                    && text.chars().count() >= self.config.min_name_len
                    && !STOP_WORDS.contains(&text.to_lowercase().as_str())
            })
            .collect()
    }
}

/// 最长的候选，等长时取靠前的
fn longest<'r>(candidates: &[&'r str]) -> Option<&'r str> {
    let mut best: Option<&str> = None;
    for &candidate in candidates {
        match best {
            Some(current) if current.chars().count() >= candidate.chars().count() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

fn find_link(row: &[Cell]) -> String {
    row.iter()
        .map(|cell| cell.to_string())
        .find(|text| text.contains("http"))
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn find_difficulty(row: &[Cell]) -> Difficulty {
    row.iter()
        .map(|cell| cell.to_string())
        .find(|text| difficulty_pattern().is_match(text.trim()))
        .and_then(|text| Difficulty::parse_loose(&text))
        .unwrap_or_default()
}

fn fallback_name(link: &str, row_index: usize) -> Option<String> {
    if link.is_empty() {
        return None;
    }
    let name = link_slug(link)
        .map(|slug| slug.replace('-', " ").trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Problem Row {}", row_index + 1));
    Some(name)
}

/// 链接路径中最后一个非空片段，不含 query 与 fragment
pub fn link_slug(link: &str) -> Option<&str> {
    let without_scheme = match link.find("://") {
        Some(pos) => &link[pos + 3..],
        None => link,
    };
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let (_, path) = path.split_once('/')?;
    path.split('/')
        .filter(|segment| !segment.trim().is_empty())
        .last()
}
