//! 共享数据模型
//! 题目、难度、学习日程以及分类统计

use serde::{Deserialize, Serialize};
use std::fmt;

/// 未能归类时使用的主题
pub const UNCATEGORIZED: &str = "Uncategorized";

/// 分类器判定为无效题目时使用的主题
pub const INVALID_TOPIC: &str = "Invalid";

/// 题目难度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// 严格匹配 `Easy` / `Medium` / `Hard`
    pub fn parse_exact(value: &str) -> Option<Self> {
        match value {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// 忽略大小写与首尾空白
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// 排期权重：Hard=4, Medium=2, Easy=1
    pub fn weight(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 外部输入中的难度可能是任意字符串，非法值一律视为 Medium
fn deserialize_difficulty<'de, D>(deserializer: D) -> Result<Difficulty, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(Difficulty::parse_exact)
        .unwrap_or_default())
}

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default, deserialize_with = "deserialize_difficulty")]
    pub difficulty: Difficulty,
    /// 逗号分隔的来源表名
    #[serde(default)]
    pub source: String,
}

fn default_topic() -> String {
    UNCATEGORIZED.to_string()
}

impl Problem {
    pub fn new(name: impl Into<String>, topic: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            link: String::new(),
            topic: topic.into(),
            difficulty,
            source: String::new(),
        }
    }
}

/// 日程中的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledProblem {
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default, deserialize_with = "deserialize_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<&Problem> for ScheduledProblem {
    fn from(problem: &Problem) -> Self {
        Self {
            name: problem.name.clone(),
            link: problem.link.clone(),
            topic: problem.topic.clone(),
            difficulty: problem.difficulty,
            source: problem.source.clone(),
            completed: false,
        }
    }
}

/// 学习日程中的一天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub day: u32,
    pub topic: String,
    pub problems: Vec<ScheduledProblem>,
}

/// 单个主题的难度分布
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: String,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl TopicSummary {
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}
