//! 错误类型
//! 表格解析、LLM 分类与进度存储各自的错误

use std::path::PathBuf;
use std::time::Duration;

/// 表格文件级错误，单行的脏数据不会产生错误
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("读取文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel 解析失败: {0}")]
    Excel(String),

    #[error("不支持的表格格式: {0}")]
    UnsupportedFormat(String),

    #[error("下载表格失败: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("下载表格失败 {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },
}

/// LLM 分类错误，作用范围是整个批次
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: set GROQ_API_KEY or pass --api-key")]
    MissingApiKey,
}

impl ClassificationError {
    /// 调用方是否值得重试，核心流程本身从不重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassificationError::RateLimited { .. } => true,
            ClassificationError::Api { status, .. } => *status >= 500,
            ClassificationError::Network(_) => true,
            ClassificationError::InvalidResponse(_)
            | ClassificationError::Json(_)
            | ClassificationError::MissingApiKey => false,
        }
    }
}

/// 进度存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("用户 {0} 没有生效中的学习计划")]
    NoActiveSchedule(String),

    #[error("题目不存在: day_index={day_index}, problem_index={problem_index}")]
    InvalidIndex {
        day_index: usize,
        problem_index: usize,
    },

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("日程序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("创建数据目录失败: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// 对应 NotFound 类错误，调用方不应重试
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NoActiveSchedule(_) | StoreError::InvalidIndex { .. }
        )
    }
}
