//! 运行配置
//! 原先散落在代码里的常量和密钥统一收进 `PlannerConfig`，构造流水线时传入

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::utils;

/// 分类结果的过滤策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityPolicy {
    /// 保留所有题目
    #[default]
    KeepAll,
    /// 丢弃主题为 `Invalid` 或链接不在白名单域名内的题目
    DropInvalid,
}

/// 规划器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// OpenAI 兼容的 chat completions 接口地址
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    /// 服务端默认密钥，单次调用可用用户密钥覆盖
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// 每批题目数量，受外部限流约束
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    /// 去重后保留的最大题目数
    pub max_problems: usize,
    pub default_days: u32,
    /// 题名候选的最小长度（trim 后）
    pub min_name_len: usize,
    pub validity_policy: ValidityPolicy,
    pub allowed_link_domains: Vec<String>,
    pub db_path: PathBuf,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            api_key: None,
            request_timeout_secs: 60,
            batch_size: 20,
            max_concurrent_batches: 4,
            max_problems: 5000,
            default_days: 3,
            min_name_len: 2,
            validity_policy: ValidityPolicy::KeepAll,
            allowed_link_domains: vec![
                "leetcode.com".to_string(),
                "geeksforgeeks.org".to_string(),
                "takeuforward.org".to_string(),
                "codingninjas.com".to_string(),
                "naukri.com".to_string(),
                "interviewbit.com".to_string(),
                "hackerrank.com".to_string(),
                "codechef.com".to_string(),
                "codeforces.com".to_string(),
            ],
            db_path: utils::get_database_path(),
        }
    }
}

impl PlannerConfig {
    /// 默认值 + `.env` + 环境变量
    ///
    /// | 环境变量                  | 字段                     |
    /// |---------------------------|--------------------------|
    /// | `GROQ_API_KEY`            | `api_key`                |
    /// | `PLANNER_API_BASE`        | `api_base`               |
    /// | `PLANNER_MODEL`           | `model`                  |
    /// | `PLANNER_TIMEOUT_SECS`    | `request_timeout_secs`   |
    /// | `PLANNER_BATCH_SIZE`      | `batch_size`             |
    /// | `PLANNER_MAX_CONCURRENT`  | `max_concurrent_batches` |
    /// | `PLANNER_MAX_PROBLEMS`    | `max_problems`           |
    /// | `PLANNER_DEFAULT_DAYS`    | `default_days`           |
    /// | `PLANNER_DB_PATH`         | `db_path`                |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// 从 JSON 文件加载，随后叠加环境变量
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式错误: {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(key) = env_string("GROQ_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(base) = env_string("PLANNER_API_BASE") {
            self.api_base = base;
        }
        if let Some(model) = env_string("PLANNER_MODEL") {
            self.model = model;
        }
        if let Some(path) = env_string("PLANNER_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        env_parse("PLANNER_TIMEOUT_SECS", &mut self.request_timeout_secs);
        env_parse("PLANNER_BATCH_SIZE", &mut self.batch_size);
        env_parse("PLANNER_MAX_CONCURRENT", &mut self.max_concurrent_batches);
        env_parse("PLANNER_MAX_PROBLEMS", &mut self.max_problems);
        env_parse("PLANNER_DEFAULT_DAYS", &mut self.default_days);
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str, target: &mut T) {
    if let Some(raw) = env_string(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("忽略无法解析的环境变量 {}={}", name, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.default_days, 3);
        assert_eq!(config.max_problems, 5000);
        assert_eq!(config.validity_policy, ValidityPolicy::KeepAll);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.json");
        std::fs::write(
            &path,
            r#"{ "batch_size": 25, "validity_policy": "drop_invalid" }"#,
        )
        .unwrap();

        let config = PlannerConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.validity_policy, ValidityPolicy::DropInvalid);
        assert_eq!(config.default_days, 3);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = PlannerConfig {
            api_key: Some("secret".to_string()),
            ..PlannerConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
