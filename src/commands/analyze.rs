// 题单分析命令
// 读取表格、去重合并、调用分类器，输出题目列表与主题统计

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::PlannerState;
use crate::models::{Problem, TopicSummary};
use crate::services::aggregator::Aggregator;
use crate::services::batcher::{classify_all, BatchOptions};
use crate::services::classifier::Classifier;
use crate::services::extractor::ExtractorConfig;
use crate::services::sheet::{fetch_sheet, read_sheet_file, Sheet};
use crate::services::summary::summarize;

/// 一个表格来源
#[derive(Debug, Clone, PartialEq)]
pub enum SheetInput {
    File(PathBuf),
    Url { label: String, url: String },
}

impl SheetInput {
    /// 解析 `URL` 或 `名称=URL`，未命名时使用 `Sheet`
    pub fn parse_url(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((label, url)) if !label.contains("://") && url.contains("://") => {
                SheetInput::Url {
                    label: label.trim().to_string(),
                    url: url.trim().to_string(),
                }
            }
            _ => SheetInput::Url {
                label: "Sheet".to_string(),
                url: arg.trim().to_string(),
            },
        }
    }

    fn display_name(&self) -> String {
        match self {
            SheetInput::File(path) => path.display().to_string(),
            SheetInput::Url { url, .. } => url.clone(),
        }
    }
}

/// 分析参数
#[derive(Debug, Clone, Default)]
pub struct AnalyzeInput {
    pub sheets: Vec<SheetInput>,
    /// 用户自带的分类密钥
    pub api_key: Option<String>,
}

/// 读取失败的表格
#[derive(Debug, Clone, Serialize)]
pub struct SheetFailureDto {
    pub source: String,
    pub error: String,
}

/// 分类失败的批次
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailureDto {
    pub batch: usize,
    pub first_problem: usize,
    pub problem_count: usize,
    pub error: String,
    pub retryable: bool,
}

/// 分析结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDto {
    pub problems: Vec<Problem>,
    pub summary: Vec<TopicSummary>,
    pub failed_sheets: Vec<SheetFailureDto>,
    pub failed_batches: Vec<BatchFailureDto>,
    /// 有批次分类失败，部分题目保留了原始数据
    pub partial: bool,
}

/// 逐个读取表格，单个表格失败不影响其余表格
async fn load_sheets(
    state: &PlannerState,
    inputs: &[SheetInput],
) -> Result<(Vec<Sheet>, Vec<SheetFailureDto>)> {
    let needs_http = inputs.iter().any(|i| matches!(i, SheetInput::Url { .. }));
    let client = if needs_http {
        Some(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(state.config.request_timeout_secs))
                .build()?,
        )
    } else {
        None
    };

    let mut sheets = Vec::new();
    let mut failures = Vec::new();

    for input in inputs {
        let result = match (input, &client) {
            (SheetInput::File(path), _) => read_sheet_file(path),
            (SheetInput::Url { label, url }, Some(client)) => fetch_sheet(client, url, label).await,
            (SheetInput::Url { .. }, None) => continue,
        };

        match result {
            Ok(sheet) => {
                state.observer.on_sheet_loaded(&sheet.label, sheet.rows.len());
                sheets.push(sheet);
            }
            Err(err) => {
                let source = input.display_name();
                state.observer.on_sheet_failed(&source, &err);
                failures.push(SheetFailureDto {
                    source,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok((sheets, failures))
}

/// 分析题单
///
/// `classifier` 为 `None` 时跳过分类，只做提取和去重。
pub async fn analyze(
    state: &PlannerState,
    input: &AnalyzeInput,
    classifier: Option<&dyn Classifier>,
) -> Result<AnalysisDto> {
    if input.sheets.is_empty() {
        bail!("没有提供任何表格");
    }

    let (sheets, failed_sheets) = load_sheets(state, &input.sheets).await?;
    if sheets.is_empty() {
        bail!("所有表格都读取失败");
    }

    let aggregator = Aggregator::new(
        &state.topics,
        ExtractorConfig {
            min_name_len: state.config.min_name_len,
        },
        state.config.max_problems,
    );
    let problems = aggregator.aggregate(&sheets, state.observer.as_ref());

    let (problems, failed_batches) = match classifier {
        Some(classifier) => {
            let report = classify_all(
                &problems,
                classifier,
                &state.topics,
                &BatchOptions::from(&state.config),
                input.api_key.as_deref(),
                state.observer.as_ref(),
            )
            .await;

            let failures = report
                .failures
                .iter()
                .map(|f| BatchFailureDto {
                    batch: f.batch,
                    first_problem: f.range.start,
                    problem_count: f.range.len(),
                    error: f.error.to_string(),
                    retryable: f.error.is_retryable(),
                })
                .collect();
            (report.problems, failures)
        }
        None => (problems, Vec::new()),
    };

    Ok(AnalysisDto {
        summary: summarize(&problems),
        partial: !failed_batches.is_empty(),
        problems,
        failed_sheets,
        failed_batches,
    })
}
