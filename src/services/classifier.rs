//! LLM 分类客户端
//! 调用 OpenAI 兼容的 chat completions 接口，对一批题目返回主题、难度与链接

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::PlannerConfig;
use crate::error::ClassificationError;
use crate::services::topics::TopicTable;

/// 批内序号，分类器按它回填结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchIndex(pub usize);

impl fmt::Display for BatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BatchIndex {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BatchIndex)
    }
}

/// 发送给分类器的单个题目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationItem {
    pub id: BatchIndex,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// 分类器对单个题目的判断，字段都可能缺失
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// 一批的分类结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResponse {
    pub classifications: HashMap<BatchIndex, Classification>,
}

impl ClassificationResponse {
    pub fn get(&self, index: BatchIndex) -> Option<&Classification> {
        self.classifications.get(&index)
    }
}

/// 外部分类调用
#[async_trait]
pub trait Classifier: Send + Sync {
    /// `api_key` 为用户自带密钥，仅对本次调用生效
    async fn classify(
        &self,
        items: &[ClassificationItem],
        api_key: Option<&str>,
    ) -> Result<ClassificationResponse, ClassificationError>;
}

/// 解析模型输出
///
/// 顶层必须有 `classifications` 对象；无法解析为非负整数的键和
/// 格式不对的条目被忽略，对应题目按未分类处理。
pub fn parse_classifications(content: &str) -> Result<ClassificationResponse, ClassificationError> {
    let json = strip_code_fence(content);
    let value: serde_json::Value = serde_json::from_str(json)?;

    let raw = value
        .get("classifications")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            ClassificationError::InvalidResponse("missing \"classifications\" object".to_string())
        })?;

    let mut classifications = HashMap::with_capacity(raw.len());
    for (key, entry) in raw {
        let Ok(index) = key.parse::<BatchIndex>() else {
            continue;
        };
        if let Ok(classification) = serde_json::from_value::<Classification>(entry.clone()) {
            classifications.insert(index, classification);
        }
    }

    Ok(ClassificationResponse { classifications })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// 分类提示词
pub struct ClassificationPrompt;

impl ClassificationPrompt {
    pub fn system(topics: &[String]) -> String {
        let topic_list = serde_json::to_string(topics).unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"You are an expert DSA Study Planner.
I will provide a list of coding problems, each with a numeric ID.
For EACH problem, you MUST:
1. Identify the Topic from this exact list: {}
2. Find or generate the canonical LeetCode (or original judge) URL.
3. Identify the Difficulty (Easy, Medium, Hard).
4. If the name is garbled, give the recognizable problem title as "name".

Rules:
- Return a JSON object with a "classifications" key.
- The keys inside "classifications" MUST be the IDs provided (0, 1, 2...).
- Do NOT skip any problems.
- Do NOT use "Uncategorized". Pick the closest topic from the list.
- Use "Invalid" as the topic only if the entry is not a coding problem at all.
- Do NOT return "Unknown" for difficulty. Guess based on the problem name if needed.

Output JSON format:
{{
  "classifications": {{
    "0": {{ "name": "Two Sum", "topic": "Arrays", "difficulty": "Easy", "link": "https://leetcode.com/problems/two-sum/" }}
  }}
}}

Output only the JSON, no other text."#,
            topic_list
        )
    }

    pub fn user(items: &[ClassificationItem]) -> Result<String, ClassificationError> {
        Ok(format!(
            "Classify these problems:\n{}",
            serde_json::to_string(items)?
        ))
    }
}

/// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completion 请求
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

/// Chat completion 响应
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Groq（OpenAI 兼容接口）分类客户端
#[derive(Clone)]
pub struct GroqClient {
    http_client: reqwest::Client,
    api_base: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    topics: Vec<String>,
}

impl GroqClient {
    pub fn new(config: &PlannerConfig, topics: &TopicTable) -> Result<Self, ClassificationError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
            topics: topics.topics().into_iter().map(str::to_string).collect(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl Classifier for GroqClient {
    async fn classify(
        &self,
        items: &[ClassificationItem],
        api_key: Option<&str>,
    ) -> Result<ClassificationResponse, ClassificationError> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .or(self.api_key.as_deref())
            .ok_or(ClassificationError::MissingApiKey)?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: ClassificationPrompt::system(&self.topics),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: ClassificationPrompt::user(items)?,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ClassificationError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClassificationError::InvalidResponse("empty completion".to_string()))?;

        parse_classifications(&content)
    }
}
