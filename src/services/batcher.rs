//! 分批分类
//! 把题目切成固定大小的批次交给分类器，按批内序号合并结果并应用回退规则

use futures::stream::{self, StreamExt};
use std::ops::Range;

use crate::config::{PlannerConfig, ValidityPolicy};
use crate::error::ClassificationError;
use crate::models::{Difficulty, Problem, INVALID_TOPIC, UNCATEGORIZED};
use crate::services::classifier::{BatchIndex, Classification, ClassificationItem, Classifier};
use crate::services::observer::PipelineObserver;
use crate::services::topics::TopicTable;

/// 分类器返回这些主题时视为没有给出主题
const PLACEHOLDER_TOPICS: &[&str] = &["None", "Unknown", "Invalid"];

/// 原链接短于该长度时认为不可信，改用分类器给出的链接
const MIN_LINK_LEN: usize = 6;

/// 分批参数
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub validity_policy: ValidityPolicy,
    pub allowed_link_domains: Vec<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&PlannerConfig::default())
    }
}

impl From<&PlannerConfig> for BatchOptions {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_concurrent: config.max_concurrent_batches,
            validity_policy: config.validity_policy,
            allowed_link_domains: config.allowed_link_domains.clone(),
        }
    }
}

/// 失败的批次
#[derive(Debug)]
pub struct BatchFailure {
    pub batch: usize,
    /// 该批在输入中的位置
    pub range: Range<usize>,
    pub error: ClassificationError,
}

/// 分类结果；`failures` 非空时结果是部分分类的
#[derive(Debug)]
pub struct ClassificationReport {
    pub problems: Vec<Problem>,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
}

impl ClassificationReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// 合并单个题目的分类结果
pub fn merge_classification(
    problem: &Problem,
    classification: Option<&Classification>,
    topics: &TopicTable,
    policy: ValidityPolicy,
) -> Problem {
    let empty = Classification::default();
    let classification = classification.unwrap_or(&empty);

    let raw_topic = classification
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let topic = match raw_topic {
        Some(INVALID_TOPIC) if policy == ValidityPolicy::DropInvalid => INVALID_TOPIC.to_string(),
        Some(t) if !PLACEHOLDER_TOPICS.contains(&t) => topics.normalize(t),
        _ if problem.topic.trim().is_empty() => UNCATEGORIZED.to_string(),
        _ => topics.normalize(&problem.topic),
    };

    let difficulty = classification
        .difficulty
        .as_deref()
        .and_then(Difficulty::parse_exact)
        .unwrap_or(problem.difficulty);

    let link = if problem.link.trim().chars().count() >= MIN_LINK_LEN {
        problem.link.clone()
    } else {
        classification
            .link
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    };

    let name = classification
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(problem.name.as_str())
        .to_string();

    Problem {
        name,
        link,
        topic,
        difficulty,
        source: problem.source.clone(),
    }
}

/// 链接主机名是否属于白名单域名（含子域名）
pub fn link_in_allowlist(link: &str, domains: &[String]) -> bool {
    let Some((_, rest)) = link.trim().split_once("://") else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_lowercase();
    if host.is_empty() {
        return false;
    }

    domains.iter().any(|domain| {
        let domain = domain.trim().to_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    })
}

fn passes_policy(problem: &Problem, options: &BatchOptions) -> bool {
    match options.validity_policy {
        ValidityPolicy::KeepAll => true,
        ValidityPolicy::DropInvalid => {
            problem.topic != INVALID_TOPIC
                && link_in_allowlist(&problem.link, &options.allowed_link_domains)
        }
    }
}

/// 分类一个批次；分类器出错时整批失败，不做部分恢复
pub async fn classify_batch(
    problems: &[Problem],
    classifier: &dyn Classifier,
    topics: &TopicTable,
    options: &BatchOptions,
    api_key: Option<&str>,
) -> Result<Vec<Problem>, ClassificationError> {
    let items: Vec<ClassificationItem> = problems
        .iter()
        .enumerate()
        .map(|(i, p)| ClassificationItem {
            id: BatchIndex(i),
            name: p.name.clone(),
            link: Some(p.link.clone()).filter(|l| !l.is_empty()),
        })
        .collect();

    let response = classifier.classify(&items, api_key).await?;

    Ok(problems
        .iter()
        .enumerate()
        .map(|(i, p)| {
            merge_classification(p, response.get(BatchIndex(i)), topics, options.validity_policy)
        })
        .filter(|p| passes_policy(p, options))
        .collect())
}

/// 失败批次使用分类前的数据，仍经过主题归一化
fn fallback_batch(problems: &[Problem], topics: &TopicTable, options: &BatchOptions) -> Vec<Problem> {
    problems
        .iter()
        .map(|p| merge_classification(p, None, topics, options.validity_policy))
        .filter(|p| passes_policy(p, options))
        .collect()
}

/// 分类全部题目
///
/// 最多 `max_concurrent` 个批次同时进行，结果按批次顺序拼回。
/// 某批失败不影响其他批次，失败批次记录在报告中。
pub async fn classify_all(
    problems: &[Problem],
    classifier: &dyn Classifier,
    topics: &TopicTable,
    options: &BatchOptions,
    api_key: Option<&str>,
    observer: &dyn PipelineObserver,
) -> ClassificationReport {
    let batch_size = options.batch_size.max(1);
    let max_concurrent = options.max_concurrent.max(1);

    let mut results: Vec<(usize, Range<usize>, Result<Vec<Problem>, ClassificationError>)> =
        stream::iter(problems.chunks(batch_size).enumerate())
            .map(|(batch, chunk)| async move {
                let start = batch * batch_size;
                observer.on_batch_started(batch, chunk.len());
                let result = classify_batch(chunk, classifier, topics, options, api_key).await;
                (batch, start..start + chunk.len(), result)
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

    results.sort_by_key(|(batch, _, _)| *batch);

    let batches = results.len();
    let mut merged = Vec::with_capacity(problems.len());
    let mut failures = Vec::new();

    for (batch, range, result) in results {
        match result {
            Ok(classified) => {
                observer.on_batch_finished(batch, classified.len());
                merged.extend(classified);
            }
            Err(error) => {
                observer.on_batch_failed(batch, &error);
                merged.extend(fallback_batch(&problems[range.clone()], topics, options));
                failures.push(BatchFailure {
                    batch,
                    range,
                    error,
                });
            }
        }
    }

    ClassificationReport {
        problems: merged,
        batches,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::ClassificationResponse;
    use crate::services::observer::testing::RecordingObserver;
    use crate::services::observer::NoopObserver;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Responder =
        dyn Fn(&[ClassificationItem]) -> Result<ClassificationResponse, ClassificationError>
            + Send
            + Sync;

    struct MockClassifier {
        responder: Box<Responder>,
        calls: AtomicUsize,
    }

    impl MockClassifier {
        fn new(
            responder: impl Fn(&[ClassificationItem]) -> Result<ClassificationResponse, ClassificationError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Classifier for MockClassifier {
        async fn classify(
            &self,
            items: &[ClassificationItem],
            _api_key: Option<&str>,
        ) -> Result<ClassificationResponse, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.responder)(items)
        }
    }

    fn classification(topic: &str, difficulty: &str) -> Classification {
        Classification {
            topic: Some(topic.to_string()),
            difficulty: Some(difficulty.to_string()),
            ..Classification::default()
        }
    }

    fn response(entries: Vec<(usize, Classification)>) -> ClassificationResponse {
        ClassificationResponse {
            classifications: entries
                .into_iter()
                .map(|(i, c)| (BatchIndex(i), c))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn problems(n: usize) -> Vec<Problem> {
        (0..n)
            .map(|i| Problem::new(format!("Problem {}", i), UNCATEGORIZED, Difficulty::Medium))
            .collect()
    }

    #[test]
    fn test_merge_topic_fallbacks() {
        let table = TopicTable::standard();
        let mut problem = Problem::new("Two Sum", "array", Difficulty::Easy);

        let merged = merge_classification(
            &problem,
            Some(&classification("Unknown", "Medium")),
            &table,
            ValidityPolicy::KeepAll,
        );
        assert_eq!(merged.topic, "Arrays");
        assert_eq!(merged.difficulty, Difficulty::Medium);

        let merged = merge_classification(&problem, None, &table, ValidityPolicy::KeepAll);
        assert_eq!(merged.topic, "Arrays");
        assert_eq!(merged.difficulty, Difficulty::Easy);

        problem.topic = String::new();
        let merged = merge_classification(
            &problem,
            Some(&classification("None", "medium")),
            &table,
            ValidityPolicy::KeepAll,
        );
        assert_eq!(merged.topic, UNCATEGORIZED);
        assert_eq!(merged.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_merge_normalizes_classifier_topic() {
        let table = TopicTable::standard();
        let problem = Problem::new("Top K Frequent", UNCATEGORIZED, Difficulty::Medium);
        let merged = merge_classification(
            &problem,
            Some(&classification("Heap", "Hard")),
            &table,
            ValidityPolicy::KeepAll,
        );
        assert_eq!(merged.topic, "Heaps / Priority Queues");
        assert_eq!(merged.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_merge_link_and_name() {
        let table = TopicTable::standard();
        let mut problem = Problem::new("2sum lc", UNCATEGORIZED, Difficulty::Medium);
        problem.link = "n/a".to_string();
        let c = Classification {
            name: Some("Two Sum".to_string()),
            link: Some("https://leetcode.com/problems/two-sum/".to_string()),
            ..Classification::default()
        };

        let merged = merge_classification(&problem, Some(&c), &table, ValidityPolicy::KeepAll);
        assert_eq!(merged.name, "Two Sum");
        assert_eq!(merged.link, "https://leetcode.com/problems/two-sum/");

        problem.link = "https://www.geeksforgeeks.org/two-sum/".to_string();
        let merged = merge_classification(&problem, Some(&c), &table, ValidityPolicy::KeepAll);
        assert_eq!(merged.link, "https://www.geeksforgeeks.org/two-sum/");
    }

    #[test]
    fn test_invalid_topic_depends_on_policy() {
        let table = TopicTable::standard();
        let problem = Problem::new("Notes", "Trees", Difficulty::Medium);
        let c = classification("Invalid", "Easy");

        let kept = merge_classification(&problem, Some(&c), &table, ValidityPolicy::KeepAll);
        assert_eq!(kept.topic, "Trees");

        let dropped = merge_classification(&problem, Some(&c), &table, ValidityPolicy::DropInvalid);
        assert_eq!(dropped.topic, INVALID_TOPIC);
    }

    #[test]
    fn test_link_in_allowlist() {
        let domains = vec!["leetcode.com".to_string(), "geeksforgeeks.org".to_string()];
        assert!(link_in_allowlist("https://leetcode.com/problems/two-sum/", &domains));
        assert!(link_in_allowlist("https://www.geeksforgeeks.org/x", &domains));
        assert!(link_in_allowlist("https://LeetCode.com:443", &domains));
        assert!(!link_in_allowlist("https://notleetcode.com/problems", &domains));
        assert!(!link_in_allowlist("leetcode.com/problems", &domains));
        assert!(!link_in_allowlist("", &domains));
    }

    #[tokio::test]
    async fn test_classify_all_merges_by_batch_index() {
        let table = TopicTable::standard();
        let classifier = MockClassifier::new(|items| {
            Ok(response(
                items
                    .iter()
                    .map(|item| (item.id.0, classification("graph", "Hard")))
                    .collect(),
            ))
        });
        let options = BatchOptions {
            batch_size: 2,
            ..BatchOptions::default()
        };
        let input = problems(5);

        let report = classify_all(&input, &classifier, &table, &options, None, &NoopObserver).await;

        assert_eq!(report.batches, 3);
        assert!(!report.is_partial());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);
        let names: Vec<&str> = report.problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Problem 0", "Problem 1", "Problem 2", "Problem 3", "Problem 4"]
        );
        assert!(report
            .problems
            .iter()
            .all(|p| p.topic == "Graphs" && p.difficulty == Difficulty::Hard));
    }

    #[tokio::test]
    async fn test_batch_ids_are_local() {
        let table = TopicTable::standard();
        let classifier = MockClassifier::new(|items| {
            let ids: Vec<usize> = items.iter().map(|i| i.id.0).collect();
            assert_eq!(ids, (0..items.len()).collect::<Vec<_>>());
            Ok(ClassificationResponse::default())
        });
        let options = BatchOptions {
            batch_size: 3,
            ..BatchOptions::default()
        };

        let report =
            classify_all(&problems(7), &classifier, &table, &options, None, &NoopObserver).await;
        assert_eq!(report.problems.len(), 7);
    }

    #[tokio::test]
    async fn test_failed_batch_falls_back_and_is_reported() {
        let table = TopicTable::standard();
        let classifier = MockClassifier::new(|items| {
            if items[0].name == "Problem 2" {
                Err(ClassificationError::InvalidResponse("garbage".to_string()))
            } else {
                Ok(response(vec![(0, classification("Trie", "Easy"))]))
            }
        });
        let options = BatchOptions {
            batch_size: 2,
            max_concurrent: 2,
            ..BatchOptions::default()
        };
        let observer = RecordingObserver::default();

        let report = classify_all(&problems(4), &classifier, &table, &options, None, &observer).await;

        assert!(report.is_partial());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].batch, 1);
        assert_eq!(report.failures[0].range, 2..4);
        assert_eq!(report.problems.len(), 4);
        assert_eq!(report.problems[0].topic, "Trie");
        assert_eq!(report.problems[1].topic, UNCATEGORIZED);
        assert_eq!(report.problems[2].topic, UNCATEGORIZED);
        assert_eq!(report.problems[2].difficulty, Difficulty::Medium);
        assert!(observer.events().contains(&"batch_failed:1".to_string()));
    }

    #[tokio::test]
    async fn test_drop_invalid_policy_filters() {
        let table = TopicTable::standard();
        let classifier = MockClassifier::new(|_| {
            let mut ok = classification("Arrays", "Easy");
            ok.link = Some("https://leetcode.com/problems/two-sum/".to_string());
            let mut bad_link = classification("Arrays", "Easy");
            bad_link.link = Some("https://example.com/two-sum".to_string());
            Ok(response(vec![
                (0, ok),
                (1, classification("Invalid", "Easy")),
                (2, bad_link),
            ]))
        });
        let options = BatchOptions {
            validity_policy: ValidityPolicy::DropInvalid,
            ..BatchOptions::default()
        };

        let report =
            classify_all(&problems(3), &classifier, &table, &options, None, &NoopObserver).await;
        assert_eq!(report.problems.len(), 1);
        assert_eq!(report.problems[0].name, "Problem 0");
    }
}
