// 学习计划命令

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::PlannerState;
use crate::error::StoreError;
use crate::models::{Problem, ScheduleDay};
use crate::services::scheduler::{build_schedule, ScheduleRequest};

/// 生成计划的输入
///
/// `problems` 中为 null、缺少题名或格式错误的条目会被丢弃，
/// 其下标记录在 `rejected_problems` 中，不影响其余题目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawScheduleRequest")]
pub struct ScheduleRequestDto {
    pub topic_days: HashMap<String, i64>,
    pub topic_order: HashMap<String, i64>,
    pub problems: Vec<Problem>,
    pub user_id: Option<String>,
    #[serde(skip)]
    pub rejected_problems: Vec<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleRequest {
    #[serde(default)]
    topic_days: HashMap<String, i64>,
    #[serde(default)]
    topic_order: HashMap<String, i64>,
    #[serde(default)]
    problems: Vec<serde_json::Value>,
    #[serde(default)]
    user_id: Option<String>,
}

impl From<RawScheduleRequest> for ScheduleRequestDto {
    fn from(raw: RawScheduleRequest) -> Self {
        let mut problems = Vec::with_capacity(raw.problems.len());
        let mut rejected_problems = Vec::new();

        for (index, value) in raw.problems.into_iter().enumerate() {
            match serde_json::from_value::<Problem>(value) {
                Ok(problem) if !problem.name.trim().is_empty() => problems.push(problem),
                _ => rejected_problems.push(index),
            }
        }

        Self {
            topic_days: raw.topic_days,
            topic_order: raw.topic_order,
            problems,
            user_id: raw.user_id,
            rejected_problems,
        }
    }
}

/// 生成结果；保存失败不影响返回计划
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponseDto {
    pub schedule: Vec<ScheduleDay>,
    pub record_id: Option<String>,
    pub saved: bool,
}

/// 生成学习计划，有用户 ID 时尽力保存
pub fn generate_schedule(state: &PlannerState, request: ScheduleRequestDto) -> ScheduleResponseDto {
    let ScheduleRequestDto {
        topic_days,
        topic_order,
        problems,
        user_id,
        rejected_problems,
    } = request;

    for index in rejected_problems {
        state.observer.on_problem_rejected(index);
    }

    let schedule = build_schedule(
        &problems,
        &ScheduleRequest {
            topic_days,
            topic_order,
            default_days: state.config.default_days,
        },
    );
    let scheduled: usize = schedule.iter().map(|day| day.problems.len()).sum();
    state.observer.on_schedule_built(schedule.len(), scheduled);

    let user_id = user_id.filter(|id| !id.trim().is_empty());
    let record_id = user_id.and_then(|user_id| {
        match state.store.save_schedule(&user_id, &schedule) {
            Ok(record_id) => {
                state.observer.on_schedule_saved(&user_id, &record_id);
                Some(record_id)
            }
            Err(err) => {
                state.observer.on_save_failed(&user_id, &err);
                None
            }
        }
    });

    ScheduleResponseDto {
        saved: record_id.is_some(),
        record_id,
        schedule,
    }
}

/// 读取用户当前的学习计划
pub fn show_schedule(state: &PlannerState, user_id: &str) -> Result<Vec<ScheduleDay>> {
    state
        .store
        .load_active_schedule(user_id)
        .context("读取学习计划失败")?
        .ok_or_else(|| StoreError::NoActiveSchedule(user_id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::memory_state;
    use crate::commands::PlannerState;
    use crate::config::PlannerConfig;
    use crate::models::Difficulty;
    use crate::services::database::{ProgressStore, ScheduleRecord};
    use crate::services::observer::testing::RecordingObserver;
    use std::sync::Arc;

    /// 每次保存都失败的存储
    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        fn save_schedule(&self, _user_id: &str, _schedule: &[ScheduleDay]) -> Result<String, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        fn load_active_schedule(&self, _user_id: &str) -> Result<Option<Vec<ScheduleDay>>, StoreError> {
            Ok(None)
        }

        fn set_completion(
            &self,
            user_id: &str,
            _day_index: usize,
            _problem_index: usize,
            _completed: bool,
        ) -> Result<(), StoreError> {
            Err(StoreError::NoActiveSchedule(user_id.to_string()))
        }

        fn schedule_history(&self, _user_id: &str) -> Result<Vec<ScheduleRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_request_uses_camel_case() {
        let json = r#"{
            "topicDays": {"Arrays": 2},
            "topicOrder": {"Arrays": 1},
            "problems": [{"name": "Two Sum", "topic": "Arrays", "difficulty": "Easy"}],
            "userId": "alice"
        }"#;

        let request: ScheduleRequestDto = serde_json::from_str(json).unwrap();
        assert_eq!(request.topic_days["Arrays"], 2);
        assert_eq!(request.problems[0].difficulty, Difficulty::Easy);
        assert_eq!(request.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_malformed_problems_are_dropped() {
        let json = r#"{
            "topicDays": {"Arrays": 1},
            "problems": [
                null,
                {"name": "Two Sum", "topic": "Arrays", "difficulty": "Easy"},
                {"topic": "Arrays"},
                {"name": "   "},
                42,
                {"name": "3Sum", "topic": "Arrays"}
            ]
        }"#;

        let request: ScheduleRequestDto = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = request.problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Two Sum", "3Sum"]);
        assert_eq!(request.rejected_problems, vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_rejected_problems_are_reported() {
        let observer = Arc::new(RecordingObserver::default());
        let state = PlannerState::new(PlannerConfig::default(), Box::new(BrokenStore), observer.clone());
        let request: ScheduleRequestDto = serde_json::from_str(
            r#"{"problems": [{"name": "Two Sum"}, null, {"link": "https://x.com/a"}]}"#,
        )
        .unwrap();

        let response = generate_schedule(&state, request);
        assert_eq!(response.schedule.len(), 1);
        assert_eq!(response.schedule[0].problems[0].name, "Two Sum");
        assert_eq!(
            observer.events(),
            vec!["rejected:1".to_string(), "rejected:2".to_string()]
        );
    }

    #[test]
    fn test_generate_and_show() {
        let state = memory_state();
        let request = ScheduleRequestDto {
            topic_days: HashMap::from([("Arrays".to_string(), 1)]),
            problems: vec![
                Problem::new("Two Sum", "Arrays", Difficulty::Easy),
                Problem::new("Word Ladder", "Graphs", Difficulty::Hard),
            ],
            user_id: Some("alice".to_string()),
            ..ScheduleRequestDto::default()
        };

        let response = generate_schedule(&state, request);
        assert!(response.saved);
        assert!(response.record_id.is_some());
        assert_eq!(response.schedule.len(), 2);

        let shown = show_schedule(&state, "alice").unwrap();
        assert_eq!(shown, response.schedule);
    }

    #[test]
    fn test_without_user_nothing_is_saved() {
        let state = memory_state();
        let request = ScheduleRequestDto {
            problems: vec![Problem::new("Two Sum", "Arrays", Difficulty::Easy)],
            user_id: Some("  ".to_string()),
            ..ScheduleRequestDto::default()
        };

        let response = generate_schedule(&state, request);
        assert!(!response.saved);
        assert_eq!(response.schedule.len(), 1);
    }

    #[test]
    fn test_save_failure_still_returns_schedule() {
        let observer = Arc::new(RecordingObserver::default());
        let state = PlannerState::new(PlannerConfig::default(), Box::new(BrokenStore), observer.clone());
        let request = ScheduleRequestDto {
            problems: vec![Problem::new("Two Sum", "Arrays", Difficulty::Easy)],
            user_id: Some("alice".to_string()),
            ..ScheduleRequestDto::default()
        };

        let response = generate_schedule(&state, request);
        assert!(!response.saved);
        assert_eq!(response.schedule[0].problems[0].name, "Two Sum");
        assert!(observer.events().contains(&"save_failed:alice".to_string()));
    }

    #[test]
    fn test_show_without_schedule_is_not_found() {
        let state = memory_state();
        let err = show_schedule(&state, "nobody").unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().unwrap();
        assert!(store_err.is_not_found());
    }
}
