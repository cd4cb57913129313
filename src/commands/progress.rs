// 进度命令
// 更新完成状态、查看统计与历史计划

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::PlannerState;
use crate::services::database::{ProgressStats, ScheduleRecord};

/// 完成状态更新
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateDto {
    pub user_id: String,
    pub day_index: usize,
    pub problem_index: usize,
    pub completed: bool,
}

/// 更新一道题的完成状态
pub fn update_progress(state: &PlannerState, update: &ProgressUpdateDto) -> Result<()> {
    state
        .store
        .set_completion(
            &update.user_id,
            update.day_index,
            update.problem_index,
            update.completed,
        )
        .with_context(|| {
            format!(
                "更新进度失败: day_index={}, problem_index={}",
                update.day_index, update.problem_index
            )
        })
}

pub fn get_progress_stats(state: &PlannerState, user_id: &str) -> Result<ProgressStats> {
    state
        .store
        .progress_stats(user_id)
        .context("读取进度统计失败")
}

pub fn get_schedule_history(state: &PlannerState, user_id: &str) -> Result<Vec<ScheduleRecord>> {
    state
        .store
        .schedule_history(user_id)
        .context("读取历史计划失败")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::schedule::{generate_schedule, ScheduleRequestDto};
    use crate::commands::testing::memory_state;
    use crate::error::StoreError;
    use crate::models::{Difficulty, Problem};

    fn seed(state: &PlannerState) {
        generate_schedule(
            state,
            ScheduleRequestDto {
                problems: vec![
                    Problem::new("Two Sum", "Arrays", Difficulty::Easy),
                    Problem::new("3Sum", "Arrays", Difficulty::Medium),
                ],
                user_id: Some("alice".to_string()),
                topic_days: [("Arrays".to_string(), 1)].into_iter().collect(),
                ..ScheduleRequestDto::default()
            },
        );
    }

    #[test]
    fn test_update_dto_camel_case() {
        let update: ProgressUpdateDto = serde_json::from_str(
            r#"{"userId": "alice", "dayIndex": 0, "problemIndex": 1, "completed": true}"#,
        )
        .unwrap();
        assert_eq!(update.user_id, "alice");
        assert_eq!(update.problem_index, 1);
        assert!(update.completed);
    }

    #[test]
    fn test_update_and_stats() {
        let state = memory_state();
        seed(&state);

        update_progress(
            &state,
            &ProgressUpdateDto {
                user_id: "alice".to_string(),
                day_index: 0,
                problem_index: 1,
                completed: true,
            },
        )
        .unwrap();

        let stats = get_progress_stats(&state, "alice").unwrap();
        assert_eq!(stats.total_problems, 2);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(get_schedule_history(&state, "alice").unwrap().len(), 1);
    }

    #[test]
    fn test_bad_index_is_not_found() {
        let state = memory_state();
        seed(&state);

        let err = update_progress(
            &state,
            &ProgressUpdateDto {
                user_id: "alice".to_string(),
                day_index: 0,
                problem_index: 9,
                completed: true,
            },
        )
        .unwrap_err();

        assert!(err
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_not_found));
        let stats = get_progress_stats(&state, "alice").unwrap();
        assert_eq!(stats.completed_count, 0);
    }
}
