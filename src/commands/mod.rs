// 命令模块
// 命令行各子命令对应的处理函数，返回可直接序列化输出的 DTO

pub mod analyze;
pub mod progress;
pub mod schedule;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::services::database::{ProgressStore, SqliteProgressStore};
use crate::services::observer::PipelineObserver;
use crate::services::topics::TopicTable;

pub use analyze::{analyze, AnalysisDto, AnalyzeInput, SheetInput};
pub use progress::{get_progress_stats, get_schedule_history, update_progress, ProgressUpdateDto};
pub use schedule::{generate_schedule, show_schedule, ScheduleRequestDto, ScheduleResponseDto};

/// 各命令共享的运行状态
pub struct PlannerState {
    pub config: PlannerConfig,
    pub topics: TopicTable,
    pub store: Box<dyn ProgressStore>,
    pub observer: Arc<dyn PipelineObserver>,
}

impl PlannerState {
    pub fn new(
        config: PlannerConfig,
        store: Box<dyn ProgressStore>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            config,
            topics: TopicTable::standard(),
            store,
            observer,
        }
    }

    /// 打开配置中的数据库
    pub fn open(config: PlannerConfig, observer: Arc<dyn PipelineObserver>) -> Result<Self> {
        let store = SqliteProgressStore::open(&config.db_path)
            .with_context(|| format!("无法打开数据库 {}", config.db_path.display()))?;
        Ok(Self::new(config, Box::new(store), observer))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::services::observer::NoopObserver;

    pub fn memory_state() -> PlannerState {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        PlannerState::new(
            PlannerConfig::default(),
            Box::new(store),
            Arc::new(NoopObserver),
        )
    }
}
