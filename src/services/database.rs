// 进度存储模块
// 以 SQLite 保存每个用户生成的学习计划，并追踪题目完成状态

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::ScheduleDay;

/// 单个主题的完成情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicProgress {
    pub topic: String,
    pub completed: usize,
    pub total: usize,
}

/// 进度统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total_problems: usize,
    pub completed_count: usize,
    /// 百分比
    pub completion_rate: f64,
    pub topics: Vec<TopicProgress>,
}

impl ProgressStats {
    /// 按天顺序统计，主题按首次出现顺序排列
    pub fn from_schedule(days: &[ScheduleDay]) -> Self {
        let mut topics: Vec<TopicProgress> = Vec::new();

        for day in days {
            for problem in &day.problems {
                let pos = match topics.iter().position(|t| t.topic == problem.topic) {
                    Some(pos) => pos,
                    None => {
                        topics.push(TopicProgress {
                            topic: problem.topic.clone(),
                            completed: 0,
                            total: 0,
                        });
                        topics.len() - 1
                    }
                };
                topics[pos].total += 1;
                if problem.completed {
                    topics[pos].completed += 1;
                }
            }
        }

        let total_problems: usize = topics.iter().map(|t| t.total).sum();
        let completed_count: usize = topics.iter().map(|t| t.completed).sum();
        let completion_rate = if total_problems > 0 {
            completed_count as f64 / total_problems as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_problems,
            completed_count,
            completion_rate,
            topics,
        }
    }
}

/// 历史记录摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub day_count: usize,
}

/// 学习计划存储
pub trait ProgressStore: Send + Sync {
    /// 保存新计划并使该用户之前的计划失效，返回记录 ID
    fn save_schedule(&self, user_id: &str, schedule: &[ScheduleDay]) -> Result<String, StoreError>;

    fn load_active_schedule(&self, user_id: &str) -> Result<Option<Vec<ScheduleDay>>, StoreError>;

    /// 修改一道题的完成状态；没有生效计划或下标越界时返回 NotFound 类错误，不做任何修改
    fn set_completion(
        &self,
        user_id: &str,
        day_index: usize,
        problem_index: usize,
        completed: bool,
    ) -> Result<(), StoreError>;

    fn progress_stats(&self, user_id: &str) -> Result<ProgressStats, StoreError> {
        let schedule = self
            .load_active_schedule(user_id)?
            .ok_or_else(|| StoreError::NoActiveSchedule(user_id.to_string()))?;
        Ok(ProgressStats::from_schedule(&schedule))
    }

    /// 最近的在前
    fn schedule_history(&self, user_id: &str) -> Result<Vec<ScheduleRecord>, StoreError>;
}

/// SQLite 实现
pub struct SqliteProgressStore {
    conn: Mutex<Connection>,
}

impl SqliteProgressStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// 初始化表结构
    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                schedule_data TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_schedules_user_active ON schedules(user_id, is_active)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // 连接本身没有跨语句的中间状态，锁中毒后可以继续使用
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 在事务内读取生效计划
    fn active_record(
        tx: &Transaction<'_>,
        user_id: &str,
    ) -> Result<Option<(String, Vec<ScheduleDay>)>, StoreError> {
        let row = tx
            .query_row(
                "SELECT id, schedule_data FROM schedules
                 WHERE user_id = ? AND is_active = 1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1",
                rusqlite::params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((id, data)) => Ok(Some((id, serde_json::from_str(&data)?))),
            None => Ok(None),
        }
    }

    fn row_to_record(row: &Row) -> Result<(String, String, bool, String), rusqlite::Error> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }
}

impl ProgressStore for SqliteProgressStore {
    fn save_schedule(&self, user_id: &str, schedule: &[ScheduleDay]) -> Result<String, StoreError> {
        let data = serde_json::to_string(schedule)?;
        let id = Uuid::new_v4().to_string();

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE schedules SET is_active = 0 WHERE user_id = ? AND is_active = 1",
            rusqlite::params![user_id],
        )?;
        tx.execute(
            "INSERT INTO schedules (id, user_id, schedule_data, is_active, created_at)
             VALUES (?, ?, ?, 1, ?)",
            rusqlite::params![
                id,
                user_id,
                data,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
            ],
        )?;

        tx.commit()?;
        Ok(id)
    }

    fn load_active_schedule(&self, user_id: &str) -> Result<Option<Vec<ScheduleDay>>, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let record = Self::active_record(&tx, user_id)?;
        tx.commit()?;
        Ok(record.map(|(_, schedule)| schedule))
    }

    fn set_completion(
        &self,
        user_id: &str,
        day_index: usize,
        problem_index: usize,
        completed: bool,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let (id, mut schedule) = Self::active_record(&tx, user_id)?
            .ok_or_else(|| StoreError::NoActiveSchedule(user_id.to_string()))?;

        let problem = schedule
            .get_mut(day_index)
            .and_then(|day| day.problems.get_mut(problem_index))
            .ok_or(StoreError::InvalidIndex {
                day_index,
                problem_index,
            })?;
        problem.completed = completed;

        tx.execute(
            "UPDATE schedules SET schedule_data = ? WHERE id = ?",
            rusqlite::params![serde_json::to_string(&schedule)?, id],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn schedule_history(&self, user_id: &str) -> Result<Vec<ScheduleRecord>, StoreError> {
        let conn = self.lock();

        let mut stmt = conn.prepare(
            "SELECT id, schedule_data, is_active, created_at FROM schedules
             WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, data, is_active, created_at)| -> Result<ScheduleRecord, StoreError> {
                let days: Vec<ScheduleDay> = serde_json::from_str(&data)?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|err| {
                        StoreError::Database(rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            Box::new(err),
                        ))
                    })?;
                Ok(ScheduleRecord {
                    id,
                    created_at,
                    is_active,
                    day_count: days.len(),
                })
            })
            .collect()
    }
}
