//! 流水线观测点
//! 业务代码只在这些固定的扩展点上报事件，日志输出由注入的实现决定

use crate::error::{ClassificationError, SheetError, StoreError};

/// 流水线事件接收者，所有方法默认为空实现
pub trait PipelineObserver: Send + Sync {
    fn on_sheet_loaded(&self, _label: &str, _rows: usize) {}

    fn on_sheet_failed(&self, _label: &str, _error: &SheetError) {}

    fn on_row_skipped(&self, _label: &str, _row_index: usize) {}

    fn on_problems_aggregated(&self, _unique: usize, _kept: usize) {}

    fn on_batch_started(&self, _batch: usize, _size: usize) {}

    fn on_batch_finished(&self, _batch: usize, _classified: usize) {}

    fn on_batch_failed(&self, _batch: usize, _error: &ClassificationError) {}

    fn on_problem_rejected(&self, _index: usize) {}

    fn on_schedule_built(&self, _days: usize, _problems: usize) {}

    fn on_schedule_saved(&self, _user_id: &str, _record_id: &str) {}

    fn on_save_failed(&self, _user_id: &str, _error: &StoreError) {}
}

/// 什么都不做
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// 转发到 `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn on_sheet_loaded(&self, label: &str, rows: usize) {
        log::info!("读取表格 {}: {} 行", label, rows);
    }

    fn on_sheet_failed(&self, label: &str, error: &SheetError) {
        log::error!("表格 {} 读取失败: {}", label, error);
    }

    fn on_row_skipped(&self, label: &str, row_index: usize) {
        log::trace!("跳过 {} 第 {} 行", label, row_index + 1);
    }

    fn on_problems_aggregated(&self, unique: usize, kept: usize) {
        if kept < unique {
            log::warn!("去重后 {} 道题，超出上限，仅保留前 {} 道", unique, kept);
        } else {
            log::info!("去重后 {} 道题", unique);
        }
    }

    fn on_batch_started(&self, batch: usize, size: usize) {
        log::debug!("批次 #{} 开始分类 ({} 道)", batch, size);
    }

    fn on_batch_finished(&self, batch: usize, classified: usize) {
        log::info!("批次 #{} 完成, {} 道题已分类", batch, classified);
    }

    fn on_batch_failed(&self, batch: usize, error: &ClassificationError) {
        log::error!("批次 #{} 分类失败, 使用原始数据: {}", batch, error);
    }

    fn on_problem_rejected(&self, index: usize) {
        log::warn!("忽略第 {} 道题: 缺少题名或格式错误", index + 1);
    }

    fn on_schedule_built(&self, days: usize, problems: usize) {
        log::info!("生成学习计划: {} 天, {} 道题", days, problems);
    }

    fn on_schedule_saved(&self, user_id: &str, record_id: &str) {
        log::info!("已保存 {} 的学习计划 ({})", user_id, record_id);
    }

    fn on_save_failed(&self, user_id: &str, error: &StoreError) {
        log::error!("保存 {} 的学习计划失败: {}", user_id, error);
    }
}
