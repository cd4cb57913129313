//! 刷题计划生成器
//!
//! 题单表格 -> 行提取 -> 去重合并 -> LLM 分类 -> 按天排期 -> 进度存储

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{PlannerConfig, ValidityPolicy};
pub use error::{ClassificationError, SheetError, StoreError};
