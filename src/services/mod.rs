// 服务模块
// 表格读取、行提取、去重、分类、排期与进度存储

pub mod aggregator;
pub mod batcher;
pub mod classifier;
pub mod database;
pub mod extractor;
pub mod observer;
pub mod scheduler;
pub mod sheet;
pub mod summary;
pub mod topics;

pub use aggregator::Aggregator;

pub use batcher::{
    classify_all,
    classify_batch,
    link_in_allowlist,
    merge_classification,
    BatchFailure,
    BatchOptions,
    ClassificationReport,
};

pub use classifier::{
    parse_classifications,
    BatchIndex,
    Classification,
    ClassificationItem,
    ClassificationResponse,
    Classifier,
    GroqClient,
};

pub use database::{
    ProgressStats,
    ProgressStore,
    ScheduleRecord,
    SqliteProgressStore,
    TopicProgress,
};

pub use extractor::{Cell, ExtractorConfig, RowExtractor};
pub use observer::{LogObserver, NoopObserver, PipelineObserver};
pub use scheduler::{build_schedule, ScheduleRequest};
pub use sheet::{clean_source_label, fetch_sheet, google_sheet_export_url, read_sheet_file, Sheet};
pub use summary::summarize;
pub use topics::{TopicRule, TopicTable};
