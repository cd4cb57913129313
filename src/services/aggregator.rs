//! 多表去重合并
//! 按 trim 后的题名合并所有表格的提取结果，记录每道题的来源表

use std::collections::HashMap;

use crate::models::{Difficulty, Problem, UNCATEGORIZED};
use crate::services::extractor::{ExtractorConfig, RowExtractor};
use crate::services::observer::PipelineObserver;
use crate::services::sheet::Sheet;
use crate::services::topics::TopicTable;

/// 同名题目的累积状态
#[derive(Debug)]
struct Accumulator {
    name: String,
    link: String,
    /// 按插入顺序去重
    sources: Vec<String>,
    topic: String,
    difficulty: Difficulty,
}

impl Accumulator {
    fn add_source(&mut self, label: &str) {
        if !self.sources.iter().any(|s| s == label) {
            self.sources.push(label.to_string());
        }
    }

    fn into_problem(self, topics: &TopicTable) -> Problem {
        Problem {
            topic: topics.normalize(&self.topic),
            name: self.name,
            link: self.link,
            difficulty: self.difficulty,
            source: self.sources.join(", "),
        }
    }
}

/// 去重合并器
pub struct Aggregator<'a> {
    extractor: RowExtractor<'a>,
    topics: &'a TopicTable,
    max_problems: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(topics: &'a TopicTable, extractor: ExtractorConfig, max_problems: usize) -> Self {
        Self {
            extractor: RowExtractor::new(extractor, topics),
            topics,
            max_problems,
        }
    }

    /// 输入顺序确定时输出也确定；超出上限时按首次出现顺序截断
    pub fn aggregate(&self, sheets: &[Sheet], observer: &dyn PipelineObserver) -> Vec<Problem> {
        let mut order: Vec<Accumulator> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for sheet in sheets {
            for (row_index, row) in sheet.rows.iter().enumerate() {
                let Some(problem) = self.extractor.extract(row, row_index, &sheet.label) else {
                    observer.on_row_skipped(&sheet.label, row_index);
                    continue;
                };

                match index.get(&problem.name) {
                    Some(&pos) => {
                        let existing = &mut order[pos];
                        existing.add_source(&sheet.label);
                        if existing.topic == UNCATEGORIZED && problem.topic != UNCATEGORIZED {
                            existing.topic = problem.topic;
                        }
                        if existing.link.is_empty() && !problem.link.is_empty() {
                            existing.link = problem.link;
                        }
                    }
                    None => {
                        index.insert(problem.name.clone(), order.len());
                        order.push(Accumulator {
                            name: problem.name,
                            link: problem.link,
                            sources: vec![sheet.label.clone()],
                            topic: problem.topic,
                            difficulty: problem.difficulty,
                        });
                    }
                }
            }
        }

        let unique = order.len();
        order.truncate(self.max_problems);
        observer.on_problems_aggregated(unique, order.len());

        order
            .into_iter()
            .map(|acc| acc.into_problem(self.topics))
            .collect()
    }
}
