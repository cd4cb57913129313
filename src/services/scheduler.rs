//! 学习日程生成
//!
//! 按主题分组，主题按用户给定的顺序排列，再把每个主题的题目按难度权重
//! 贪心地分配到该主题的若干天里。分配是近似的：每天装到目标分值就停，
//! 不回头寻找更紧凑的组合。

use std::collections::HashMap;

use crate::models::{Problem, ScheduleDay, ScheduledProblem, UNCATEGORIZED};

/// 没有指定顺序的主题排在所有指定顺序的主题之后
const UNRANKED: i64 = 999;

/// 日程参数
#[derive(Debug, Clone, Default)]
pub struct ScheduleRequest {
    /// 每个主题分配的天数，缺省或非正数使用 `default_days`
    pub topic_days: HashMap<String, i64>,
    /// 主题排序，数值小的在前
    pub topic_order: HashMap<String, i64>,
    pub default_days: u32,
}

/// 一个主题的全部题目，保持输入顺序
struct TopicBucket<'a> {
    topic: &'a str,
    problems: Vec<&'a Problem>,
}

/// 生成日程；输入确定时输出确定
pub fn build_schedule(problems: &[Problem], request: &ScheduleRequest) -> Vec<ScheduleDay> {
    let mut buckets = group_by_topic(problems);
    buckets.sort_by_key(|bucket| {
        request
            .topic_order
            .get(bucket.topic)
            .copied()
            .unwrap_or(UNRANKED)
    });

    let mut schedule = Vec::new();
    for bucket in buckets {
        let days = days_for(bucket.topic, request);
        for day_problems in distribute(bucket.problems, days) {
            schedule.push(ScheduleDay {
                day: schedule.len() as u32 + 1,
                topic: bucket.topic.to_string(),
                problems: day_problems.into_iter().map(ScheduledProblem::from).collect(),
            });
        }
    }

    schedule
}

fn group_by_topic(problems: &[Problem]) -> Vec<TopicBucket<'_>> {
    let mut buckets: Vec<TopicBucket<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for problem in problems {
        let topic = match problem.topic.trim() {
            "" => UNCATEGORIZED,
            _ => problem.topic.as_str(),
        };
        let pos = *index.entry(topic).or_insert_with(|| {
            buckets.push(TopicBucket {
                topic,
                problems: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[pos].problems.push(problem);
    }

    buckets
}

fn days_for(topic: &str, request: &ScheduleRequest) -> u64 {
    match request.topic_days.get(topic) {
        Some(&days) if days > 0 => days.unsigned_abs(),
        _ => u64::from(request.default_days.max(1)),
    }
}

/// 把一个主题的题目分到 `days` 天，空的天不输出
///
/// `days` 可以远大于题目数，题目分完即停止
fn distribute(mut problems: Vec<&Problem>, days: u64) -> Vec<Vec<&Problem>> {
    // sort_by 是稳定排序，同权重保持输入顺序
    problems.sort_by(|a, b| b.difficulty.weight().cmp(&a.difficulty.weight()));

    let total: u64 = problems.iter().map(|p| u64::from(p.difficulty.weight())).sum();
    let target = total.div_ceil(days.max(1));

    let mut remaining = problems.into_iter().peekable();
    let mut result: Vec<Vec<&Problem>> = Vec::new();

    for slot in 0..days {
        if remaining.peek().is_none() {
            break;
        }
        let last_slot = slot + 1 == days;
        let mut day = Vec::new();
        let mut points: u64 = 0;

        while let Some(problem) = remaining.peek() {
            if !last_slot && points >= target {
                break;
            }
            points += u64::from(problem.difficulty.weight());
            day.extend(remaining.next());
        }

        if !day.is_empty() {
            result.push(day);
        }
    }

    // 最后一天会取走全部剩余，这里只是兜底
    let leftovers: Vec<&Problem> = remaining.collect();
    if !leftovers.is_empty() {
        match result.last_mut() {
            Some(last) => last.extend(leftovers),
            None => result.push(leftovers),
        }
    }

    result
}
