// 主题难度分布统计

use crate::models::{Difficulty, Problem, TopicSummary, UNCATEGORIZED};

/// 按主题统计 Easy / Medium / Hard 数量，主题按首次出现顺序排列
pub fn summarize(problems: &[Problem]) -> Vec<TopicSummary> {
    let mut summaries: Vec<TopicSummary> = Vec::new();

    for problem in problems {
        let topic = if problem.topic.trim().is_empty() {
            UNCATEGORIZED
        } else {
            problem.topic.as_str()
        };

        let pos = match summaries.iter().position(|s| s.topic == topic) {
            Some(pos) => pos,
            None => {
                summaries.push(TopicSummary {
                    topic: topic.to_string(),
                    ..TopicSummary::default()
                });
                summaries.len() - 1
            }
        };

        let summary = &mut summaries[pos];
        match problem.difficulty {
            Difficulty::Easy => summary.easy += 1,
            Difficulty::Medium => summary.medium += 1,
            Difficulty::Hard => summary.hard += 1,
        }
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        let problems = vec![
            Problem::new("Two Sum", "Arrays", Difficulty::Easy),
            Problem::new("Word Ladder", "Graphs", Difficulty::Hard),
            Problem::new("3Sum", "Arrays", Difficulty::Medium),
            Problem::new("Kadane", "", Difficulty::Medium),
        ];

        let summary = summarize(&problems);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].topic, "Arrays");
        assert_eq!((summary[0].easy, summary[0].medium, summary[0].hard), (1, 1, 0));
        assert_eq!(summary[0].total(), 2);
        assert_eq!(summary[1].topic, "Graphs");
        assert_eq!(summary[2].topic, UNCATEGORIZED);
    }
}
