//! 主题归一化
//! 按顺序做子串匹配，把任意主题文本映射到固定的主题枚举，先匹配先生效

use crate::models::UNCATEGORIZED;

/// 一条归一化规则：任一关键字命中即归入 `topic`
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRule {
    pub keywords: Vec<String>,
    pub topic: String,
}

impl TopicRule {
    pub fn new(keywords: &[&str], topic: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            topic: topic.to_string(),
        }
    }
}

/// 主题规则表，不同部署可以替换整张表
#[derive(Debug, Clone, PartialEq)]
pub struct TopicTable {
    rules: Vec<TopicRule>,
}

impl TopicTable {
    pub fn new(rules: Vec<TopicRule>) -> Self {
        Self { rules }
    }

    /// 默认题单主题表
    ///
    /// 顺序有意义：segment/fenwick 在 tree 之前，bst 在 tree 之前，
    /// priority 在 queue 之前。
    pub fn standard() -> Self {
        Self::new(vec![
            TopicRule::new(&["segment", "fenwick"], "Segment Tree / Fenwick Tree (Advanced)"),
            TopicRule::new(&["trie"], "Trie"),
            TopicRule::new(&["sliding", "pointer"], "Sliding Window / Two Pointers"),
            TopicRule::new(&["bit"], "Bit Manipulation"),
            TopicRule::new(&["greedy"], "Greedy Algorithms"),
            TopicRule::new(&["dp", "dynamic"], "Dynamic Programming"),
            TopicRule::new(&["graph", "bfs", "dfs"], "Graphs"),
            TopicRule::new(&["recursion", "backtrack"], "Recursion & Backtracking"),
            TopicRule::new(&["hash", "map", "set"], "Hashing"),
            TopicRule::new(&["heap", "priority"], "Heaps / Priority Queues"),
            TopicRule::new(&["bst", "binary search tree"], "Binary Search Trees (BST)"),
            TopicRule::new(&["tree"], "Trees"),
            TopicRule::new(&["queue"], "Queues"),
            TopicRule::new(&["stack"], "Stacks"),
            TopicRule::new(&["linked list"], "Linked Lists"),
            TopicRule::new(&["string"], "Strings"),
            TopicRule::new(&["array"], "Arrays"),
        ])
    }

    /// 把任意文本映射为规范主题，无匹配时返回 `Uncategorized`
    pub fn normalize(&self, input: &str) -> String {
        self.lookup(input)
            .map(str::to_string)
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }

    /// 与 `normalize` 相同，但无匹配时返回 `None`
    pub fn lookup(&self, input: &str) -> Option<&str> {
        let lower = input.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|rule| rule.topic.as_str())
    }

    /// 规范主题列表，按规则表顺序去重
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !topics.contains(&rule.topic.as_str()) {
                topics.push(rule.topic.as_str());
            }
        }
        topics
    }

    pub fn is_canonical(&self, topic: &str) -> bool {
        self.rules.iter().any(|rule| rule.topic == topic)
    }
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::standard()
    }
}
