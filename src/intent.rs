//! Heuristic intent classification for incoming chat messages.
//!
//! Pure keyword matching, no model call: every input maps to exactly one
//! of the three intents and identical input always yields the same result.

use serde::Serialize;

/// Coarse shape of a user request, recomputed per turn and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// The user wants an actionable exhibition-planning document.
    Plan,
    /// The user wants information about existing exhibitions.
    Info,
    /// Neither heuristic fired; let the model decide the shape.
    Auto,
}

const PLAN_KEYWORDS: &[&str] = &[
    "方案", "筹备", "规划", "计划", "举办", "办一个", "开一个", "策划",
];

const INFO_KEYWORDS: &[&str] = &[
    "有哪些", "有什么展", "展会信息", "时间", "地点", "官网", "主办", "参展",
];

const INFO_PATTERNS: &[&str] = &["展会", "博览会", "大会"];

/// Classify a raw user message. Case-insensitive; `Plan` wins over `Info`
/// whenever both heuristics fire, unless the text also asks to 查询.
pub fn classify(text: &str) -> Intent {
    let t = text.to_lowercase();

    let is_plan = PLAN_KEYWORDS.iter().any(|k| t.contains(k)) && t.contains("展");
    let is_info = INFO_KEYWORDS.iter().any(|k| t.contains(k))
        || INFO_PATTERNS.iter().any(|k| t.contains(k));

    if is_plan && !t.contains("查询") {
        Intent::Plan
    } else if is_info && !is_plan {
        Intent::Info
    } else {
        Intent::Auto
    }
}
