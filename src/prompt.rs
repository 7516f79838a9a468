//! Fixed prompt copy and per-turn prompt augmentation.
//!
//! Both transports call [`push_user_turn`] so classification and steering
//! cannot drift between them: the model always sees the real user message
//! followed by one steering instruction as a second consecutive user turn.

use crate::intent::{Intent, classify};
use crate::models::{ChatMessage, Transcript};

/// System instruction seeding every transcript.
pub const SYSTEM_PROMPT: &str = r#"你是一个【展会信息与策划聊天式 Agent】。

你的目标：
- 像一个真实的人类助理一样与用户自然对话
- 帮助用户逐步明确展会相关需求
- 在合适的时机提供专业、可执行的信息

对话规则：
1. 默认使用自然、口语但专业的中文
2. 可以寒暄、解释、追问
3. 信息不完整时，主动提问澄清
4. 不编造不存在的展会
5. 不确定要明确说“不确定”

结构化输出规则：
- 只有在用户明确要求「整理 / 清单 / 表格 / JSON / 结构化」
  或你判断结构化明显更有用时，才输出 JSON
- 输出 JSON 时：
  - 先用自然语言说明
  - 然后单独输出一个 JSON（不要 Markdown）
  - JSON 外不夹杂多余文本

JSON 结构（需要时）：
{
  "events": [
    {
      "name": "",
      "date": "",
      "city": "",
      "venue": "",
      "organizer": "",
      "website": "",
      "description": ""
    }
  ],
  "next_step": ""
}

输出语言：中文"#;

const PLAN_INSTRUCTION: &str = "当前意图是“筹办动漫展会的可执行方案”。请以自然语言输出，包含：目标与定位、主题与受众、时间与规模、预算拆分、场地与动线、展商与赞助、内容策划（日程/舞台/嘉宾）、票务与权益、宣发渠道与节奏、人员组织与SOP、风险与预案、里程碑时间表（倒排）。如需再细化，可在结尾给出3条高价值下一步建议。";

const TABLE_INSTRUCTION: &str = "请用中文自然说明，并给出一个Markdown表格，不要JSON。表格列：名称|时间|城市|地点|主办|官网|简介。若信息不全，请在表格后给出建议与下一步。";

const PROSE_INSTRUCTION: &str = "请以中文自然说明为主，不要输出JSON或表格；必要时可在文案中附上官网链接。";

/// Status text emitted while a completion is in flight.
pub const THINKING_STATUS: &str = "正在思考中…";

/// Synthetic reply used when no credential is configured (full-duplex path).
pub const MISSING_KEY_REPLY: &str =
    "❌ 未配置通义 API Key，请设置环境变量 DASHSCOPE_API_KEY。";

/// Error payload text for a missing credential on the one-shot path.
pub const MISSING_KEY_ERROR: &str = "未配置通义密钥";

const TABLE_KEYWORDS: &[&str] = &[
    "表格", "清单", "列表", "excel", "csv", "结构化", "整理成表格", "导出",
];

/// Whether the user is asking for tabular or otherwise structured output.
pub fn wants_table(text: &str) -> bool {
    let t = text.to_lowercase();
    TABLE_KEYWORDS.iter().any(|k| t.contains(k))
}

/// Pick the steering instruction appended after the user message.
pub fn steering_instruction(intent: Intent, text: &str) -> &'static str {
    if intent == Intent::Plan {
        PLAN_INSTRUCTION
    } else if wants_table(text) {
        TABLE_INSTRUCTION
    } else {
        PROSE_INSTRUCTION
    }
}

/// Append one user turn: the real message plus its steering instruction,
/// both as `user`-role entries. Returns the classified intent.
pub fn push_user_turn(transcript: &mut Transcript, text: &str) -> Intent {
    let intent = classify(text);
    transcript.push(ChatMessage::user(text));
    transcript.push(ChatMessage::user(steering_instruction(intent, text)));
    intent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn plan_intent_selects_planning_instruction() {
        let instruction = steering_instruction(Intent::Plan, "帮我整理成表格");
        assert!(instruction.contains("可执行方案"));
        assert!(instruction.contains("里程碑时间表"));
    }

    #[test]
    fn table_request_selects_table_instruction() {
        for intent in [Intent::Info, Intent::Auto] {
            let instruction = steering_instruction(intent, "帮我整理成表格");
            assert!(instruction.contains("Markdown表格"));
            assert!(instruction.contains("名称|时间|城市|地点|主办|官网|简介"));
        }
    }

    #[test]
    fn default_is_prose_instruction() {
        let instruction = steering_instruction(Intent::Auto, "随便聊聊");
        assert!(instruction.contains("不要输出JSON或表格"));
    }

    #[test]
    fn wants_table_matches_case_insensitively() {
        assert!(wants_table("导出一份 Excel"));
        assert!(wants_table("给我一个CSV"));
        assert!(wants_table("整理成表格"));
        assert!(!wants_table("随便聊聊"));
    }

    #[test]
    fn push_user_turn_appends_two_user_messages() {
        let mut t = Transcript::seeded(SYSTEM_PROMPT);
        let intent = push_user_turn(&mut t, "有哪些展会");
        assert_eq!(intent, Intent::Info);
        assert_eq!(t.len(), 3);
        assert_eq!(t.messages()[1].role, Role::User);
        assert_eq!(t.messages()[1].content, "有哪些展会");
        assert_eq!(t.messages()[2].role, Role::User);
        assert_eq!(t.messages()[2].content, PROSE_INSTRUCTION);
    }
}
