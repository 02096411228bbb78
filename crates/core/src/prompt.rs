use crate::models::{ComposedPrompt, Language, PolicyOutcome, PolicyRecord};

pub const LANGUAGE_NOT_DETECTED: &str = "language not detected, please use English or Japanese.";

const EN_POLICY_SYSTEM: &str = "Role: you are an HR assistant who answers from company policy. \
Explain the policy provided below accurately and in plain words. \
Do not invent rules that are not written in the policy.";

const JA_POLICY_SYSTEM: &str = "役割: 社内規定に基づいて回答する人事アシスタントです。\
提示された規定の内容を正確かつ分かりやすく説明してください。規定に書かれていないルールを作らないでください。";

const EN_PROBE_SYSTEM: &str = "Role: you are a counselor and consultant for employees. \
Accept what the employee says and respond with care. \
Ask them to describe the situation in more detail so that feelings, opinions, and facts can be told apart.";

const JA_PROBE_SYSTEM: &str = "役割: 社員の気持ちや意見に寄り添うカウンセラー兼コンサルタントです。\
言い分を受け止めて丁寧に対応し、感情・主観・事実を切り分けられるよう、状況をもう少し詳しく話してもらうよう促してください。";

const FALLBACK_SYSTEM: &str = "Role: you are a polite HR assistant. \
Reply briefly and ask the employee to write again in English or Japanese.";

const COUNSELOR_SYSTEM: &str = "役割: カウンセラー兼コンサルとして、社員、特にマネジメント層に属さない人々の感情や意見を理解し、\
経営判断に活かせるエッセンスを抽出します。感情の確認と理由の探求を行い、事実と感情の区別をつけます。\n\
対話の姿勢: 言い分を受け止め、寄り添い、丁寧に対応します。怒りの感情が落ち着くまで諭すことはせず、\
感情、主観、事実をその会話の中で深掘りし、分けられるようにします。";

const EN_POLICY_PREAMBLE: &str = "I found the following company policy related to your question:";
const JA_POLICY_PREAMBLE: &str = "ご質問に関連する社内規定が見つかりました：";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    None,
    PolicyContent { preamble: &'static str },
    Fixed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub system: &'static str,
    pub seed: Seed,
}

pub fn select_template(outcome: PolicyOutcome, language: Language) -> Template {
    match (outcome, language) {
        (_, Language::Unknown) => Template {
            system: FALLBACK_SYSTEM,
            seed: Seed::Fixed(LANGUAGE_NOT_DETECTED),
        },
        (PolicyOutcome::Found, Language::En) => Template {
            system: EN_POLICY_SYSTEM,
            seed: Seed::PolicyContent {
                preamble: EN_POLICY_PREAMBLE,
            },
        },
        (PolicyOutcome::Found, Language::Ja) => Template {
            system: JA_POLICY_SYSTEM,
            seed: Seed::PolicyContent {
                preamble: JA_POLICY_PREAMBLE,
            },
        },
        (PolicyOutcome::NotFound | PolicyOutcome::NoKeyword, Language::En) => Template {
            system: EN_PROBE_SYSTEM,
            seed: Seed::None,
        },
        (PolicyOutcome::NotFound | PolicyOutcome::NoKeyword, Language::Ja) => Template {
            system: JA_PROBE_SYSTEM,
            seed: Seed::None,
        },
    }
}

/// `policy` is only read when the outcome is `Found`.
pub fn compose_prompt(
    text: &str,
    language: Language,
    outcome: PolicyOutcome,
    policy: Option<&PolicyRecord>,
) -> ComposedPrompt {
    let template = select_template(outcome, language);

    let assistant_seed = match template.seed {
        Seed::None => None,
        Seed::Fixed(message) => Some(message.to_string()),
        Seed::PolicyContent { preamble } => {
            policy.map(|record| format!("{}\n{}: {}", preamble, record.title, record.content))
        }
    };

    ComposedPrompt {
        system: template.system.to_string(),
        user: text.to_string(),
        assistant_seed,
    }
}

pub fn counselor_prompt(text: &str) -> ComposedPrompt {
    ComposedPrompt {
        system: COUNSELOR_SYSTEM.to_string(),
        user: text.to_string(),
        assistant_seed: None,
    }
}

pub fn normalize_reply(raw: &str, ensure_terminal_period: bool) -> String {
    let mut reply = raw.trim().to_string();
    if ensure_terminal_period && !reply.ends_with('.') {
        reply.push('.');
    }
    reply
}
