use crate::models::{Classification, Language};

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "working hours",
    "leave request",
    "day off",
    "overtime policy",
    "dress code",
    "confidential information handling",
    "security policy",
    "business travel policy",
    "health checkup",
    "harassment prevention",
    "remote work policy",
    "勤務時間",
    "休暇申請",
    "残業規定",
    "服装規定",
    "機密情報の取り扱い",
    "セキュリティポリシー",
    "出張規定",
    "健康診断",
    "ハラスメント防止",
    "リモートワーク規定",
];

/// Ordered keyword list. Earlier entries win over later ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .map(|keyword: String| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty())
            .collect();

        Self { keywords }
    }

    /// Parses a comma-separated list, keeping the given order.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn first_match(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| lower.contains(&keyword.to_lowercase()))
            .map(String::as_str)
    }
}

pub fn detect_language(text: &str) -> Language {
    let mut kana_count = 0usize;
    let mut ideograph_count = 0usize;
    let mut ascii_count = 0usize;
    let mut other_alpha_count = 0usize;

    for ch in text.chars() {
        let code = ch as u32;
        if (0x3040..=0x30FF).contains(&code) || (0xFF66..=0xFF9F).contains(&code) {
            kana_count += 1;
        } else if (0x4E00..=0x9FFF).contains(&code) || (0x3400..=0x4DBF).contains(&code) {
            ideograph_count += 1;
        } else if ch.is_ascii_alphabetic() {
            ascii_count += 1;
        } else if ch.is_alphabetic() {
            other_alpha_count += 1;
        }
    }

    if kana_count > 0 || (ideograph_count > 0 && ideograph_count >= ascii_count) {
        Language::Ja
    } else if ascii_count > 0 && ascii_count >= other_alpha_count {
        Language::En
    } else {
        Language::Unknown
    }
}

pub fn classify(text: &str, keywords: &KeywordSet) -> Classification {
    Classification {
        language: detect_language(text),
        keyword: keywords.first_match(text).map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        assert_eq!(detect_language("What are the working hours?"), Language::En);
    }

    #[test]
    fn detects_japanese_with_kana() {
        assert_eq!(detect_language("残業について教えてください"), Language::Ja);
    }

    #[test]
    fn detects_japanese_from_kanji_only() {
        assert_eq!(detect_language("残業規定"), Language::Ja);
    }

    #[test]
    fn empty_and_symbol_only_text_is_unknown() {
        assert_eq!(detect_language(""), Language::Unknown);
        assert_eq!(detect_language("   "), Language::Unknown);
        assert_eq!(detect_language("1234 !?"), Language::Unknown);
    }

    #[test]
    fn non_latin_non_japanese_script_is_unknown() {
        assert_eq!(detect_language("Привет, как дела"), Language::Unknown);
    }

    #[test]
    fn keyword_match_ignores_case() {
        let keywords = KeywordSet::default();
        let result = classify("Can you explain the WORKING HOURS rule?", &keywords);
        assert_eq!(result.keyword.as_deref(), Some("working hours"));
        assert_eq!(result.language, Language::En);
    }

    #[test]
    fn configuration_order_wins_over_text_position() {
        let keywords = KeywordSet::default();
        let result = classify(
            "About the dress code and also my working hours",
            &keywords,
        );
        assert_eq!(result.keyword.as_deref(), Some("working hours"));
    }

    #[test]
    fn custom_order_is_respected() {
        let keywords = KeywordSet::from_csv("dress code, working hours");
        let result = classify("working hours and dress code", &keywords);
        assert_eq!(result.keyword.as_deref(), Some("dress code"));
    }

    #[test]
    fn no_keyword_yields_none() {
        let result = classify("I am frustrated with my manager", &KeywordSet::default());
        assert_eq!(result.keyword, None);
    }

    #[test]
    fn japanese_keyword_matches() {
        let result = classify("残業規定を確認したいです", &KeywordSet::default());
        assert_eq!(result.keyword.as_deref(), Some("残業規定"));
        assert_eq!(result.language, Language::Ja);
    }

    #[test]
    fn classify_is_idempotent() {
        let keywords = KeywordSet::default();
        let text = "Is there a security policy for passwords?";
        assert_eq!(classify(text, &keywords), classify(text, &keywords));
    }

    #[test]
    fn csv_parsing_drops_blanks() {
        let keywords = KeywordSet::from_csv(" a , ,b,");
        assert_eq!(keywords.as_slice(), &["a".to_string(), "b".to_string()]);
    }
}
