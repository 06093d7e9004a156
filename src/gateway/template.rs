//! The "When X, I will Y." action template, per language.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Language;

// ── Regex patterns ──────────────────────────────────────────────────────

static RE_ENGLISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^when\s+\S.*,\s*i will\s+\S.*\.$").unwrap()
});

static RE_CHINESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^在.+时[，,]\s*我会.+。$").unwrap()
});

static RE_SPANISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^cuando\s+\S.*,\s*voy a\s+\S.*\.$").unwrap()
});

/// The template an action sentence must match in `language`.
pub fn action_template(language: Language) -> &'static Regex {
    match language {
        Language::English => &RE_ENGLISH,
        Language::Chinese => &RE_CHINESE,
        Language::Spanish => &RE_SPANISH,
    }
}

/// Whether `action` (trimmed) is one template sentence in `language`.
pub fn matches_template(action: &str, language: Language) -> bool {
    action_template(language).is_match(action.trim())
}

/// Wrap free text so it reads as a template sentence.
pub(crate) fn wrap(text: &str, language: Language) -> String {
    let body = text.trim().trim_end_matches(['.', '。']);
    match language {
        Language::English => format!("When I need a reset, I will {}.", lower_first(body)),
        Language::Chinese => format!("在需要调整时，我会{body}。"),
        Language::Spanish => format!("Cuando necesite un respiro, voy a {}.", lower_first(body)),
    }
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
