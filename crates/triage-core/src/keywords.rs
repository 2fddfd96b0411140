//! Keyword extraction from task titles.
//!
//! Titles are tokenised, generic words are dropped, and tokens that look like
//! code identifiers (CamelCase, snake_case, kebab-case, alphanumeric mixes) are
//! flagged as symbols. Symbols keep their original case and are always searched
//! case-sensitively; plain words are lowercased.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Words that match almost every codebase and carry no signal on their own.
const STOP_WORDS: &[&str] = &[
    // articles, pronouns, prepositions, conjunctions
    "the", "and", "for", "with", "from", "into", "onto", "that", "this", "these", "those", "when",
    "then", "than", "are", "was", "were", "will", "should", "could", "would", "can", "not", "all",
    "any", "our", "your", "its", "via", "per", "out", "off", "but", "about", "after", "before",
    "between", "over", "under", "without", "within", "there", "which", "while", "where", "what",
    "who", "how", "why", "also", "more", "less", "some", "each", "every", "other", "only", "just",
    "make", "makes", "allow", "allows", "able", "instead", "using", "use", "uses",
    // generic work verbs
    "add", "adds", "adding", "added", "fix", "fixes", "fixing", "fixed", "update", "updates",
    "updating", "updated", "remove", "removes", "removing", "removed", "delete", "implement",
    "implements", "implementing", "implemented", "support", "supports", "create", "creates",
    "change", "changes", "improve", "improves", "improvement", "refactor", "handle", "handles",
    "ensure", "enable", "disable", "move", "rename", "cleanup", "clean", "get", "set", "new",
    "investigate", "write", "rewrite", "migrate", "bump", "upgrade",
    // generic tracker nouns
    "bug", "bugs", "issue", "issues", "feature", "features", "task", "tasks", "todo", "ticket",
    "problem", "error", "errors", "wip", "misc", "stuff", "thing", "things", "work", "broken",
    "doesn", "don", "isn", "wont", "cant",
];

const MIN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    /// Identifier-shaped token; always matched case-sensitively.
    pub symbol: bool,
}

impl Keyword {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            symbol: false,
        }
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            symbol: true,
        }
    }
}

pub fn is_stop_word(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Extract searchable keywords from a title, in first-seen order.
pub fn extract_keywords(title: &str) -> Vec<Keyword> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for raw in title.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-')) {
        let token = raw.trim_matches(|c: char| c == '-' || c == '_');
        if token.chars().count() < MIN_LEN {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if is_stop_word(token) {
            continue;
        }

        let kw = if looks_like_symbol(token) {
            Keyword::symbol(token)
        } else {
            Keyword::word(token.to_lowercase())
        };
        if seen.insert(kw.text.clone()) {
            out.push(kw);
        }
    }
    out
}

/// Identifier heuristics: inner capitals (`UserService`, `iOS`), separators
/// (`dark_mode`, `dark-mode`), or letters mixed with digits (`oauth2`).
pub fn looks_like_symbol(token: &str) -> bool {
    let has_lower = token.chars().any(|c| c.is_lowercase());
    let inner_upper = token.chars().skip(1).any(|c| c.is_uppercase());
    if has_lower && inner_upper {
        return true;
    }
    if token.contains('_') || token.contains('-') {
        return true;
    }
    let has_alpha = token.chars().any(|c| c.is_alphabetic());
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    has_alpha && has_digit
}

/// Lowercased keyword texts, for path and substring comparisons.
pub fn lowered(keywords: &[Keyword]) -> Vec<String> {
    keywords.iter().map(|k| k.text.to_lowercase()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(kws: &[Keyword]) -> Vec<&str> {
        kws.iter().map(|k| k.text.as_str()).collect()
    }

    #[test]
    fn drops_stop_words_and_short_tokens() {
        let kws = extract_keywords("Add dark mode toggle");
        assert_eq!(texts(&kws), vec!["dark", "mode", "toggle"]);
        assert!(kws.iter().all(|k| !k.symbol));
    }

    #[test]
    fn keeps_camel_case_as_symbol() {
        let kws = extract_keywords("Fix crash in UserService when token expires");
        assert!(kws.contains(&Keyword::symbol("UserService")));
        assert!(kws.contains(&Keyword::word("crash")));
        assert!(!texts(&kws).contains(&"fix"));
        assert!(!texts(&kws).contains(&"when"));
    }

    #[test]
    fn snake_kebab_and_alnum_are_symbols() {
        let kws = extract_keywords("rate_limit for oauth2 via retry-policy");
        assert!(kws.contains(&Keyword::symbol("rate_limit")));
        assert!(kws.contains(&Keyword::symbol("oauth2")));
        assert!(kws.contains(&Keyword::symbol("retry-policy")));
    }

    #[test]
    fn capitalised_plain_word_is_lowercased() {
        let kws = extract_keywords("Dashboard export");
        assert_eq!(texts(&kws), vec!["dashboard", "export"]);
    }

    #[test]
    fn numbers_and_duplicates_dropped() {
        let kws = extract_keywords("Cache cache 2024 #123 cache");
        assert_eq!(texts(&kws), vec!["cache"]);
    }

    #[test]
    fn all_stop_words_yields_nothing() {
        assert!(extract_keywords("Fix the bug").is_empty());
    }
}
