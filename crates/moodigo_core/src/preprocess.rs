//! crates/moodigo_core/src/preprocess.rs
//!
//! The fixed normalization chain applied to chat text before classification.

use once_cell::sync::Lazy;
use regex::Regex;

static CANNOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"can't|cannot").expect("valid regex"));
static WILL_NOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"won't|will not").expect("valid regex"));
static NEGATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"n't").expect("valid regex"));
static LINKS_AND_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\S+|@\w+|#\w+").expect("valid regex"));
static STRAY_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s!?.,]").expect("valid regex"));
static REPEATED_BANG: Lazy<Regex> = Lazy::new(|| Regex::new(r"!{2,}").expect("valid regex"));
static REPEATED_QUESTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?{2,}").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercases, expands contractions, strips links/mentions/hashtags,
/// normalizes punctuation and collapses whitespace.
///
/// Runs of `!` or `?` are squashed to exactly two characters.
pub fn preprocess_text(text: &str) -> String {
    let text = text.to_lowercase();
    let text = CANNOT.replace_all(&text, "cannot");
    let text = WILL_NOT.replace_all(&text, "will not");
    let text = NEGATION.replace_all(&text, " not");
    let text = LINKS_AND_TAGS.replace_all(&text, "");
    let text = STRAY_SYMBOLS.replace_all(&text, " ");
    let text = REPEATED_BANG.replace_all(&text, "!!");
    let text = REPEATED_QUESTION.replace_all(&text, "??");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(preprocess_text("  I Feel   SO\ttired \n"), "i feel so tired");
    }

    #[test]
    fn expands_contractions() {
        assert_eq!(preprocess_text("I can't sleep"), "i cannot sleep");
        assert_eq!(preprocess_text("It won't stop"), "it will not stop");
        assert_eq!(preprocess_text("I don't care"), "i do not care");
    }

    #[test]
    fn strips_links_mentions_and_hashtags() {
        assert_eq!(
            preprocess_text("look https://example.com/x @friend #sad www.site.org ok"),
            "look ok"
        );
    }

    #[test]
    fn normalizes_punctuation() {
        assert_eq!(preprocess_text("why???? no!!!!"), "why?? no!!");
        assert_eq!(preprocess_text("stressed :( really"), "stressed really");
        assert_eq!(preprocess_text("fine, thanks."), "fine, thanks.");
    }

    #[test]
    fn empty_or_symbol_only_input_becomes_empty() {
        assert_eq!(preprocess_text(""), "");
        assert_eq!(preprocess_text("   "), "");
        assert_eq!(preprocess_text(":) <> ~"), "");
    }
}
