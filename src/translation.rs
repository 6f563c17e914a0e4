use std::sync::LazyLock;

use regex::Regex;

static RE_MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid markup tag pattern"));
static RE_BACKTICK_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("invalid backtick pattern"));
static RE_SINGLE_QUOTE_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("invalid single quote pattern"));
static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

/// Normalizes a translation string for display.
///
/// Footnote markup such as `<sup foot_note=1>1</sup>` is dropped, `` `x` ``
/// becomes `"x"`, `'x'` becomes `x`, and whitespace is collapsed and trimmed.
pub fn clean_translation(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = RE_MARKUP_TAG.replace_all(raw, "").into_owned();
    let text = replace_until_stable(&RE_BACKTICK_QUOTE, text, "\"$1\"");
    let text = replace_until_stable(&RE_SINGLE_QUOTE_WRAP, text, "$1");
    let text = RE_WHITESPACE.replace_all(&text, " ");
    text.trim().to_owned()
}

// A single pass can leave a pair behind when an empty pair (`''`) precedes it.
fn replace_until_stable(re: &Regex, mut text: String, replacement: &str) -> String {
    while re.is_match(&text) {
        text = re.replace_all(&text, replacement).into_owned();
    }
    text
}
