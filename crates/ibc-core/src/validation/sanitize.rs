//! Text sanitizer for untrusted request fields
//!
//! Strips markup and control characters while keeping the readable content:
//! - a `<` that never opens a tag is escaped to `&lt;`
//! - `<script>`/`<style>` blocks are removed with their content
//! - every other tag is removed, its inner text kept
//! - runs of spaces, tabs and line breaks collapse into one space
//! - remaining control characters are dropped and the result is trimmed

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script\s*>|<style[^>]*>.*?</style\s*>")
        .expect("script/style pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t ]+").expect("whitespace pattern is valid"));

pub fn sanitize_text(input: &str) -> String {
    let escaped = escape_unclosed_less_than(input);
    let without_blocks = SCRIPT_OR_STYLE.replace_all(&escaped, "");
    let without_tags = TAG.replace_all(&without_blocks, "");
    let collapsed = WHITESPACE_RUN.replace_all(&without_tags, " ");

    collapsed
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Escape every `<` that is not closed by a `>` before the next `<`.
fn escape_unclosed_less_than(input: &str) -> Cow<'_, str> {
    if !input.contains('<') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    let mut rest = input;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let opens_tag = match (after.find('>'), after.find('<')) {
            (Some(gt), Some(lt)) => gt < lt,
            (Some(_), None) => true,
            _ => false,
        };
        out.push_str(if opens_tag { "<" } else { "&lt;" });
        rest = after;
    }
    out.push_str(rest);

    Cow::Owned(out)
}
