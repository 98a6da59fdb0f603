//! Plain-text cleanup for visitor supplied values.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)\s*>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n\t ]+").unwrap());
static OCTET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)%[a-f0-9]{2}").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

/// Reduce a value to a single line of plain text.
///
/// Removes `<script>`/`<style>` blocks with their content and any other
/// markup tags, escapes a stray `<` as `&lt;`, collapses runs of
/// whitespace to one space, trims, and removes percent-encoded octets.
pub fn sanitize_text_field(input: &str) -> String {
    let mut out = input.to_string();

    if out.contains('<') {
        out = SCRIPT_STYLE.replace_all(&out, "").into_owned();
        out = TAG.replace_all(&out, "").into_owned();
        out = out.replace('<', "&lt;");
    }

    out = WHITESPACE.replace_all(&out, " ").trim().to_string();

    if OCTET.is_match(&out) {
        // Removing one octet can expose another ("%%2541" -> "%41").
        while OCTET.is_match(&out) {
            out = OCTET.replace_all(&out, "").into_owned();
        }
        out = SPACES.replace_all(&out, " ").trim().to_string();
    }

    out
}
