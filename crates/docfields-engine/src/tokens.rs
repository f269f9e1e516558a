//! # Placeholder tokens
//!
//! Text-level operations on `{{name}}` tokens. Everything here works on the
//! raw content string and never parses markup: a token inside an attribute
//! value (`<img src="{{photo}}">`) is just as visible as one in running text.

use regex::{NoExpand, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::fields::{Field, FieldType};

/// Inline style given to inserted image placeholders
pub const IMAGE_PLACEHOLDER_STYLE: &str = "max-width: 200px; height: auto;";

pub const TOKEN_OPEN: &str = "{{";
pub const TOKEN_CLOSE: &str = "}}";

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Invalid token regex"))
}

/// The literal token for a field name
pub fn token(name: &str) -> String {
    format!("{TOKEN_OPEN}{name}{TOKEN_CLOSE}")
}

/// Distinct field names referenced by tokens in `content`.
///
/// Captures are trimmed and empty ones dropped. Names are returned in the
/// order they first appear.
pub fn extract_field_names(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for captures in token_regex().captures_iter(content) {
        let Some(capture) = captures.get(1) else {
            continue;
        };
        let name = capture.as_str().trim();
        if name.is_empty() || !seen.insert(name) {
            continue;
        }
        names.push(name.to_string());
    }

    names
}

/// Markup to splice into the document for a field.
///
/// Image fields become an `<img>` whose `src` is the token, so the token
/// survives as an attribute value; every other type is the bare token.
pub fn insertion_markup(field: &Field) -> String {
    match field.field_type {
        FieldType::Image => format!(
            r#"<img src="{}" alt="{}" style="{IMAGE_PLACEHOLDER_STYLE}" />"#,
            token(&field.name),
            html_escape::encode_double_quoted_attribute(field.display_text()),
        ),
        _ => token(&field.name),
    }
}

fn exact_token_pattern(name: &str) -> Regex {
    let pattern = format!(r"\{{\{{{}\}}\}}", regex::escape(name));
    Regex::new(&pattern).expect("escaped token pattern is always valid")
}

fn image_token_pattern(name: &str) -> Regex {
    let pattern = format!(r#"<img[^>]*src="\{{\{{{}\}}\}}"[^>]*>"#, regex::escape(name));
    Regex::new(&pattern).expect("escaped image pattern is always valid")
}

/// Rewrite every `{{old_name}}` to `{{new_name}}`.
///
/// `old_name` is matched literally and only as a whole token, so
/// `{{customer.name}}` is untouched when renaming `customer`. The new name
/// is inserted verbatim; `$` is not treated as a group reference.
pub fn rename_tokens(content: &str, old_name: &str, new_name: &str) -> String {
    let replacement = token(new_name);
    exact_token_pattern(old_name)
        .replace_all(content, NoExpand(&replacement))
        .into_owned()
}

/// Remove every occurrence of a field from `content`.
///
/// Image elements whose `src` is the token go first, then bare tokens.
pub fn strip_tokens(content: &str, name: &str) -> String {
    let without_images = image_token_pattern(name).replace_all(content, "");
    exact_token_pattern(name)
        .replace_all(&without_images, "")
        .into_owned()
}

/// Number of exact `{{name}}` occurrences in `content`
pub fn count_tokens(content: &str, name: &str) -> usize {
    content.matches(&token(name)).count()
}
