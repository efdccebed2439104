//! Mention detection
//!
//! `@token` matching against group member names. The result is advisory: it
//! only decides who gets the "mentioned you" push and the mentions counter.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::shared::messaging::group::MemberName;

/// Pull `@tokens` out of a message body, normalised.
///
/// A token starts with `@` at the beginning of the text or after a character
/// that is not part of a word, and runs over letters (with any combining
/// marks), digits, `.`, `_`, `-`.
pub fn mention_tokens(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '@' {
            i += 1;
            continue;
        }
        let boundary = i == 0 || !is_token_char(chars[i - 1]);
        let start = i + 1;
        let mut end = start;
        while end < chars.len() && is_token_char(chars[end]) {
            end += 1;
        }
        if boundary && end > start {
            let raw: String = chars[start..end].iter().collect();
            let token = normalize(&raw);
            if !token.is_empty() && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        i = end.max(i + 1);
    }

    tokens
}

/// Members mentioned in `content`, in member order, never including the author.
pub fn extract_mentioned_user_ids(content: &str, members: &[MemberName], author_id: Uuid) -> Vec<Uuid> {
    let tokens = mention_tokens(content);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut mentioned = Vec::new();
    for member in members {
        if member.user_id == author_id || mentioned.contains(&member.user_id) {
            continue;
        }
        if tokens.iter().any(|token| name_matches(&member.name, token)) {
            mentioned.push(member.user_id);
        }
    }
    mentioned
}

fn name_matches(name: &str, token: &str) -> bool {
    let compact: String = name.split_whitespace().collect();
    if normalize(&compact).starts_with(token) {
        return true;
    }
    name.split_whitespace().any(|part| normalize(part).starts_with(token))
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c) || matches!(c, '.' | '_' | '-')
}

/// Lowercase, strip diacritics, drop `.`, `_` and `-`.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|&c| !is_combining_mark(c) && !matches!(c, '.' | '_' | '-'))
        .map(fold_stroke)
        .collect()
}

// letters with a stroke have no canonical decomposition
fn fold_stroke(c: char) -> char {
    match c {
        'ł' => 'l',
        'ø' => 'o',
        'đ' => 'd',
        'ħ' => 'h',
        other => other,
    }
}
