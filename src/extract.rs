//! Markdown fence extraction & multi-JSON balanced-region detection (C3,
//! spec.md §4.3).
//!
//! This module only locates substrings; turning those substrings into
//! `Value`s (recursively running the full cascade over fence contents) is
//! `strategy`'s job, to avoid a circular dependency between the two.

/// A fenced code block found in raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct Fence {
    pub lang: Option<String>,
    pub content: String,
}

/// Finds every ` ```[lang]\n...\n``` ` block, including one left
/// unterminated at end-of-input (streaming input, spec.md §4.3).
pub fn find_markdown_fences(input: &str) -> Vec<Fence> {
    let mut fences = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel) = input[cursor..].find("```") {
        let start = cursor + rel;
        let after_marker = start + 3;
        let rest = &input[after_marker..];
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let first_line = &rest[..line_end];
        let is_lang_hint = !first_line.is_empty()
            && first_line
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '+');
        let lang = if is_lang_hint {
            Some(first_line.to_string())
        } else {
            None
        };
        let content_start = if is_lang_hint {
            (after_marker + line_end + 1).min(input.len())
        } else {
            after_marker
        };

        match input[content_start..].find("```") {
            Some(close_rel) => {
                let close = content_start + close_rel;
                fences.push(Fence {
                    lang,
                    content: input[content_start..close].to_string(),
                });
                cursor = close + 3;
            }
            None => {
                fences.push(Fence {
                    lang,
                    content: input[content_start..].to_string(),
                });
                break;
            }
        }
    }

    fences
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteKind {
    Double,
    Single,
    Backtick,
}

/// Scans for top-level balanced `{...}`/`[...]` regions, skipping
/// brackets that occur inside string literals. Returns byte ranges
/// `(start, end)` with `end` exclusive, in the order they appear.
///
/// String-literal skipping here is a coarse approximation of the fixing
/// state machine's quote handling (it does not special-case triple
/// quotes) — good enough to locate candidate regions; the fixing state
/// machine in `fixing` is what actually parses their contents
/// tolerantly.
pub fn find_balanced_regions(input: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = input.chars().collect();
    let mut byte_offsets: Vec<usize> = input.char_indices().map(|(i, _)| i).collect();
    byte_offsets.push(input.len());

    let mut regions = Vec::new();
    let mut depth = 0usize;
    let mut start_idx: Option<usize> = None;
    let mut quote: Option<QuoteKind> = None;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if let Some(kind) = quote {
            if c == '\\' {
                i += 2;
                continue;
            }
            let closes = matches!(
                (kind, c),
                (QuoteKind::Double, '"') | (QuoteKind::Single, '\'') | (QuoteKind::Backtick, '`')
            );
            if closes {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => quote = Some(QuoteKind::Double),
            '\'' => quote = Some(QuoteKind::Single),
            '`' => quote = Some(QuoteKind::Backtick),
            '{' | '[' => {
                if depth == 0 {
                    start_idx = Some(i);
                }
                depth += 1;
            }
            '}' | ']' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start_idx.take() {
                            regions.push((byte_offsets[s], byte_offsets[i + 1]));
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_single_fenced_block_with_lang() {
        let input = "here:\n```json\n{\"a\":1}\n```\ndone";
        let fences = find_markdown_fences(input);
        assert_eq!(fences.len(), 1);
        assert_eq!(fences[0].lang.as_deref(), Some("json"));
        assert_eq!(fences[0].content.trim(), "{\"a\":1}");
    }

    #[test]
    fn unterminated_trailing_fence_takes_rest_of_input() {
        let input = "```json\n{\"a\":";
        let fences = find_markdown_fences(input);
        assert_eq!(fences.len(), 1);
        assert_eq!(fences[0].content, "{\"a\":");
    }

    #[test]
    fn fence_without_lang_hint_keeps_first_line_in_content() {
        let input = "```\nhello\n```";
        let fences = find_markdown_fences(input);
        assert_eq!(fences[0].lang, None);
        assert_eq!(fences[0].content, "\nhello\n");
    }

    #[test]
    fn finds_two_disjoint_top_level_objects() {
        let input = r#"{"k":"v1"} {"k":"v2"}"#;
        let regions = find_balanced_regions(input);
        assert_eq!(regions.len(), 2);
        assert_eq!(&input[regions[0].0..regions[0].1], r#"{"k":"v1"}"#);
        assert_eq!(&input[regions[1].0..regions[1].1], r#"{"k":"v2"}"#);
    }

    #[test]
    fn nested_objects_are_not_separate_regions() {
        let input = r#"{"a":{"b":1}}"#;
        let regions = find_balanced_regions(input);
        assert_eq!(regions.len(), 1);
        assert_eq!(&input[regions[0].0..regions[0].1], input);
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let input = r#"{"a":"{not a brace}"}"#;
        let regions = find_balanced_regions(input);
        assert_eq!(regions.len(), 1);
        assert_eq!(&input[regions[0].0..regions[0].1], input);
    }
}
