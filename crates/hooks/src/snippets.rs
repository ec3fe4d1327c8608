//! Embedded `jq -n` filters that build hook definitions.
//!
//! Installer and hook scripts often assemble the JSON they register with
//! the host through `jq -n --arg cmd "$CMD" '{type: "command", command: $cmd}'`.
//! The filter is the single-quoted argument; it may span several lines.

use crate::line_at;

/// A `jq` filter found in a script, with the 1-based line of the `jq` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSnippet {
    pub filter: String,
    pub line: usize,
}

/// Filters passed to `jq -n` (or `--null-input`) that mention a `type` or
/// `matcher` key. Other jq calls cannot describe a hook and are skipped.
pub fn extract_embedded_json_snippets(text: &str) -> Vec<EmbeddedSnippet> {
    let mut snippets = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("jq") {
        let start = cursor + offset;
        cursor = start + 2;

        let before = text[..start].chars().next_back();
        let after = text[cursor..].chars().next();
        if before.is_some_and(is_word_char) || !after.is_some_and(|c| c == ' ' || c == '\t') {
            continue;
        }

        let Some(open) = text[cursor..].find('\'') else {
            break;
        };
        let args = &text[cursor..cursor + open];
        if !is_single_command(args) || !has_null_input(args) {
            continue;
        }

        let body = cursor + open + 1;
        let Some(close) = text[body..].find('\'') else {
            break;
        };
        let filter = &text[body..body + close];
        cursor = body + close + 1;

        if declares_hook_field(filter) {
            snippets.push(EmbeddedSnippet {
                filter: filter.to_string(),
                line: line_at(text, start),
            });
        }
    }

    snippets
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// The flags before the filter belong to one shell command: newlines are
/// escaped and no separator or pipe intervenes.
fn is_single_command(args: &str) -> bool {
    let mut lines = args.split('\n').collect::<Vec<_>>();
    lines.pop();
    lines.iter().all(|line| line.trim_end().ends_with('\\'))
        && !args.contains([';', '|', '&', '>', '<'])
}

fn has_null_input(args: &str) -> bool {
    args.split_whitespace().any(|token| {
        token == "--null-input"
            || (token.starts_with('-')
                && !token.starts_with("--")
                && token[1..].chars().all(|c| c.is_ascii_alphabetic())
                && token.contains('n'))
    })
}

fn declares_hook_field(filter: &str) -> bool {
    ["type", "matcher"].iter().any(|key| {
        filter.match_indices(key).any(|(idx, _)| {
            let before = filter[..idx].chars().next_back();
            let rest = filter[idx + key.len()..].trim_start_matches('"').trim_start();
            !before.is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$'))
                && rest.starts_with(':')
        })
    })
}

enum Scope {
    Code { depth: usize },
    Str,
}

/// Replace every jq variable reference outside string text with a neutral
/// string literal, so the filter evaluates without `--arg` bindings.
///
/// String interpolations (`"\($x)"`) are code and are rewritten too.
/// Variables named like a timeout become a number instead, keeping a
/// parameterized `timeout` field numeric. Object shorthand (`{$cmd}`) is
/// expanded to `cmd: <placeholder>` so the key survives.
pub fn substitute_placeholders(filter: &str) -> String {
    let mut out = String::with_capacity(filter.len());
    let mut scopes = vec![Scope::Code { depth: 0 }];
    // Open `{` and `[` in code, innermost last.
    let mut brackets = Vec::new();
    let mut chars = filter.chars().peekable();

    while let Some(c) = chars.next() {
        match scopes.last_mut() {
            Some(Scope::Str) => {
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            out.push(next);
                            if next == '(' {
                                scopes.push(Scope::Code { depth: 0 });
                            }
                        }
                    },
                    '"' => {
                        scopes.pop();
                    },
                    _ => {},
                }
            },
            Some(Scope::Code { depth }) => match c {
                '"' => {
                    out.push(c);
                    scopes.push(Scope::Str);
                },
                '(' => {
                    *depth += 1;
                    out.push(c);
                },
                '{' | '[' => {
                    brackets.push(c);
                    out.push(c);
                },
                '}' | ']' => {
                    brackets.pop();
                    out.push(c);
                },
                ')' => {
                    if *depth > 0 {
                        *depth -= 1;
                    } else if scopes.len() > 1 {
                        scopes.pop();
                    }
                    out.push(c);
                },
                '$' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        let continues = next.is_ascii_alphanumeric()
                            || next == '_'
                            || (next == '.' && name == "ENV");
                        if !continues {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        out.push('$');
                        continue;
                    }
                    let shorthand = brackets.last() == Some(&'{')
                        && !name.contains('.')
                        && out.trim_end().ends_with(['{', ',']);
                    if shorthand {
                        out.push_str(&format!("{name}: "));
                    }
                    if name.to_ascii_lowercase().contains("timeout") {
                        out.push_str("60");
                    } else {
                        out.push_str(&format!("\"<{name}>\""));
                    }
                },
                _ => out.push(c),
            },
            None => out.push(c),
        }
    }

    out
}
