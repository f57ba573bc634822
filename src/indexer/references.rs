// Lexical usage scan against a snapshot of known class-like names.
//
// No scope awareness: any identifier spelled like a known symbol is recorded.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::index::{FoundReference, UsageContext};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

/// Characters after the match searched for `(`
const CALL_WINDOW: usize = 20;
/// Characters after the match searched for `>`
const GENERIC_WINDOW: usize = 10;

/// Scans file content for occurrences of known symbol names
pub struct ReferenceScanner<'a> {
    known: &'a HashSet<String>,
}

impl<'a> ReferenceScanner<'a> {
    pub fn new(known: &'a HashSet<String>) -> Self {
        Self { known }
    }

    pub fn scan(&self, content: &str) -> Vec<FoundReference> {
        if self.known.is_empty() {
            return Vec::new();
        }

        let mut refs = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if is_skipped_line(line) {
                continue;
            }

            for caps in IDENTIFIER.captures_iter(line) {
                let Some(m) = caps.get(1) else {
                    continue;
                };
                if !self.known.contains(m.as_str()) {
                    continue;
                }
                refs.push(FoundReference {
                    symbol_name: m.as_str().to_string(),
                    line: index as u32 + 1,
                    context: usage_context(line, m.start()),
                });
            }
        }

        refs
    }
}

/// Comment and import lines carry no usages
fn is_skipped_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("import ")
}

/// Classify the occurrence starting at byte `pos` of `line`
pub fn usage_context(line: &str, pos: usize) -> UsageContext {
    let before = line[..pos].trim_end();
    let after = line[pos..].trim_start();

    if window(after, CALL_WINDOW).contains('(') {
        UsageContext::Call
    } else if before.ends_with(':') || before.ends_with("extends") || before.ends_with("implements") {
        UsageContext::Inheritance
    } else if before.ends_with('=') || before.ends_with("new") {
        UsageContext::Instantiation
    } else if before.ends_with('<') || window(after, GENERIC_WINDOW).contains('>') {
        UsageContext::Generic
    } else {
        UsageContext::Reference
    }
}

/// First `chars` characters of `s`
fn window(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
