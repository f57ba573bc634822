// Line-anchored regex extraction, used when no grammar is available.
//
// Degraded on purpose: top-level declarations only, every parent is None and
// no supertypes are recorded.

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::Language;
use crate::index::{ExtractError, ExtractedSymbol, Strategy, SymbolExtractor, SymbolKind};

static KOTLIN_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?:(?:public|private|internal|protected|abstract|open|sealed|data|annotation|inner|value)\s+)*(class|interface|object|enum\s+class)\s+(\w+)",
    )
    .expect("valid regex")
});

// No leading whitespace: only zero-indent functions match
static KOTLIN_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?:(?:public|private|internal|protected|override|suspend|inline|operator)\s+)*fun\s+(?:<[^>]+>\s+)?(\w+)\s*\(([^)]*)\)",
    )
    .expect("valid regex")
});

static JAVA_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?:(?:public|private|protected|abstract|final|static)\s+)*(class|interface|enum)\s+(\w+)",
    )
    .expect("valid regex")
});

pub struct RegexExtractor {
    language: Language,
}

impl RegexExtractor {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl SymbolExtractor for RegexExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Regex
    }

    fn extract(&self, content: &str) -> Result<Vec<ExtractedSymbol>, ExtractError> {
        let lines = LineIndex::new(content);
        let mut symbols = Vec::new();

        let classes = match self.language {
            Language::Kotlin => &*KOTLIN_CLASS,
            Language::Java => &*JAVA_CLASS,
        };

        for caps in classes.captures_iter(content) {
            let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            symbols.push(top_level(
                class_kind(keyword.as_str()),
                name.as_str(),
                lines.line_of(keyword.start()),
                None,
            ));
        }

        if self.language == Language::Kotlin {
            for caps in KOTLIN_FUNCTION.captures_iter(content) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let params = caps.get(2).map_or("", |m| m.as_str());
                symbols.push(top_level(
                    SymbolKind::Function,
                    name.as_str(),
                    lines.line_of(whole.start()),
                    Some(format!("({})", params)),
                ));
            }
        }

        symbols.sort_by_key(|s| s.start_line);
        Ok(symbols)
    }
}

fn class_kind(keyword: &str) -> SymbolKind {
    if keyword.starts_with("enum") {
        SymbolKind::Enum
    } else {
        match keyword {
            "interface" => SymbolKind::Interface,
            "object" => SymbolKind::Object,
            _ => SymbolKind::Class,
        }
    }
}

fn top_level(kind: SymbolKind, name: &str, line: u32, signature: Option<String>) -> ExtractedSymbol {
    ExtractedSymbol {
        kind,
        name: name.to_string(),
        start_line: line,
        end_line: line,
        signature,
        visibility: None,
        parent: None,
        supertypes: Vec::new(),
    }
}

/// Byte offset to 1-based line number
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> u32 {
        let index = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        index as u32 + 1
    }
}
