// Symbol extraction: language selection and the tree-sitter strategy

use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Parser as TreeParser, Tree};
use tracing::{debug, warn};

use super::fallback::RegexExtractor;
use super::inheritance::{java_supertypes, kotlin_supertypes};
use crate::index::{ExtractError, ExtractedSymbol, Strategy, SymbolExtractor, SymbolKind, Visibility};

/// Source languages that get a symbol pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Kotlin,
    Java,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Kotlin, Language::Java];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Kotlin => "kotlin",
            Language::Java => "java",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("kt") => Some(Language::Kotlin),
            Some("java") => Some(Language::Java),
            _ => None,
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }
}

/// Extractors for every language, chosen once
pub struct ExtractorSet {
    extractors: HashMap<Language, Box<dyn SymbolExtractor + Send + Sync>>,
}

impl ExtractorSet {
    /// Use the grammar for each language when it loads, else the regex fallback
    pub fn new(use_grammar: bool) -> Self {
        let mut extractors = HashMap::new();

        for language in Language::ALL {
            let extractor: Box<dyn SymbolExtractor + Send + Sync> = if !use_grammar {
                Box::new(RegexExtractor::new(language))
            } else {
                match GrammarExtractor::new(language) {
                    Ok(grammar) => Box::new(grammar),
                    Err(e) => {
                        warn!("{}; using regex extraction for {}", e, language.name());
                        Box::new(RegexExtractor::new(language))
                    }
                }
            };
            debug!("{} extractor: {:?}", language.name(), extractor.strategy());
            extractors.insert(language, extractor);
        }

        Self { extractors }
    }

    pub fn get(&self, language: Language) -> Option<&(dyn SymbolExtractor + Send + Sync)> {
        self.extractors.get(&language).map(|e| e.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&(dyn SymbolExtractor + Send + Sync)> {
        Language::from_path(path).and_then(|language| self.get(language))
    }
}

/// Tree-sitter based extraction with nesting and supertypes
pub struct GrammarExtractor {
    language: Language,
    grammar: tree_sitter::Language,
}

impl GrammarExtractor {
    /// Fails when the grammar's ABI does not match the linked tree-sitter
    pub fn new(language: Language) -> Result<Self, ExtractError> {
        let grammar = language.grammar();
        TreeParser::new()
            .set_language(&grammar)
            .map_err(|source| ExtractError::Grammar {
                language: language.name(),
                source,
            })?;

        Ok(Self { language, grammar })
    }

    fn parse_tree(&self, content: &str) -> Result<Tree, ExtractError> {
        let mut parser = TreeParser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|source| ExtractError::Grammar {
                language: self.language.name(),
                source,
            })?;

        parser.parse(content, None).ok_or(ExtractError::Parse {
            language: self.language.name(),
        })
    }

    /// Pre-order walk. `parent` is the arena index of the nearest enclosing
    /// emitted symbol.
    fn walk(
        &self,
        node: Node,
        source: &[u8],
        parent: Option<usize>,
        symbols: &mut Vec<ExtractedSymbol>,
    ) {
        let first = symbols.len();
        match self.language {
            Language::Kotlin => kotlin_symbol(&node, source, parent, symbols),
            Language::Java => java_symbols(&node, source, parent, symbols),
        }

        let scope = if symbols.len() > first { Some(first) } else { parent };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, scope, symbols);
        }
    }
}

impl SymbolExtractor for GrammarExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Grammar
    }

    fn extract(&self, content: &str) -> Result<Vec<ExtractedSymbol>, ExtractError> {
        let tree = self.parse_tree(content)?;
        let mut symbols = Vec::new();
        self.walk(tree.root_node(), content.as_bytes(), None, &mut symbols);
        Ok(symbols)
    }
}

fn kotlin_symbol(
    node: &Node,
    source: &[u8],
    parent: Option<usize>,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    let (kind, name, signature) = match node.kind() {
        "class_declaration" => (
            kotlin_class_kind(node, source),
            find_child_by_kind(node, "identifier").and_then(|n| node_text(&n, source)),
            None,
        ),
        "object_declaration" => (
            SymbolKind::Object,
            find_child_by_kind(node, "identifier").and_then(|n| node_text(&n, source)),
            None,
        ),
        "function_declaration" => (
            SymbolKind::Function,
            find_child_by_kind(node, "identifier").and_then(|n| node_text(&n, source)),
            find_child_by_kind(node, "function_value_parameters").and_then(|n| node_text(&n, source)),
        ),
        "property_declaration" => {
            let declaration = find_child_by_kind(node, "variable_declaration");
            (
                SymbolKind::Property,
                declaration
                    .and_then(|d| find_child_by_kind(&d, "identifier"))
                    .and_then(|n| node_text(&n, source)),
                declaration.and_then(|d| kotlin_declared_type(&d, source)),
            )
        }
        _ => return,
    };

    let Some(name) = name else {
        return;
    };

    let supertypes = if kind.is_class_like() {
        kotlin_supertypes(node, source)
    } else {
        Vec::new()
    };

    symbols.push(ExtractedSymbol {
        kind,
        name,
        start_line: start_line(node),
        end_line: end_line(node),
        signature,
        visibility: kotlin_visibility(node, source),
        parent,
        supertypes,
    });
}

/// `interface` keyword or `enum` class modifier, else class
fn kotlin_class_kind(node: &Node, source: &[u8]) -> SymbolKind {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "interface" => return SymbolKind::Interface,
            "class" => break,
            _ => {}
        }
    }

    if let Some(modifiers) = find_child_by_kind(node, "modifiers") {
        let mut cursor = modifiers.walk();
        let is_enum = modifiers
            .children(&mut cursor)
            .any(|m| m.kind() == "class_modifier" && node_text(&m, source).as_deref() == Some("enum"));
        if is_enum {
            return SymbolKind::Enum;
        }
    }

    SymbolKind::Class
}

fn kotlin_declared_type(declaration: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = declaration.walk();
    let type_node = declaration
        .named_children(&mut cursor)
        .find(|c| c.kind().ends_with("_type"))?;
    node_text(&type_node, source)
}

fn kotlin_visibility(node: &Node, source: &[u8]) -> Option<Visibility> {
    let modifiers = find_child_by_kind(node, "modifiers")?;
    let visibility = find_child_by_kind(&modifiers, "visibility_modifier")?;
    node_text(&visibility, source).and_then(|text| Visibility::from_str(&text))
}

fn java_symbols(
    node: &Node,
    source: &[u8],
    parent: Option<usize>,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    let kind = match node.kind() {
        "class_declaration" | "record_declaration" => SymbolKind::Class,
        "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        "method_declaration" | "constructor_declaration" => SymbolKind::Function,
        "field_declaration" => {
            java_fields(node, source, parent, symbols);
            return;
        }
        _ => return,
    };

    let Some(name) = node
        .child_by_field_name("name")
        .and_then(|n| node_text(&n, source))
    else {
        return;
    };

    let signature = if kind == SymbolKind::Function {
        node.child_by_field_name("parameters")
            .and_then(|n| node_text(&n, source))
    } else {
        None
    };

    let supertypes = if kind.is_class_like() {
        java_supertypes(node, source)
    } else {
        Vec::new()
    };

    symbols.push(ExtractedSymbol {
        kind,
        name,
        start_line: start_line(node),
        end_line: end_line(node),
        signature,
        visibility: java_visibility(node),
        parent,
        supertypes,
    });
}

/// One property per declarator: `int a, b;` gives `a` and `b`
fn java_fields(node: &Node, source: &[u8], parent: Option<usize>, symbols: &mut Vec<ExtractedSymbol>) {
    let field_type = node
        .child_by_field_name("type")
        .and_then(|n| node_text(&n, source));
    let visibility = java_visibility(node);

    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let Some(name) = declarator
            .child_by_field_name("name")
            .and_then(|n| node_text(&n, source))
        else {
            continue;
        };

        symbols.push(ExtractedSymbol {
            kind: SymbolKind::Property,
            name,
            start_line: start_line(node),
            end_line: end_line(node),
            signature: field_type.clone(),
            visibility,
            parent,
            supertypes: Vec::new(),
        });
    }
}

fn java_visibility(node: &Node) -> Option<Visibility> {
    let modifiers = find_child_by_kind(node, "modifiers")?;
    let mut cursor = modifiers.walk();
    let found = modifiers
        .children(&mut cursor)
        .find_map(|child| match child.kind() {
            "public" | "private" | "protected" => Visibility::from_str(child.kind()),
            _ => None,
        });
    found
}

fn start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: &Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// First direct child of the given kind
pub fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            if cursor.node().kind() == kind {
                return Some(cursor.node());
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    None
}

pub fn node_text(node: &Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(|s| s.to_string())
}
