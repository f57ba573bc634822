// Supertype extraction for class-like declarations

use tree_sitter::Node;

use super::parser::{find_child_by_kind, node_text};
use crate::index::{InheritanceEdge, InheritanceKind};

/// Supertypes of a Kotlin `class_declaration` or `object_declaration`.
///
/// Kotlin lists superclass and interfaces after a single `:`, so without type
/// resolution every entry is recorded as `extends`.
pub fn kotlin_supertypes(node: &Node, source: &[u8]) -> Vec<InheritanceEdge> {
    let mut edges = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "delegation_specifiers" {
            continue;
        }
        let mut spec_cursor = child.walk();
        for specifier in child.named_children(&mut spec_cursor) {
            if let Some(name) = kotlin_type_name(&specifier, source) {
                push_edge(&mut edges, name, InheritanceKind::Extends);
            }
        }
    }

    edges
}

/// Supertypes of a Java class, interface, enum or record declaration
pub fn java_supertypes(node: &Node, source: &[u8]) -> Vec<InheritanceEdge> {
    let mut edges = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            // class Foo extends Bar
            "superclass" => {
                let mut inner = child.walk();
                for type_node in child.named_children(&mut inner) {
                    if let Some(name) = java_type_name(&type_node, source) {
                        push_edge(&mut edges, name, InheritanceKind::Extends);
                    }
                }
            }
            // class Foo implements A, B
            "super_interfaces" => {
                for name in type_list_names(&child, source) {
                    push_edge(&mut edges, name, InheritanceKind::Implements);
                }
            }
            // interface Foo extends A, B
            "extends_interfaces" => {
                for name in type_list_names(&child, source) {
                    push_edge(&mut edges, name, InheritanceKind::Extends);
                }
            }
            _ => {}
        }
    }

    edges
}

fn type_list_names(clause: &Node, source: &[u8]) -> Vec<String> {
    let Some(list) = find_child_by_kind(clause, "type_list") else {
        return Vec::new();
    };

    let mut cursor = list.walk();
    let names = list
        .named_children(&mut cursor)
        .filter_map(|type_node| java_type_name(&type_node, source))
        .collect();
    names
}

/// Base name of a Java type: `Foo`, `a.b.Foo` and `Foo<T>` all give `Foo`
fn java_type_name(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "type_identifier" => node_text(node, source),
        "scoped_type_identifier" => last_child_of_kind(node, "type_identifier", source),
        "generic_type" => {
            let mut cursor = node.walk();
            let base = node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
            java_type_name(&base, source)
        }
        _ => None,
    }
}

/// Base name of a Kotlin delegation specifier.
///
/// Handles `Base()`, `Iface`, `Iface by delegate`, `pkg.Base` and `Base<T>`.
fn kotlin_type_name(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "user_type" => last_child_of_kind(node, "identifier", source)
            .or_else(|| last_child_of_kind(node, "type_identifier", source)),
        "identifier" | "type_identifier" => node_text(node, source),
        "delegation_specifier" | "constructor_invocation" | "explicit_delegation" => {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find_map(|child| kotlin_type_name(&child, source));
            found
        }
        _ => None,
    }
}

fn last_child_of_kind(node: &Node, kind: &str, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let last = node.named_children(&mut cursor).filter(|c| c.kind() == kind).last();
    last.and_then(|n| node_text(&n, source))
}

fn push_edge(edges: &mut Vec<InheritanceEdge>, parent_name: String, kind: InheritanceKind) {
    // The store keys edges on (symbol, parent name); keep the first kind seen
    if edges.iter().any(|e| e.parent_name == parent_name) {
        return;
    }
    edges.push(InheritanceEdge { parent_name, kind });
}
