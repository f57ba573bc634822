use anyhow::Result;
use std::path::Path;

use kindex::index::{
    File, Inheritor, Module, ModuleDependency, Resource, ResourceKind, ResourceUsage, Symbol,
    SymbolKind,
};
use kindex::indexer::android::parse_resource_reference;
use kindex::query::engine::{ClassUsages, ModuleTreeNode};

use super::{open_engine, print_json, OutputFormat};

pub fn search(project: &Path, query: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let results = engine.search_all(query, limit)?;

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No results for '{}'", query);
                return Ok(());
            }
            if !results.modules.is_empty() {
                println!("Modules:");
                print_modules(&results.modules);
            }
            if !results.symbols.is_empty() {
                println!("Symbols:");
                print_symbols(&results.symbols);
            }
            if !results.files.is_empty() {
                println!("Files:");
                print_files(&results.files);
            }
        }
    }
    Ok(())
}

pub fn find_files(
    project: &Path,
    query: &str,
    limit: usize,
    fts: bool,
    format: OutputFormat,
) -> Result<()> {
    let engine = open_engine(project)?;
    let files = if fts {
        engine.db().search_files_fts(query, limit)?
    } else {
        engine.db().search_files(query, limit)?
    };

    match format {
        OutputFormat::Json => print_json(&files)?,
        OutputFormat::Text if files.is_empty() => println!("No files matching '{}'", query),
        OutputFormat::Text => print_files(&files),
    }
    Ok(())
}

pub fn find_symbols(
    project: &Path,
    query: &str,
    kind: Option<&str>,
    limit: usize,
    fts: bool,
    format: OutputFormat,
) -> Result<()> {
    let kind = kind.map(SymbolKind::from_str).transpose()?;
    let engine = open_engine(project)?;
    let symbols = if fts {
        engine.db().search_symbols_fts(query, kind, limit)?
    } else {
        engine.db().search_symbols(query, kind, limit)?
    };

    print_symbol_results(&symbols, format, query)
}

pub fn find_classes(project: &Path, name: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let classes = engine.find_classes(name, limit)?;
    print_symbol_results(&classes, format, name)
}

pub fn outline(project: &Path, path: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let symbols = engine.outline(path)?;

    match format {
        OutputFormat::Json => print_json(&symbols)?,
        OutputFormat::Text if symbols.is_empty() => println!("No symbols indexed for {}", path),
        OutputFormat::Text => {
            println!("{}", path);
            print!("{}", render_outline(&symbols));
        }
    }
    Ok(())
}

pub fn find_modules(project: &Path, query: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let modules = engine.db().search_modules(query, limit)?;

    match format {
        OutputFormat::Json => print_json(&modules)?,
        OutputFormat::Text if modules.is_empty() => println!("No modules matching '{}'", query),
        OutputFormat::Text => print_modules(&modules),
    }
    Ok(())
}

pub fn dependencies(project: &Path, module: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let deps = engine.db().module_dependencies(module)?;
    print_dependencies(&deps, format, &format!("{} depends on", module))
}

pub fn dependents(project: &Path, module: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let deps = engine.db().module_dependents(module)?;
    print_dependencies(&deps, format, &format!("Modules depending on {}", module))
}

pub fn usages(project: &Path, symbol: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let found = engine.class_usages(symbol, limit)?;

    match format {
        OutputFormat::Json => print_json(&found)?,
        OutputFormat::Text if found.is_empty() => println!("No usages of {}", symbol),
        OutputFormat::Text => print!("{}", render_class_usages(symbol, &found)),
    }
    Ok(())
}

pub fn find_resources(
    project: &Path,
    query: &str,
    kind: Option<&str>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let kind = kind.map(ResourceKind::from_str).transpose()?;
    let engine = open_engine(project)?;
    let resources = engine.db().search_resources(query, kind, limit)?;

    match format {
        OutputFormat::Json => print_json(&resources)?,
        OutputFormat::Text if resources.is_empty() => {
            println!("No resources matching '{}'", query)
        }
        OutputFormat::Text => print_resources(&resources),
    }
    Ok(())
}

pub fn resource_usages(
    project: &Path,
    reference: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let Some((kind, name)) = parse_resource_reference(reference) else {
        anyhow::bail!(
            "Unrecognised resource reference '{}', expected e.g. @string/app_name or R.string.app_name",
            reference
        );
    };
    let engine = open_engine(project)?;
    let usages = engine.db().resource_usages(kind, &name, limit)?;

    match format {
        OutputFormat::Json => print_json(&usages)?,
        OutputFormat::Text if usages.is_empty() => {
            println!("No usages of @{}/{}", kind.as_str(), name)
        }
        OutputFormat::Text => print!("{}", render_resource_usages(kind, &name, &usages)),
    }
    Ok(())
}

pub fn unused_resources(project: &Path, module: Option<&str>, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let resources = engine.db().unused_resources(module)?;

    match format {
        OutputFormat::Json => print_json(&resources)?,
        OutputFormat::Text if resources.is_empty() => println!("No unused resources"),
        OutputFormat::Text => {
            println!("{} unused resources:", resources.len());
            print_resources(&resources);
        }
    }
    Ok(())
}

pub fn implementations(project: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let found = engine.db().implementations(name)?;

    match format {
        OutputFormat::Json => print_json(&found)?,
        OutputFormat::Text if found.is_empty() => println!("No implementations of {}", name),
        OutputFormat::Text => {
            println!("Implementations of {}:", name);
            print_inheritors(&found);
        }
    }
    Ok(())
}

pub fn hierarchy(project: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let Some(found) = engine.db().class_hierarchy(name)? else {
        println!("No class-like symbol named {}", name);
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&found)?,
        OutputFormat::Text => {
            println!(
                "{} {}  {}:{}",
                found.symbol.kind.as_str(),
                found.symbol.name,
                found.symbol.file_path,
                found.symbol.start_line
            );
            if !found.parents.is_empty() {
                println!("Parents:");
                for parent in &found.parents {
                    println!("  {} {}", parent.kind.as_str(), parent.parent_name);
                }
            }
            if !found.children.is_empty() {
                println!("Children:");
                print_inheritors(&found.children);
            }
        }
    }
    Ok(())
}

pub fn module_tree(project: &Path, format: OutputFormat) -> Result<()> {
    let engine = open_engine(project)?;
    let tree = engine.module_tree()?;

    match format {
        OutputFormat::Json => print_json(&tree)?,
        OutputFormat::Text if tree.is_empty() => println!("No modules indexed"),
        OutputFormat::Text => print!("{}", render_tree(&tree)),
    }
    Ok(())
}

fn print_symbol_results(symbols: &[Symbol], format: OutputFormat, query: &str) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&symbols)?,
        OutputFormat::Text if symbols.is_empty() => println!("No symbols matching '{}'", query),
        OutputFormat::Text => print_symbols(symbols),
    }
    Ok(())
}

fn print_dependencies(deps: &[ModuleDependency], format: OutputFormat, title: &str) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&deps)?,
        OutputFormat::Text => {
            println!("{} ({}):", title, deps.len());
            for dep in deps {
                println!("  {:<28} {}", dep.dep_type.as_str(), dep.module_name);
            }
        }
    }
    Ok(())
}

fn print_files(files: &[File]) {
    for file in files {
        println!(
            "  {}  [{}]",
            file.path,
            file.module.as_deref().unwrap_or("-")
        );
    }
}

fn print_modules(modules: &[Module]) {
    for module in modules {
        println!("  {:<40} {}", module.name, module.module_type.as_str());
    }
}

fn print_symbols(symbols: &[Symbol]) {
    for symbol in symbols {
        println!(
            "  {:<9} {}{}  {}:{}",
            symbol.kind.as_str(),
            symbol.name,
            symbol.signature.as_deref().unwrap_or(""),
            symbol.file_path,
            symbol.start_line
        );
    }
}

fn print_inheritors(found: &[Inheritor]) {
    for inheritor in found {
        println!(
            "  {} {} ({})  {}:{}",
            inheritor.symbol.kind.as_str(),
            inheritor.symbol.name,
            inheritor.kind.as_str(),
            inheritor.symbol.file_path,
            inheritor.symbol.start_line
        );
    }
}

fn print_resources(resources: &[Resource]) {
    for resource in resources {
        println!(
            "  @{}/{}  {}:{}",
            resource.kind.as_str(),
            resource.name,
            resource.file_path,
            resource.line
        );
    }
}

fn render_resource_usages(kind: ResourceKind, name: &str, usages: &[ResourceUsage]) -> String {
    let mut out = format!("{} usages of @{}/{}:\n", usages.len(), kind.as_str(), name);
    for usage in usages {
        out.push_str(&format!(
            "  {}:{}  {}\n",
            usage.file_path,
            usage.line,
            usage.origin.as_str()
        ));
    }
    out
}

fn render_class_usages(name: &str, found: &ClassUsages) -> String {
    let mut out = String::new();
    if !found.references.is_empty() {
        out.push_str(&format!("{} usages of {}:\n", found.references.len(), name));
        for r in &found.references {
            out.push_str(&format!("  {}:{}  {}\n", r.file_path, r.line, r.context.as_str()));
        }
    }
    if !found.layouts.is_empty() {
        out.push_str(&format!("{} layout usages:\n", found.layouts.len()));
        for usage in &found.layouts {
            let id = usage
                .element_id
                .as_deref()
                .map(|id| format!(" @id/{}", id))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {}:{}  {}{}\n",
                usage.file_path,
                usage.line,
                usage.kind.as_str(),
                id
            ));
        }
    }
    out
}

/// Symbols indented under their parents
fn render_outline(symbols: &[Symbol]) -> String {
    let mut out = String::new();
    for symbol in symbols {
        let mut depth = 0;
        let mut parent = symbol.parent_symbol_id;
        while let Some(id) = parent {
            depth += 1;
            parent = symbols
                .iter()
                .find(|s| s.id == id)
                .and_then(|s| s.parent_symbol_id);
        }
        out.push_str(&format!(
            "{}{} {}{}  L{}-{}\n",
            "  ".repeat(depth),
            symbol.kind.as_str(),
            symbol.name,
            symbol.signature.as_deref().unwrap_or(""),
            symbol.start_line,
            symbol.end_line
        ));
    }
    out
}

fn render_tree(nodes: &[ModuleTreeNode]) -> String {
    fn walk(nodes: &[ModuleTreeNode], depth: usize, out: &mut String) {
        for node in nodes {
            let kind = node
                .module
                .as_ref()
                .map(|m| format!(" ({})", m.module_type.as_str()))
                .unwrap_or_default();
            out.push_str(&format!("{}{}{}\n", "  ".repeat(depth), node.name, kind));
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(nodes, 0, &mut out);
    out
}
