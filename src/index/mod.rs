// Index storage, schema and the records that flow into it

pub mod schema;
pub mod db;

use std::path::PathBuf;

/// An indexed file. Identity is `path`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct File {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub extension: String,
    pub module: Option<String>,
    pub modified_at: f64,
    pub indexed_at: Option<f64>,
}

/// File row as produced by the scanner, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub module: Option<String>,
    pub modified_at: f64,
}

/// A build module, identified by its dotted name
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub module_type: ModuleType,
}

/// A discovered module with the dependencies its descriptor declares
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub name: String,
    pub path: String,
    pub module_type: ModuleType,
    pub dependencies: Vec<DeclaredDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredDependency {
    pub name: String,
    pub kind: DependencyKind,
}

/// One-hop dependency edge as seen from either end
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModuleDependency {
    /// The declaring module for dependents lookups, the target for dependency lookups
    pub module_name: String,
    pub dep_type: DependencyKind,
}

/// A persisted symbol joined with its owning file
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub name: String,
    pub kind: SymbolKind,
    pub file_id: i64,
    pub start_line: u32,
    pub end_line: u32,
    pub signature: Option<String>,
    pub parent_symbol_id: Option<i64>,
    pub visibility: Option<Visibility>,
    pub file_path: String,
    pub module: Option<String>,
}

/// Declared supertype of a class-like symbol. `parent_name` is raw text and may
/// name a type that is not in the index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InheritanceEdge {
    pub parent_name: String,
    pub kind: InheritanceKind,
}

/// A symbol that declares a given parent type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Inheritor {
    pub symbol: Symbol,
    pub kind: InheritanceKind,
}

/// One-level hierarchy around a class-like symbol
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassHierarchy {
    pub symbol: Symbol,
    pub parents: Vec<InheritanceEdge>,
    pub children: Vec<Inheritor>,
}

/// Lexical usage of a known symbol name
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolReference {
    pub symbol_name: String,
    pub file_id: i64,
    pub file_path: String,
    pub module: Option<String>,
    pub line: u32,
    pub context: UsageContext,
}

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Interface,
    Object,
    Enum,
    Function,
    Property,
}

impl SymbolKind {
    pub const CLASS_LIKE: [SymbolKind; 4] = [
        SymbolKind::Class,
        SymbolKind::Interface,
        SymbolKind::Object,
        SymbolKind::Enum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Object => "object",
            SymbolKind::Enum => "enum",
            SymbolKind::Function => "function",
            SymbolKind::Property => "property",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "class" => Ok(SymbolKind::Class),
            "interface" => Ok(SymbolKind::Interface),
            "object" => Ok(SymbolKind::Object),
            "enum" => Ok(SymbolKind::Enum),
            "function" => Ok(SymbolKind::Function),
            "property" => Ok(SymbolKind::Property),
            _ => anyhow::bail!("Unknown symbol kind: {}", s),
        }
    }

    /// Class, interface, object or enum
    pub fn is_class_like(&self) -> bool {
        Self::CLASS_LIKE.contains(self)
    }
}

/// Visibility modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "protected" => Some(Visibility::Protected),
            "internal" => Some(Visibility::Internal),
            _ => None,
        }
    }
}

/// Module classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Api,
    Impl,
    Stub,
    App,
    Lib,
    Module,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Api => "api",
            ModuleType::Impl => "impl",
            ModuleType::Stub => "stub",
            ModuleType::App => "app",
            ModuleType::Lib => "lib",
            ModuleType::Module => "module",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "api" => Ok(ModuleType::Api),
            "impl" => Ok(ModuleType::Impl),
            "stub" => Ok(ModuleType::Stub),
            "app" => Ok(ModuleType::App),
            "lib" => Ok(ModuleType::Lib),
            "module" => Ok(ModuleType::Module),
            _ => anyhow::bail!("Unknown module type: {}", s),
        }
    }
}

/// Gradle dependency configurations that produce module edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DependencyKind {
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "implementation")]
    Implementation,
    #[serde(rename = "testImplementation")]
    TestImplementation,
    #[serde(rename = "androidTestImplementation")]
    AndroidTestImplementation,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Api => "api",
            DependencyKind::Implementation => "implementation",
            DependencyKind::TestImplementation => "testImplementation",
            DependencyKind::AndroidTestImplementation => "androidTestImplementation",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "api" => Ok(DependencyKind::Api),
            "implementation" => Ok(DependencyKind::Implementation),
            "testImplementation" => Ok(DependencyKind::TestImplementation),
            "androidTestImplementation" => Ok(DependencyKind::AndroidTestImplementation),
            _ => anyhow::bail!("Unknown dependency type: {}", s),
        }
    }
}

/// Inheritance edge kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceKind {
    Extends,
    Implements,
}

impl InheritanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritanceKind::Extends => "extends",
            InheritanceKind::Implements => "implements",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "extends" => Ok(InheritanceKind::Extends),
            "implements" => Ok(InheritanceKind::Implements),
            _ => anyhow::bail!("Unknown inheritance type: {}", s),
        }
    }
}

/// Heuristic usage context of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageContext {
    Call,
    Inheritance,
    Instantiation,
    Generic,
    Reference,
}

impl UsageContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageContext::Call => "call",
            UsageContext::Inheritance => "inheritance",
            UsageContext::Instantiation => "instantiation",
            UsageContext::Generic => "generic",
            UsageContext::Reference => "reference",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "call" => Ok(UsageContext::Call),
            "inheritance" => Ok(UsageContext::Inheritance),
            "instantiation" => Ok(UsageContext::Instantiation),
            "generic" => Ok(UsageContext::Generic),
            "reference" => Ok(UsageContext::Reference),
            _ => anyhow::bail!("Unknown usage context: {}", s),
        }
    }
}

/// How a layout, menu or navigation file names a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XmlUsageKind {
    /// `<com.example.ui.ChartView ...>`
    ViewTag,
    /// `<view class="com.example.ui.ChartView">`
    ViewClassAttr,
    /// `android:name="..."` or any class attribute of a `<fragment>`
    Fragment,
}

impl XmlUsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            XmlUsageKind::ViewTag => "view_tag",
            XmlUsageKind::ViewClassAttr => "view_class_attr",
            XmlUsageKind::Fragment => "fragment",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "view_tag" => Ok(XmlUsageKind::ViewTag),
            "view_class_attr" => Ok(XmlUsageKind::ViewClassAttr),
            "fragment" => Ok(XmlUsageKind::Fragment),
            _ => anyhow::bail!("Unknown XML usage type: {}", s),
        }
    }
}

/// A fully qualified class named in layout XML
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct XmlUsage {
    pub class_name: String,
    pub file_id: i64,
    pub file_path: String,
    pub module: Option<String>,
    pub line: u32,
    pub kind: XmlUsageKind,
    /// `android:id` of the element, when it declares one
    pub element_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundXmlUsage {
    pub class_name: String,
    pub line: u32,
    pub kind: XmlUsageKind,
    pub element_id: Option<String>,
}

/// Android resource types that are defined and referenced by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Drawable,
    String,
    Color,
    Dimen,
    Style,
    Layout,
    Id,
    Mipmap,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Drawable => "drawable",
            ResourceKind::String => "string",
            ResourceKind::Color => "color",
            ResourceKind::Dimen => "dimen",
            ResourceKind::Style => "style",
            ResourceKind::Layout => "layout",
            ResourceKind::Id => "id",
            ResourceKind::Mipmap => "mipmap",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "drawable" => Ok(ResourceKind::Drawable),
            "string" => Ok(ResourceKind::String),
            "color" => Ok(ResourceKind::Color),
            "dimen" => Ok(ResourceKind::Dimen),
            "style" => Ok(ResourceKind::Style),
            "layout" => Ok(ResourceKind::Layout),
            "id" => Ok(ResourceKind::Id),
            "mipmap" => Ok(ResourceKind::Mipmap),
            _ => anyhow::bail!("Unknown resource type: {}", s),
        }
    }
}

/// A resource definition joined with its owning file
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Resource {
    pub id: i64,
    pub kind: ResourceKind,
    pub name: String,
    pub file_id: i64,
    pub file_path: String,
    pub module: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundResource {
    pub kind: ResourceKind,
    pub name: String,
    pub line: u32,
}

/// Where a resource reference was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOrigin {
    /// `R.type.name` in Kotlin or Java
    Code,
    /// `@type/name` in XML
    Xml,
}

impl ResourceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOrigin::Code => "code",
            ResourceOrigin::Xml => "xml",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "code" => Ok(ResourceOrigin::Code),
            "xml" => Ok(ResourceOrigin::Xml),
            _ => anyhow::bail!("Unknown resource usage origin: {}", s),
        }
    }
}

/// A reference to a defined resource. Matched by (type, name) text against
/// the definitions known when the file was scanned.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceUsage {
    pub kind: ResourceKind,
    pub name: String,
    pub file_id: i64,
    pub file_path: String,
    pub module: Option<String>,
    pub line: u32,
    pub origin: ResourceOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundResourceUsage {
    pub kind: ResourceKind,
    pub name: String,
    pub line: u32,
    pub origin: ResourceOrigin,
}

/// A symbol produced by an extractor, before it has a row id.
///
/// `parent` is an index into the same extraction output; parents always
/// precede their children.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub signature: Option<String>,
    pub visibility: Option<Visibility>,
    pub parent: Option<usize>,
    pub supertypes: Vec<InheritanceEdge>,
}

/// A reference found by the lexical scanner
#[derive(Debug, Clone, PartialEq)]
pub struct FoundReference {
    pub symbol_name: String,
    pub line: u32,
    pub context: UsageContext,
}

/// Errors raised while turning file content into symbols
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Grammar for {language} is incompatible with the linked tree-sitter: {source}")]
    Grammar {
        language: &'static str,
        source: tree_sitter::LanguageError,
    },

    #[error("Failed to parse {language} source")]
    Parse { language: &'static str },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extraction strategy, fixed when an extractor is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Grammar,
    Regex,
}

/// Converts file content into an ordered sequence of symbols
pub trait SymbolExtractor {
    fn strategy(&self) -> Strategy;
    fn extract(&self, content: &str) -> Result<Vec<ExtractedSymbol>, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_names() {
        assert_eq!(SymbolKind::from_str("interface").unwrap(), SymbolKind::Interface);
        assert_eq!(DependencyKind::from_str("androidTestImplementation").unwrap().as_str(), "androidTestImplementation");
        assert!(ModuleType::from_str("service").is_err());
        assert_eq!(Visibility::from_str("package"), None);
        assert_eq!(ResourceKind::from_str("dimen").unwrap(), ResourceKind::Dimen);
        assert!(ResourceKind::from_str("raw").is_err());
        assert_eq!(ResourceOrigin::from_str("xml").unwrap(), ResourceOrigin::Xml);
    }

    #[test]
    fn test_class_like() {
        assert!(SymbolKind::Object.is_class_like());
        assert!(SymbolKind::Enum.is_class_like());
        assert!(!SymbolKind::Function.is_class_like());
        assert!(!SymbolKind::Property.is_class_like());
    }

    #[test]
    fn test_serde_names_match_store_names() {
        let json = serde_json::to_string(&DependencyKind::TestImplementation).unwrap();
        assert_eq!(json, "\"testImplementation\"");
        let json = serde_json::to_string(&UsageContext::Instantiation).unwrap();
        assert_eq!(json, "\"instantiation\"");
        let json = serde_json::to_string(&XmlUsageKind::ViewClassAttr).unwrap();
        assert_eq!(json, format!("\"{}\"", XmlUsageKind::ViewClassAttr.as_str()));
        let json = serde_json::to_string(&ResourceKind::Mipmap).unwrap();
        assert_eq!(json, "\"mipmap\"");
    }
}
