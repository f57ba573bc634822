// Android layouts and resources: classes named in layout XML, resource
// definitions under res/, and R.type.name / @type/name references

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::index::{
    FoundResource, FoundResourceUsage, FoundXmlUsage, ResourceKind, ResourceOrigin, XmlUsageKind,
};

/// `<com.example.ui.ChartView`
static VIEW_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([a-z][a-z0-9_]*(?:\.[a-z][a-z0-9_]*)*\.[A-Z][a-zA-Z0-9_]*)").expect("valid regex")
});

/// `class="..."` or `android:name="..."` holding a qualified class name
static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(class|android:name)\s*=\s*["']([a-z][a-z0-9_]*(?:\.[a-z][a-z0-9_]*)*\.[A-Z][a-zA-Z0-9_]*)["']"#,
    )
    .expect("valid regex")
});

static ELEMENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"android:id\s*=\s*["']@\+?id/([^"']+)["']"#).expect("valid regex"));

static VALUE_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(string|color|dimen|style)\s+name="([^"]+)""#).expect("valid regex")
});

static CODE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bR\.(drawable|string|color|dimen|style|layout|id|mipmap)\.([a-zA-Z_][a-zA-Z0-9_]*)")
        .expect("valid regex")
});

static XML_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(drawable|string|color|dimen|style|layout|id|mipmap)/([a-zA-Z_][a-zA-Z0-9_]*)")
        .expect("valid regex")
});

/// Resource directory of a file below `res/`, without configuration
/// qualifiers: `app/src/main/res/layout-land/main.xml` is in `layout`
pub fn resource_dir(rel_path: &str) -> Option<&str> {
    let mut parts = rel_path.split('/');
    parts.by_ref().find(|part| *part == "res")?;
    let dir = parts.next()?;
    parts.next()?;
    dir.split('-').next()
}

/// Layout, menu and navigation XML are the files that name view classes
pub fn is_layout_xml(rel_path: &str) -> bool {
    rel_path.ends_with(".xml")
        && matches!(resource_dir(rel_path), Some("layout" | "menu" | "navigation"))
}

/// Classes named by the elements of a layout file.
///
/// An element's `android:id` is attached to every class usage of that
/// element, also when the attributes are spread over several lines.
pub fn scan_layout(content: &str) -> Vec<FoundXmlUsage> {
    let mut usages: Vec<FoundXmlUsage> = Vec::new();
    // Usages of the element still open at the end of the previous line
    let mut open: Vec<usize> = Vec::new();
    let mut element_id: Option<String> = None;
    let mut in_fragment = false;

    for (index, line) in content.lines().enumerate() {
        let line_no = index as u32 + 1;

        if line.contains('<') {
            open.clear();
            element_id = None;
            in_fragment = line.contains("<fragment");
        }

        if let Some(caps) = ELEMENT_ID.captures(line) {
            let id = caps[1].to_string();
            for &i in &open {
                if usages[i].element_id.is_none() {
                    usages[i].element_id = Some(id.clone());
                }
            }
            element_id = Some(id);
        }

        for caps in VIEW_TAG.captures_iter(line) {
            open.push(usages.len());
            usages.push(FoundXmlUsage {
                class_name: caps[1].to_string(),
                line: line_no,
                kind: XmlUsageKind::ViewTag,
                element_id: element_id.clone(),
            });
        }

        for caps in CLASS_ATTR.captures_iter(line) {
            let kind = if in_fragment || &caps[1] == "android:name" {
                XmlUsageKind::Fragment
            } else {
                XmlUsageKind::ViewClassAttr
            };
            open.push(usages.len());
            usages.push(FoundXmlUsage {
                class_name: caps[2].to_string(),
                line: line_no,
                kind,
                element_id: element_id.clone(),
            });
        }

        if line.contains('>') {
            open.clear();
            element_id = None;
        }
    }

    usages
}

/// Resources a file under `res/` defines: one per drawable, mipmap or
/// layout file (named after the file), one per `<string>`, `<color>`,
/// `<dimen>` or `<style>` entry of a values file
pub fn resource_definitions(rel_path: &str, content: Option<&str>) -> Vec<FoundResource> {
    let Some(dir) = resource_dir(rel_path) else {
        return Vec::new();
    };
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    // `ic_pin.9.png` defines `ic_pin`
    let stem = file_name.split('.').next().unwrap_or(file_name);

    let named_after_file = |kind| {
        vec![FoundResource {
            kind,
            name: stem.to_string(),
            line: 1,
        }]
    };

    match dir {
        "drawable" => named_after_file(ResourceKind::Drawable),
        "mipmap" => named_after_file(ResourceKind::Mipmap),
        "layout" if file_name.ends_with(".xml") => named_after_file(ResourceKind::Layout),
        "values" => content.map(value_definitions).unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn value_definitions(content: &str) -> Vec<FoundResource> {
    let mut found = Vec::new();
    for (index, line) in content.lines().enumerate() {
        for caps in VALUE_DEFINITION.captures_iter(line) {
            let Ok(kind) = ResourceKind::from_str(&caps[1]) else {
                continue;
            };
            found.push(FoundResource {
                kind,
                name: caps[2].to_string(),
                line: index as u32 + 1,
            });
        }
    }
    found
}

/// `R.type.name` references in Kotlin or Java source to known resources
pub fn scan_code_resources(
    content: &str,
    known: &HashSet<(ResourceKind, String)>,
) -> Vec<FoundResourceUsage> {
    scan_resources(content, &CODE_REFERENCE, ResourceOrigin::Code, known)
}

/// `@type/name` references in XML to known resources
pub fn scan_xml_resources(
    content: &str,
    known: &HashSet<(ResourceKind, String)>,
) -> Vec<FoundResourceUsage> {
    scan_resources(content, &XML_REFERENCE, ResourceOrigin::Xml, known)
}

fn scan_resources(
    content: &str,
    pattern: &Regex,
    origin: ResourceOrigin,
    known: &HashSet<(ResourceKind, String)>,
) -> Vec<FoundResourceUsage> {
    let mut found = Vec::new();
    for (index, line) in content.lines().enumerate() {
        for caps in pattern.captures_iter(line) {
            let Ok(kind) = ResourceKind::from_str(&caps[1]) else {
                continue;
            };
            let key = (kind, caps[2].to_string());
            if known.contains(&key) {
                found.push(FoundResourceUsage {
                    kind,
                    name: key.1,
                    line: index as u32 + 1,
                    origin,
                });
            }
        }
    }
    found
}

/// Parse `@drawable/ic_pin`, `R.drawable.ic_pin` or `drawable/ic_pin`
pub fn parse_resource_reference(text: &str) -> Option<(ResourceKind, String)> {
    let text = text.trim();
    let text = text.strip_prefix('@').unwrap_or(text);
    let text = text.strip_prefix('+').unwrap_or(text);
    let text = text.strip_prefix("R.").unwrap_or(text);

    let (kind, name) = text.split_once(|c| c == '/' || c == '.')?;
    if name.is_empty() {
        return None;
    }
    let kind = ResourceKind::from_str(kind).ok()?;
    Some((kind, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn known(entries: &[(ResourceKind, &str)]) -> HashSet<(ResourceKind, String)> {
        entries.iter().map(|(k, n)| (*k, n.to_string())).collect()
    }

    #[test]
    fn test_resource_dir_strips_qualifiers() {
        assert_eq!(resource_dir("app/src/main/res/layout-land/main.xml"), Some("layout"));
        assert_eq!(resource_dir("app/src/main/res/values-night/colors.xml"), Some("values"));
        assert_eq!(resource_dir("res/drawable-hdpi/ic_pin.png"), Some("drawable"));
        assert_eq!(resource_dir("app/src/main/res/strings.xml"), None);
        assert_eq!(resource_dir("app/src/main/kotlin/Main.kt"), None);
    }

    #[test]
    fn test_is_layout_xml() {
        assert!(is_layout_xml("app/src/main/res/layout/main.xml"));
        assert!(is_layout_xml("app/src/main/res/menu/toolbar.xml"));
        assert!(is_layout_xml("app/src/main/res/navigation/graph.xml"));
        assert!(!is_layout_xml("app/src/main/res/values/strings.xml"));
        assert!(!is_layout_xml("app/src/main/AndroidManifest.xml"));
    }

    #[test]
    fn test_scan_layout_usage_kinds() {
        let content = r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <com.shop.ui.ChartView android:id="@+id/chart" />
    <view class="com.shop.ui.Badge" />
    <fragment android:id="@+id/details" android:name="com.shop.cart.CartFragment" />
</LinearLayout>
"#;
        let usages = scan_layout(content);
        let summary: Vec<(&str, u32, XmlUsageKind, Option<&str>)> = usages
            .iter()
            .map(|u| (u.class_name.as_str(), u.line, u.kind, u.element_id.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("com.shop.ui.ChartView", 2, XmlUsageKind::ViewTag, Some("chart")),
                ("com.shop.ui.Badge", 3, XmlUsageKind::ViewClassAttr, None),
                ("com.shop.cart.CartFragment", 4, XmlUsageKind::Fragment, Some("details")),
            ]
        );
    }

    #[test]
    fn test_scan_layout_id_on_later_line() {
        let content = r#"<FrameLayout>
    <com.shop.ui.ChartView
        android:layout_width="match_parent"
        android:id="@+id/chart"
        />
    <fragment
        android:id="@+id/list"
        class="com.shop.cart.CartFragment" />
    <com.shop.ui.Spinner
        android:layout_width="wrap_content" />
</FrameLayout>
"#;
        let usages = scan_layout(content);
        assert_eq!(usages.len(), 3);
        assert_eq!(usages[0].element_id.as_deref(), Some("chart"));
        assert_eq!(usages[1].kind, XmlUsageKind::Fragment);
        assert_eq!(usages[1].element_id.as_deref(), Some("list"));
        assert_eq!(usages[2].element_id, None);
    }

    #[test]
    fn test_resource_definitions() {
        let values = r#"<resources>
    <string name="app_name">Shop</string>
    <color name="brand">#FF0000</color>
    <dimen name="gap">8dp</dimen>
    <style name="Theme.Shop" parent="Theme.Material3" />
</resources>
"#;
        let found = resource_definitions("app/src/main/res/values/strings.xml", Some(values));
        let summary: Vec<(ResourceKind, &str, u32)> =
            found.iter().map(|r| (r.kind, r.name.as_str(), r.line)).collect();
        assert_eq!(
            summary,
            vec![
                (ResourceKind::String, "app_name", 2),
                (ResourceKind::Color, "brand", 3),
                (ResourceKind::Dimen, "gap", 4),
                (ResourceKind::Style, "Theme.Shop", 5),
            ]
        );

        let pin = resource_definitions("app/src/main/res/drawable-xhdpi/ic_pin.9.png", None);
        assert_eq!(pin[0].kind, ResourceKind::Drawable);
        assert_eq!(pin[0].name, "ic_pin");
        assert_eq!(
            resource_definitions("app/src/main/res/layout/cart_item.xml", Some("<FrameLayout/>"))[0].kind,
            ResourceKind::Layout
        );
        assert!(resource_definitions("app/src/main/res/menu/toolbar.xml", Some("<menu/>")).is_empty());
        assert!(resource_definitions("app/src/main/kotlin/Main.kt", Some("")).is_empty());
    }

    #[test]
    fn test_scan_resources_only_known() {
        let known = known(&[(ResourceKind::String, "app_name"), (ResourceKind::Drawable, "ic_pin")]);

        let code = "setTitle(R.string.app_name)\nicon = R.drawable.ic_pin\nR.string.missing\nBR.string.app_name\n";
        let found = scan_code_resources(code, &known);
        let lines: Vec<(u32, ResourceOrigin)> = found.iter().map(|u| (u.line, u.origin)).collect();
        assert_eq!(lines, vec![(1, ResourceOrigin::Code), (2, ResourceOrigin::Code)]);

        let xml = r#"<TextView android:text="@string/app_name" android:src="@drawable/ic_pin" />"#;
        let found = scan_xml_resources(xml, &known);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|u| u.origin == ResourceOrigin::Xml && u.line == 1));
    }

    #[test]
    fn test_parse_resource_reference() {
        let pin = Some((ResourceKind::Drawable, "ic_pin".to_string()));
        assert_eq!(parse_resource_reference("@drawable/ic_pin"), pin);
        assert_eq!(parse_resource_reference("R.drawable.ic_pin"), pin);
        assert_eq!(parse_resource_reference(" drawable/ic_pin "), pin);
        assert_eq!(
            parse_resource_reference("@+id/chart"),
            Some((ResourceKind::Id, "chart".to_string()))
        );
        assert_eq!(parse_resource_reference("@raw/intro"), None);
        assert_eq!(parse_resource_reference("ic_pin"), None);
        assert_eq!(parse_resource_reference("@string/"), None);
    }

    proptest! {
        #[test]
        fn scan_layout_never_panics_and_lines_are_in_range(content in "[<>a-zA-Z.=\"@+/: \\n]{0,200}") {
            let lines = content.lines().count() as u32;
            for usage in scan_layout(&content) {
                prop_assert!(usage.line >= 1 && usage.line <= lines);
            }
        }
    }
}
