//! Inferred component prop shapes
//!
//! A heuristic for packages whose declarations are slow to arrive or absent:
//! capitalized named imports are assumed to be UI components and get a
//! loose props interface from a static table, falling back to a generic
//! shape. The output only helps completion; it says nothing about what the
//! package really exports.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `import { A, B as C } from 'pkg'` (optionally with a default import)
static NAMED_IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:type\s+)?(?:[\w$]+\s*,\s*)?\{([^}]*)\}\s*from\s*["']([^"']+)["']"#)
        .expect("Invalid named import regex")
});

/// A single prop: name and TypeScript type text
pub type PropSpec = (&'static str, &'static str);

const COMMON: &[PropSpec] = &[
    ("className", "string"),
    ("style", "Record<string, unknown>"),
    ("children", "any"),
];

const BUTTON: &[PropSpec] = &[
    ("onClick", "(event: any) => void"),
    ("disabled", "boolean"),
    ("variant", "string"),
    ("size", "'sm' | 'md' | 'lg' | 'xl' | (string & {})"),
    ("color", "string"),
    ("type", "'button' | 'submit' | 'reset'"),
];

const INPUT: &[PropSpec] = &[
    ("value", "string"),
    ("defaultValue", "string"),
    ("placeholder", "string"),
    ("disabled", "boolean"),
    ("invalid", "boolean"),
    ("onChange", "(event: any) => void"),
    ("onValueChange", "(value: string) => void"),
];

const TOGGLE: &[PropSpec] = &[
    ("checked", "boolean"),
    ("defaultChecked", "boolean"),
    ("disabled", "boolean"),
    ("onCheckedChange", "(checked: boolean) => void"),
];

const SELECT: &[PropSpec] = &[
    ("value", "string"),
    ("defaultValue", "string"),
    ("placeholder", "string"),
    ("onValueChange", "(value: string) => void"),
];

const TEXT: &[PropSpec] = &[
    ("as", "string"),
    ("typography", "string"),
    ("foreground", "string"),
];

const LAYOUT: &[PropSpec] = &[
    ("as", "string"),
    ("gap", "string | number"),
    ("padding", "string | number"),
    ("margin", "string | number"),
    ("direction", "'row' | 'column'"),
    ("alignItems", "string"),
    ("justifyContent", "string"),
];

const OVERLAY: &[PropSpec] = &[
    ("open", "boolean"),
    ("defaultOpen", "boolean"),
    ("onOpenChange", "(open: boolean) => void"),
];

const BADGE: &[PropSpec] = &[("color", "string"), ("size", "string"), ("shape", "string")];

const AVATAR: &[PropSpec] = &[
    ("src", "string"),
    ("alt", "string"),
    ("size", "string"),
];

/// Component name to shape lookup
const SHAPES: &[(&str, &[PropSpec])] = &[
    ("Button", BUTTON),
    ("IconButton", BUTTON),
    ("Input", INPUT),
    ("TextInput", INPUT),
    ("TextArea", INPUT),
    ("Textarea", INPUT),
    ("Checkbox", TOGGLE),
    ("Switch", TOGGLE),
    ("Radio", TOGGLE),
    ("Select", SELECT),
    ("Text", TEXT),
    ("Heading", TEXT),
    ("Box", LAYOUT),
    ("Flex", LAYOUT),
    ("Grid", LAYOUT),
    ("Stack", LAYOUT),
    ("HStack", LAYOUT),
    ("VStack", LAYOUT),
    ("Card", LAYOUT),
    ("Dialog", OVERLAY),
    ("Modal", OVERLAY),
    ("Popover", OVERLAY),
    ("Tooltip", OVERLAY),
    ("Sheet", OVERLAY),
    ("Badge", BADGE),
    ("Avatar", AVATAR),
];

/// A component name imported from a package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentImport {
    pub package: String,
    pub name: String,
}

/// Capitalized named imports, deduplicated in order of appearance
pub fn component_imports(source: &str) -> Vec<ComponentImport> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for caps in NAMED_IMPORT_REGEX.captures_iter(source) {
        let package = caps[2].to_string();
        for binding in caps[1].split(',') {
            let binding = binding.trim();
            let binding = binding.strip_prefix("type ").unwrap_or(binding).trim();
            // `A as B` keeps the exported name
            let name = binding.split_whitespace().next().unwrap_or_default();
            if !name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                continue;
            }
            let import = ComponentImport {
                package: package.clone(),
                name: name.to_string(),
            };
            if seen.insert(import.clone()) {
                found.push(import);
            }
        }
    }

    found
}

/// Prop shape for a component name (fallback: common props only)
pub fn shape_for(name: &str) -> &'static [PropSpec] {
    SHAPES
        .iter()
        .find(|(component, _)| *component == name)
        .map(|(_, props)| *props)
        .unwrap_or(&[])
}

/// Declaration text for one inferred component
pub fn render_declaration(import: &ComponentImport) -> String {
    let mut out = String::new();
    out.push_str("// Inferred component shape (heuristic, not authoritative)\n");
    out.push_str(&format!("declare module '{}' {{\n", import.package));
    out.push_str(&format!("  export interface {}Props {{\n", import.name));
    for (prop, ty) in COMMON.iter().chain(shape_for(&import.name)) {
        out.push_str(&format!("    {}?: {};\n", prop, ty));
    }
    out.push_str("    [prop: string]: unknown;\n");
    out.push_str("  }\n");
    out.push_str(&format!(
        "  export const {}: (props: {}Props) => any;\n",
        import.name, import.name
    ));
    out.push_str("}\n");
    out
}

/// Virtual path an inferred declaration is published under
pub fn inferred_path(virtual_root: &str, import: &ComponentImport) -> String {
    format!(
        "{}@inferred/{}/{}.d.ts",
        virtual_root, import.package, import.name
    )
}
