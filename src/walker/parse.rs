//! Dependency discovery in declaration and source text
//!
//! Pattern based, not a parser: good enough to find what a declaration file
//! or an editor buffer pulls in, and tolerant of code that does not parse.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `/// <reference path="..." />` and `/// <reference types="..." />`
static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*///[ \t]*<reference[ \t]+(path|types)[ \t]*=[ \t]*["']([^"']+)["'][^>]*>"#)
        .expect("Invalid reference regex")
});

/// `import ... from '...'` and `export ... from '...'` (tail only)
static FROM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bfrom\s*["']([^"'\n]+)["']"#).expect("Invalid from regex"));

/// Side-effect `import '...'`
static BARE_IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*["']([^"'\n]+)["']"#).expect("Invalid import regex")
});

/// `import('...')` and `require('...')`
static CALL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|require)\s*\(\s*["']([^"'\n]+)["']\s*\)"#)
        .expect("Invalid call regex")
});

/// Block comments and whole-line `//` comments (triple-slash included)
static COMMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*.*?\*/|(?m)^[ \t]*//[^\n]*").expect("Invalid comment regex")
});

/// Kind of a triple-slash reference directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `path="..."`: a file relative to the referencing file
    Path(String),
    /// `types="..."`: a package
    Types(String),
}

/// Triple-slash reference directives, in order of appearance
pub fn references(text: &str) -> Vec<Reference> {
    REFERENCE_REGEX
        .captures_iter(text)
        .map(|caps| {
            let target = caps[2].to_string();
            match &caps[1] {
                "types" => Reference::Types(target),
                _ => Reference::Path(target),
            }
        })
        .collect()
}

/// Module specifiers referenced by `text`, deduplicated in order of
/// appearance
///
/// Covers static/re-export `from` clauses, side-effect imports, dynamic
/// `import()`, `require()` and `import x = require()`. Comments are ignored.
pub fn module_specifiers(text: &str) -> Vec<String> {
    let code = COMMENT_REGEX.replace_all(text, "");

    let mut found: Vec<(usize, &str)> = Vec::new();
    for regex in [&*FROM_REGEX, &*BARE_IMPORT_REGEX, &*CALL_REGEX] {
        for caps in regex.captures_iter(&code) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, spec)| seen.insert(*spec))
        .map(|(_, spec)| spec.to_string())
        .collect()
}

/// How a specifier found inside a declaration file is followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `./x`, `../x`: a file relative to the importing file
    Relative,
    /// `/x` or `https://...`: a file on the registry or another origin
    Url,
    /// `pkg` or `@scope/pkg`: resolved as a package entry point
    Package,
    /// Package subpaths, `node:` builtins and anything else not followed
    Ignored,
}

/// Classify a specifier for traversal
pub fn classify(specifier: &str) -> SpecifierKind {
    if specifier.starts_with("./") || specifier.starts_with("../") {
        return SpecifierKind::Relative;
    }
    if specifier.starts_with('/')
        || specifier.starts_with("https://")
        || specifier.starts_with("http://")
    {
        return SpecifierKind::Url;
    }
    if specifier.contains(':') || specifier.is_empty() || specifier.starts_with('.') {
        return SpecifierKind::Ignored;
    }

    let segments = specifier.split('/').count();
    let is_package = if specifier.starts_with('@') {
        segments == 2
    } else {
        segments == 1
    };

    if is_package {
        SpecifierKind::Package
    } else {
        SpecifierKind::Ignored
    }
}
