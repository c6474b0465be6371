//! Top-level package extraction from editor source text

use crate::walker::parse::module_specifiers;
use std::collections::HashSet;

/// Prefixes of specifiers that never name a registry package
const INTERNAL_PREFIXES: &[&str] = &[".", "/", "#", "~/", "@/", "node:", "data:", "http:", "https:"];

/// Whether a specifier points at local or host-internal code
pub fn is_internal(specifier: &str) -> bool {
    specifier.is_empty() || INTERNAL_PREFIXES.iter().any(|p| specifier.starts_with(p))
}

/// Collapse a specifier to its package name
///
/// `@scope/name/deep` becomes `@scope/name`, `name/deep` becomes `name`.
/// A lone scope (`@scope`) is not a package.
pub fn package_name(specifier: &str) -> Option<String> {
    let mut segments = specifier.split('/');
    let first = segments.next().filter(|s| !s.is_empty())?;

    if first.starts_with('@') {
        let name = segments.next().filter(|s| !s.is_empty())?;
        Some(format!("{}/{}", first, name))
    } else {
        Some(first.to_string())
    }
}

/// Packages referenced by `source`, deduplicated in order of appearance
///
/// Relative, rooted and internal specifiers are dropped, as is anything in
/// `builtins` (matched on the raw specifier or the collapsed package name).
pub fn top_level_packages(source: &str, builtins: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    module_specifiers(source)
        .into_iter()
        .filter(|spec| !is_internal(spec) && !builtins.contains(spec))
        .filter_map(|spec| package_name(&spec))
        .filter(|name| !builtins.contains(name))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
