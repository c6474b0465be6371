//! URL helpers for declaration files

use crate::error::{TypeLoadError, TypeLoadResult};
use url::Url;

/// Declaration file extensions
const DECLARATION_EXTS: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

/// Source extensions that already name a typed file
const TYPED_EXTS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];

/// Typed source extensions and the declaration extension they map to
const TYPED_TO_DECLARATION: &[(&str, &str)] = &[
    (".mts", ".d.mts"),
    (".cts", ".d.cts"),
    (".tsx", ".d.ts"),
    (".ts", ".d.ts"),
];

/// Runtime extensions and the declaration extension they map to
const RUNTIME_EXTS: &[(&str, &str)] = &[(".js", ".d.ts"), (".mjs", ".d.mts"), (".cjs", ".d.cts")];

/// Whether `path` ends in a declaration extension
pub fn has_declaration_ext(path: &str) -> bool {
    DECLARATION_EXTS.iter().any(|ext| path.ends_with(ext))
}

/// Normalize a declaration URL before it is fetched or marked visited
///
/// - URLs carrying a query string are returned untouched.
/// - Repeated declaration suffixes (`x.d.ts.d.ts`) collapse to one.
/// - Typed paths (`.d.ts`, `.ts`, ...) are kept as-is.
/// - Runtime paths (`.js`, `.mjs`, `.cjs`) map to their declaration file.
/// - Any other path gains exactly one `.d.ts`.
pub fn normalize_declaration_url(url: &str) -> String {
    if url.contains('?') {
        return url.to_string();
    }

    let mut out = url.to_string();
    for ext in DECLARATION_EXTS {
        let doubled = ext.repeat(2);
        while out.ends_with(&doubled) {
            out.truncate(out.len() - ext.len());
        }
    }

    if TYPED_EXTS.iter().any(|ext| out.ends_with(ext)) {
        return out;
    }

    for (runtime, declaration) in RUNTIME_EXTS {
        if let Some(stem) = out.strip_suffix(runtime) {
            return format!("{}{}", stem, declaration);
        }
    }

    out.push_str(".d.ts");
    out
}

/// Resolve `specifier` against `base` (relative, rooted or absolute)
pub fn resolve(base: &str, specifier: &str) -> TypeLoadResult<String> {
    let base_url = Url::parse(base).map_err(|e| TypeLoadError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    let joined = base_url
        .join(specifier)
        .map_err(|e| TypeLoadError::InvalidUrl {
            url: specifier.to_string(),
            reason: e.to_string(),
        })?;
    Ok(joined.to_string())
}

/// Derive the virtual path a fetched file is published under
///
/// Files served from the registry origin are re-rooted under `virtual_root`
/// (`https://esm.sh/v135/x/index.d.ts` becomes
/// `file:///node_modules/v135/x/index.d.ts`). Files from any other origin keep
/// their host as the first path segment. Queries are dropped and the result
/// always ends in a declaration extension.
pub fn virtual_path_for(url: &str, registry_base: &str, virtual_root: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let base = registry_base.trim_end_matches('/');

    let rest = match without_query.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => match Url::parse(without_query) {
            Ok(parsed) => format!(
                "{}{}",
                parsed.host_str().unwrap_or_default(),
                parsed.path()
            ),
            Err(_) => without_query.trim_start_matches('/').to_string(),
        },
    };

    let mut path = format!("{}{}", virtual_root, rest);
    if !has_declaration_ext(&path) {
        path = normalize_declaration_url(&path);
        if !has_declaration_ext(&path) {
            // Typed source such as `.ts`: swap for the declaration form
            if let Some((stem, ext)) = TYPED_TO_DECLARATION
                .iter()
                .find_map(|(typed, decl)| path.strip_suffix(typed).map(|stem| (stem, decl)))
            {
                path = format!("{}{}", stem, ext);
            }
        }
    }
    path
}

/// Extract a `name@version` version segment from a registry URL
pub fn version_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.path_segments()?.find_map(|segment| {
        let (_, version) = segment.rsplit_once('@')?;
        let looks_like_version = version
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        looks_like_version.then(|| version.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_suffix_collapses() {
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/index.d.ts.d.ts.d.ts"),
            "https://esm.sh/x/index.d.ts"
        );
    }

    #[test]
    fn query_left_untouched() {
        let url = "https://esm.sh/lodash?dts";
        assert_eq!(normalize_declaration_url(url), url);
        let doubled = "https://esm.sh/x.d.ts.d.ts?target=es2022";
        assert_eq!(normalize_declaration_url(doubled), doubled);
    }

    #[test]
    fn bare_path_gains_one_suffix() {
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/types"),
            "https://esm.sh/x/types.d.ts"
        );
        assert_eq!(
            normalize_declaration_url("https://esm.sh/lodash@4.17.21"),
            "https://esm.sh/lodash@4.17.21.d.ts"
        );
    }

    #[test]
    fn typed_and_runtime_paths() {
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/index.d.ts"),
            "https://esm.sh/x/index.d.ts"
        );
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/a.ts"),
            "https://esm.sh/x/a.ts"
        );
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/a.js"),
            "https://esm.sh/x/a.d.ts"
        );
        assert_eq!(
            normalize_declaration_url("https://esm.sh/x/a.mjs"),
            "https://esm.sh/x/a.d.mts"
        );
    }

    #[test]
    fn resolve_relative_rooted_absolute() {
        let base = "https://esm.sh/v135/pkg@1.0.0/dist/index.d.ts";
        assert_eq!(
            resolve(base, "./types").unwrap(),
            "https://esm.sh/v135/pkg@1.0.0/dist/types"
        );
        assert_eq!(
            resolve(base, "../lib/a.d.ts").unwrap(),
            "https://esm.sh/v135/pkg@1.0.0/lib/a.d.ts"
        );
        assert_eq!(
            resolve(base, "/v135/other/index.d.ts").unwrap(),
            "https://esm.sh/v135/other/index.d.ts"
        );
        assert_eq!(
            resolve(base, "https://cdn.example/x.d.ts").unwrap(),
            "https://cdn.example/x.d.ts"
        );
    }

    #[test]
    fn resolve_rejects_garbage_base() {
        assert!(resolve("not a url", "./x").is_err());
    }

    #[test]
    fn virtual_path_rewrites_registry_origin() {
        assert_eq!(
            virtual_path_for(
                "https://esm.sh/v135/pkg@1.0.0/dist/index.d.ts",
                "https://esm.sh",
                "file:///node_modules/"
            ),
            "file:///node_modules/v135/pkg@1.0.0/dist/index.d.ts"
        );
        assert_eq!(
            virtual_path_for(
                "https://esm.sh/pkg?dts",
                "https://esm.sh/",
                "file:///node_modules/"
            ),
            "file:///node_modules/pkg.d.ts"
        );
    }

    #[test]
    fn virtual_path_foreign_origin_keeps_host() {
        assert_eq!(
            virtual_path_for(
                "https://cdn.example/a/b.ts",
                "https://esm.sh",
                "file:///node_modules/"
            ),
            "file:///node_modules/cdn.example/a/b.d.ts"
        );
    }

    #[test]
    fn version_extraction() {
        assert_eq!(
            version_from_url("https://esm.sh/v135/lodash@4.17.21/index.d.ts").as_deref(),
            Some("4.17.21")
        );
        assert_eq!(
            version_from_url("https://esm.sh/@vapor-ui/core@0.5.0/dist/index.d.ts").as_deref(),
            Some("0.5.0")
        );
        assert!(version_from_url("https://esm.sh/lodash?dts").is_none());
    }
}
