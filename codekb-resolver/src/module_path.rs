//! Step 2: module path resolution, probing relative paths, extension/
//! index-file completion, alias roots, then bare-package (external)
//! fallback, in that order.

use codekb_core::config::ResolverConfig;
use codekb_core::FxHashSet;

fn normalize_posix(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

fn parent_dir(file_path: &str) -> &str {
    match file_path.rfind('/') {
        Some(idx) => &file_path[..idx],
        None => "",
    }
}

fn probe(
    base: &str,
    known_files: &FxHashSet<&str>,
    probe_order: &[String],
) -> Option<String> {
    if known_files.contains(base) {
        return Some(base.to_string());
    }
    for ext in probe_order {
        let candidate = format!("{base}.{ext}");
        if known_files.contains(candidate.as_str()) {
            return Some(candidate);
        }
    }
    for ext in probe_order {
        let candidate = if base.is_empty() {
            format!("index.{ext}")
        } else {
            format!("{base}/index.{ext}")
        };
        if known_files.contains(candidate.as_str()) {
            return Some(candidate);
        }
    }
    None
}

/// Resolve an import's `source` string to an absolute project path, trying
/// (a) relative-to-importer, (b) absolute-from-root, (c) directory index,
/// (d) alias roots, in that order. `None` means the source is external.
pub fn resolve_import_path(
    source: &str,
    importer_file: &str,
    known_files: &FxHashSet<&str>,
    config: &ResolverConfig,
) -> Option<String> {
    let probe_order = config.effective_extension_probe_order();

    if let Some(rest) = source.strip_prefix("./").or_else(|| source.strip_prefix("../")) {
        let _ = rest;
        let joined = normalize_posix(&format!("{}/{}", parent_dir(importer_file), source));
        if let Some(hit) = probe(&joined, known_files, &probe_order) {
            return Some(hit);
        }
    }

    if let Some(rest) = source.strip_prefix('/') {
        let root = config.project_root.as_deref().unwrap_or("");
        let joined = normalize_posix(&format!("{root}/{rest}"));
        if let Some(hit) = probe(&joined, known_files, &probe_order) {
            return Some(hit);
        }
    }

    for (alias, dir) in &config.alias_roots {
        if let Some(rest) = source.strip_prefix(alias.as_str()) {
            let joined = normalize_posix(&format!("{dir}{rest}"));
            if let Some(hit) = probe(&joined, known_files, &probe_order) {
                return Some(hit);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    #[test]
    fn relative_import_is_resolved_with_extension_probing() {
        let known: FxHashSet<&str> = ["src/a.ts", "src/b.ts"].into_iter().collect();
        let resolved = resolve_import_path("./a", "src/b.ts", &known, &config());
        assert_eq!(resolved, Some("src/a.ts".to_string()));
    }

    #[test]
    fn directory_index_resolution() {
        let known: FxHashSet<&str> = ["src/utils/index.ts"].into_iter().collect();
        let resolved = resolve_import_path("./utils", "src/b.ts", &known, &config());
        assert_eq!(resolved, Some("src/utils/index.ts".to_string()));
    }

    #[test]
    fn unresolvable_relative_import_is_external() {
        let known: FxHashSet<&str> = ["src/b.ts"].into_iter().collect();
        assert_eq!(resolve_import_path("./missing", "src/b.ts", &known, &config()), None);
    }

    #[test]
    fn alias_root_is_resolved() {
        let known: FxHashSet<&str> = ["shared/util.ts"].into_iter().collect();
        let mut cfg = config();
        cfg.alias_roots = vec![("@shared".to_string(), "shared".to_string())];
        let resolved = resolve_import_path("@shared/util", "src/b.ts", &known, &cfg);
        assert_eq!(resolved, Some("shared/util.ts".to_string()));
    }

    #[test]
    fn bare_package_specifier_is_external() {
        let known: FxHashSet<&str> = ["src/b.ts"].into_iter().collect();
        assert_eq!(resolve_import_path("react", "src/b.ts", &known, &config()), None);
    }
}
