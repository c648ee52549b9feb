//! Change-event filtering: gitignore-style `ignored_globs` plus an
//! extension allow-list, using the same override-precedence rules as a
//! directory walker but applied per-event here instead of
//! per-directory-entry.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

pub struct ChangeFilter {
    ignores: Gitignore,
    include_extensions: Vec<String>,
}

impl ChangeFilter {
    pub fn new(root: &Path, ignored_globs: &[String], include_extensions: Vec<String>) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in ignored_globs {
            let _ = builder.add_line(None, pattern);
        }
        let ignores = builder.build().unwrap_or_else(|_| Gitignore::empty());
        Self {
            ignores,
            include_extensions,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.ignores.matched(path, path.is_dir()).is_ignore() {
            return false;
        }
        if self.include_extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.include_extensions.iter().any(|e| e == ext),
            None => false,
        }
    }
}
