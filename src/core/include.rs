// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Include file resolution for the label graph.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Text of an included file, with the path it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedInclude {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

pub trait IncludeLoader {
    /// Resolves `name` as written in an include directive of the file at
    /// `from` (when known). `None` means the include is unresolved.
    fn load(&self, name: &str, from: Option<&Path>) -> Option<LoadedInclude>;
}

/// Loader that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeLoader for NoIncludes {
    fn load(&self, _name: &str, _from: Option<&Path>) -> Option<LoadedInclude> {
        None
    }
}

/// Looks next to the including file first, then in each search path.
#[derive(Debug, Clone, Default)]
pub struct FsIncludeLoader {
    search_paths: Vec<PathBuf>,
}

impl FsIncludeLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn resolve(&self, name: &str, from: Option<&Path>) -> Option<PathBuf> {
        let requested = Path::new(name);
        if requested.is_absolute() {
            return requested.is_file().then(|| requested.to_path_buf());
        }
        let sibling_dir = from.and_then(Path::parent).map(Path::to_path_buf);
        sibling_dir
            .into_iter()
            .chain(self.search_paths.iter().cloned())
            .map(|dir| dir.join(requested))
            .find(|candidate| candidate.is_file())
    }
}

impl IncludeLoader for FsIncludeLoader {
    fn load(&self, name: &str, from: Option<&Path>) -> Option<LoadedInclude> {
        let path = self.resolve(name, from)?;
        match fs::read_to_string(&path) {
            Ok(text) => Some(LoadedInclude {
                path: fs::canonicalize(&path).unwrap_or(path),
                lines: text.lines().map(str::to_string).collect(),
            }),
            Err(err) => {
                debug!(path = %path.display(), %err, "include file not readable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("asmscope-{tag}-{}-{nanos}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn resolves_sibling_before_search_paths() {
        let root = temp_dir("include");
        let src = root.join("src");
        let inc = root.join("inc");
        fs::create_dir_all(&src).expect("src dir");
        fs::create_dir_all(&inc).expect("inc dir");
        fs::write(src.join("defs.inc"), "sibling:\n").expect("write sibling");
        fs::write(inc.join("defs.inc"), "search:\n").expect("write search");
        fs::write(inc.join("only.inc"), "only:\n").expect("write only");

        let loader = FsIncludeLoader::new(vec![inc.clone()]);
        let from = src.join("main.asm");
        let loaded = loader.load("defs.inc", Some(&from)).expect("sibling include");
        assert_eq!(loaded.lines, vec!["sibling:".to_string()]);
        let loaded = loader.load("only.inc", Some(&from)).expect("search path include");
        assert_eq!(loaded.lines, vec!["only:".to_string()]);
        assert!(loader.load("missing.inc", Some(&from)).is_none());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn no_includes_resolves_nothing() {
        assert!(NoIncludes.load("anything.inc", None).is_none());
    }
}
