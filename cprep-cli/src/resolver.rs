//! A directory-search [`IncludeResolver`] for real files on disk.
//!
//! The core engine only specifies a resolution *callback*; this is the
//! concrete I/O behind it.

use std::path::{Path, PathBuf};

use cprep_engine::IncludeResolver;
use cprep_foundation::errors::IncludeKind;
use cprep_foundation::source::{open_file, InputStream};
use tracing::debug;

/// Resolves `#include` paths by searching, in order: the directory the
/// including file lives in (for quoted includes only, matching the usual
/// "local first" convention), then each `-I` directory in the order given
/// on the command line.
pub struct SearchPathResolver {
    local_dir: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(local_dir: Option<PathBuf>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            local_dir,
            search_dirs,
        }
    }

    fn candidates(&self, path: &str, kind: IncludeKind) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if kind == IncludeKind::Local {
            if let Some(dir) = &self.local_dir {
                candidates.push(dir.join(path));
            }
        }
        candidates.extend(self.search_dirs.iter().map(|dir| dir.join(path)));
        candidates.push(PathBuf::from(path));
        candidates
    }
}

impl IncludeResolver for SearchPathResolver {
    fn resolve(&mut self, path: &str, kind: IncludeKind) -> Option<Box<dyn InputStream>> {
        for candidate in self.candidates(path, kind) {
            if let Ok(stream) = open_file(&candidate) {
                debug!(path, resolved = %candidate.display(), "resolved #include");
                return Some(Box::new(stream));
            }
        }
        None
    }
}

/// The directory a source file lives in, for use as the "local" search
/// root of a [`SearchPathResolver`].
pub fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent().map(|p| p.to_path_buf())
}
