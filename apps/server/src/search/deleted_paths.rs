//! Paths of content deleted but possibly still present in the index.

use std::sync::{PoisonError, RwLock};

use quarry_template::escape_query_chars;

pub trait DeletedPaths: Send + Sync {
    /// Paths to exclude, already escaped for the index syntax.
    fn deleted_paths(&self) -> Vec<String>;
}

/// In-process record of deleted paths, kept until the index catches up.
#[derive(Debug, Default)]
pub struct DeletedPathsService {
    paths: RwLock<Vec<String>>,
}

impl DeletedPathsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let service = Self::new();
        for path in paths {
            service.record(path.as_ref());
        }
        service
    }

    /// Remember `path`; recording the same path twice is a no-op.
    pub fn record(&self, path: &str) {
        let escaped = escape_query_chars(path);
        let mut paths = self.paths.write().unwrap_or_else(PoisonError::into_inner);
        if !paths.contains(&escaped) {
            paths.push(escaped);
        }
    }

    /// Forget `path`, once the index no longer holds it.
    pub fn forget(&self, path: &str) {
        let escaped = escape_query_chars(path);
        self.paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p != &escaped);
    }
}

impl DeletedPaths for DeletedPathsService {
    fn deleted_paths(&self) -> Vec<String> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_escaped_paths_once() {
        let service = DeletedPathsService::from_paths(["/p/a b", "/p/c", "/p/a b"]);
        assert_eq!(service.deleted_paths(), vec!["\\/p\\/a\\ b", "\\/p\\/c"]);

        service.forget("/p/c");
        assert_eq!(service.deleted_paths(), vec!["\\/p\\/a\\ b"]);
    }
}
