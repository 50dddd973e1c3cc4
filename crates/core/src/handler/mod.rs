//! Path handlers
//!
//! [`LocalHandler`] serves the local filesystem. [`ObjectStoreHandler`]
//! serves any remote kind on top of an [`ObjectStore`](crate::ObjectStore).

mod local;
mod object;

pub use local::LocalHandler;
pub use object::ObjectStoreHandler;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Relative layout of a local directory tree
#[derive(Debug, Default)]
pub(crate) struct LocalTree {
    /// Every directory below the root, parents first
    pub dirs: Vec<PathBuf>,
    /// Every file below the root
    pub files: Vec<PathBuf>,
}

/// Walk a local directory, returning paths relative to `root`, sorted
pub(crate) async fn walk_local(root: &Path) -> Result<LocalTree> {
    let mut tree = LocalTree::default();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let mut entries = tokio::fs::read_dir(root.join(&relative)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let child = relative.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                tree.dirs.push(child.clone());
                pending.push(child);
            } else {
                tree.files.push(child);
            }
        }
    }

    tree.dirs.sort();
    tree.files.sort();
    Ok(tree)
}

/// Relative local path as a `/`-separated key suffix
pub(crate) fn to_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Log one finished object transfer, at info level in verbose mode
pub(crate) fn log_transfer(verbose: bool, source: &str, destination: &str) {
    if verbose {
        tracing::info!("{source} -> {destination}");
    } else {
        tracing::debug!(source, destination, "Transferred");
    }
}

/// Compile a shell-style pattern
pub(crate) fn compile_pattern(pattern: &str) -> Result<glob::Pattern> {
    glob::Pattern::new(pattern)
        .map_err(|e| Error::InvalidPath(format!("Invalid pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_walk_local() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::create_dir_all(temp.path().join("empty")).unwrap();
        std::fs::write(temp.path().join("top.txt"), "x").unwrap();
        std::fs::write(temp.path().join("a/b/deep.txt"), "x").unwrap();

        let tree = walk_local(temp.path()).await.unwrap();
        assert_eq!(
            tree.dirs,
            vec![PathBuf::from("a"), PathBuf::from("a/b"), PathBuf::from("empty")]
        );
        assert_eq!(
            tree.files,
            vec![PathBuf::from("a/b/deep.txt"), PathBuf::from("top.txt")]
        );
    }

    #[test]
    fn test_to_key() {
        assert_eq!(to_key(Path::new("a/b/c.txt")), "a/b/c.txt");
        assert_eq!(to_key(Path::new("c.txt")), "c.txt");
    }

    #[test]
    fn test_compile_pattern() {
        assert!(compile_pattern("*.txt").unwrap().matches("a.txt"));
        assert!(compile_pattern("[").is_err());
    }
}
