//! Local filesystem handler

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{compile_pattern, log_transfer, to_key, walk_local};
use crate::error::{Error, Result};
use crate::kind::StorageKind;
use crate::path::stem_of;
use crate::pool::{TransferJob, TransferPool};
use crate::traits::{DirectoryDownload, PathHandler, TransferOptions};

const FILE_SCHEME: &str = "file://";

/// Handler for paths on the local filesystem
///
/// Uploads, downloads and in-backend copies are all plain file copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHandler;

impl LocalHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Strip `file://`, collapse repeated separators and drop the trailing one
fn normalize_local(raw: &str) -> String {
    let raw = raw.strip_prefix(FILE_SCHEME).unwrap_or(raw);
    let mut normalized = String::with_capacity(raw.len());
    let mut previous_was_separator = false;
    for c in raw.chars() {
        let is_separator = c == '/';
        if !(is_separator && previous_was_separator) {
            normalized.push(c);
        }
        previous_was_separator = is_separator;
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if normalized.is_empty() {
        normalized.push('.');
    }
    normalized
}

async fn metadata(address: &str) -> Result<Option<Metadata>> {
    match tokio::fs::metadata(address).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn copy_file(
    source: &Path,
    destination: &Path,
    force_overwrite: bool,
    verbose: bool,
) -> Result<()> {
    if !force_overwrite && tokio::fs::try_exists(destination).await? {
        tracing::debug!(destination = %destination.display(), "Destination exists, skipping");
        return Ok(());
    }
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, destination).await?;
    log_transfer(
        verbose,
        &source.to_string_lossy(),
        &destination.to_string_lossy(),
    );
    Ok(())
}

/// Copy a directory tree, merging into `destination` if it exists
async fn copy_tree(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
) -> Result<Vec<PathBuf>> {
    let tree = walk_local(source).await?;
    tokio::fs::create_dir_all(destination).await?;
    for dir in &tree.dirs {
        tokio::fs::create_dir_all(destination.join(dir)).await?;
    }

    let jobs: Vec<_> = tree
        .files
        .iter()
        .map(|relative| {
            let from = source.join(relative);
            let label = from.to_string_lossy().into_owned();
            TransferJob::new(label, (from, destination.join(relative)))
        })
        .collect();

    let force_overwrite = options.force_overwrite;
    let verbose = options.verbose;
    let mut files = TransferPool::new(options.concurrency)
        .run(jobs, move |(from, to): (PathBuf, PathBuf)| async move {
            copy_file(&from, &to, force_overwrite, verbose).await?;
            Ok(to)
        })
        .await?;
    files.sort();
    Ok(files)
}

#[async_trait]
impl PathHandler for LocalHandler {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn normalize(&self, raw: &str) -> Result<String> {
        Ok(normalize_local(raw))
    }

    async fn exists(&self, address: &str) -> Result<bool> {
        Ok(metadata(address).await?.is_some())
    }

    async fn is_file(&self, address: &str) -> Result<bool> {
        Ok(metadata(address).await?.is_some_and(|m| m.is_file()))
    }

    async fn is_dir(&self, address: &str) -> Result<bool> {
        Ok(metadata(address).await?.is_some_and(|m| m.is_dir()))
    }

    async fn list_children(&self, address: &str) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(address).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(self.join(address, &entry.file_name().to_string_lossy()));
        }
        children.sort();
        Ok(children)
    }

    async fn list_matching(&self, address: &str, pattern: &str) -> Result<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        Ok(self
            .list_children(address)
            .await?
            .into_iter()
            .filter(|child| pattern.matches(&self.name(child)))
            .collect())
    }

    async fn list_matching_recursive(&self, address: &str, pattern: &str) -> Result<Vec<String>> {
        let pattern = compile_pattern(pattern)?;
        if !self.is_dir(address).await? {
            return Ok(Vec::new());
        }
        let tree = walk_local(Path::new(address)).await?;
        Ok(tree
            .files
            .iter()
            .filter(|relative| {
                relative
                    .file_name()
                    .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
            })
            .map(|relative| self.join(address, &to_key(relative)))
            .collect())
    }

    async fn remove(&self, address: &str, strict: bool) -> Result<()> {
        match metadata(address).await? {
            Some(m) if m.is_dir() => tokio::fs::remove_dir_all(address).await?,
            Some(_) => tokio::fs::remove_file(address).await?,
            None if strict => return Err(Error::NotFound(address.to_string())),
            None => tracing::debug!(address, "Nothing to remove"),
        }
        Ok(())
    }

    async fn download_file(
        &self,
        source: &str,
        destination: &Path,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        copy_file(Path::new(source), destination, force_overwrite, false).await?;
        Ok(destination.to_path_buf())
    }

    async fn download_directory(
        &self,
        source: &str,
        destination: &Path,
        options: &TransferOptions,
    ) -> Result<Option<DirectoryDownload>> {
        let files = copy_tree(Path::new(source), destination, options).await?;
        Ok(Some(DirectoryDownload {
            root: destination.to_path_buf(),
            files,
        }))
    }

    async fn upload_file(&self, source: &Path, destination: &str) -> Result<()> {
        copy_file(source, Path::new(destination), true, false).await
    }

    async fn upload_directory(
        &self,
        source: &Path,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<Vec<String>> {
        let files = copy_tree(source, Path::new(destination), options).await?;
        Ok(files
            .into_iter()
            .map(|file| file.to_string_lossy().into_owned())
            .collect())
    }

    async fn copy_within(
        &self,
        source: &str,
        destination: &str,
        options: &TransferOptions,
    ) -> Result<()> {
        if self.is_dir(source).await? {
            copy_tree(Path::new(source), Path::new(destination), options).await?;
        } else {
            copy_file(
                Path::new(source),
                Path::new(destination),
                options.force_overwrite,
                options.verbose,
            )
            .await?;
        }
        Ok(())
    }

    fn parent(&self, address: &str) -> String {
        match Path::new(address).parent() {
            Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
            Some(parent) => parent.to_string_lossy().into_owned(),
            None => address.to_string(),
        }
    }

    fn name(&self, address: &str) -> String {
        Path::new(address)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn stem(&self, address: &str) -> String {
        stem_of(&self.name(address))
    }

    fn join(&self, address: &str, child: &str) -> String {
        let child = child.trim_start_matches('/');
        if child.is_empty() {
            return address.to_string();
        }
        normalize_local(&format!("{address}/{child}"))
    }

    fn relative_address(&self, address: &str) -> String {
        let path = Path::new(address);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        absolute
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn address(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn nested_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/nested")).unwrap();
        std::fs::write(temp.path().join("src/a.txt"), "a").unwrap();
        std::fs::write(temp.path().join("src/b.csv"), "b").unwrap();
        std::fs::write(temp.path().join("src/nested/c.txt"), "c").unwrap();
        temp
    }

    #[test]
    fn test_normalize_local() {
        assert_eq!(normalize_local("/tmp//AnyPath///tests/"), "/tmp/AnyPath/tests");
        assert_eq!(normalize_local("file:///tmp/x"), "/tmp/x");
        assert_eq!(normalize_local("/"), "/");
        assert_eq!(normalize_local("relative/dir/"), "relative/dir");
        assert_eq!(normalize_local(""), ".");
    }

    #[test]
    fn test_pure_decomposition() {
        let handler = LocalHandler::new();
        assert_eq!(handler.parent("/tmp/AnyPath/tests"), "/tmp/AnyPath");
        assert_eq!(handler.parent("/"), "/");
        assert_eq!(handler.parent("file.txt"), ".");
        assert_eq!(handler.name("/tmp/AnyPath/tests/a.txt"), "a.txt");
        assert_eq!(handler.stem("/tmp/AnyPath/tests/a.txt"), "a");
        assert_eq!(handler.join("/tmp", "/x/"), "/tmp/x");
        assert_eq!(handler.join("/", "x"), "/x");
        assert_eq!(handler.relative_address("/tmp/AnyPath/a.txt"), "tmp/AnyPath/a.txt");
    }

    #[test]
    fn test_parent_of_join_roundtrip() {
        let handler = LocalHandler::new();
        for base in ["/tmp/AnyPath", "/", ".", "relative/dir"] {
            assert_eq!(handler.parent(&handler.join(base, "child.txt")), base);
        }
    }

    #[tokio::test]
    async fn test_existence_checks() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let dir = address(&temp.path().join("src"));
        let file = address(&temp.path().join("src/a.txt"));
        let missing = address(&temp.path().join("missing"));

        assert!(handler.exists(&dir).await.unwrap());
        assert!(handler.is_dir(&dir).await.unwrap());
        assert!(!handler.is_file(&dir).await.unwrap());
        assert!(handler.is_file(&file).await.unwrap());
        assert!(!handler.is_dir(&file).await.unwrap());
        assert!(!handler.exists(&missing).await.unwrap());
        assert!(!handler.is_file(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_listing() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let dir = address(&temp.path().join("src"));

        let names: Vec<_> = handler
            .list_children(&dir)
            .await
            .unwrap()
            .iter()
            .map(|child| handler.name(child))
            .collect();
        assert_eq!(names, vec!["a.txt", "b.csv", "nested"]);

        let txt = handler.list_matching(&dir, "*.txt").await.unwrap();
        assert_eq!(txt, vec![format!("{dir}/a.txt")]);

        let all_txt = handler.list_matching_recursive(&dir, "*.txt").await.unwrap();
        assert_eq!(
            all_txt,
            vec![format!("{dir}/a.txt"), format!("{dir}/nested/c.txt")]
        );

        let missing = address(&temp.path().join("missing"));
        assert!(handler.list_children(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let dir = address(&temp.path().join("src"));
        let file = address(&temp.path().join("src/a.txt"));

        handler.remove(&file, true).await.unwrap();
        assert!(!handler.exists(&file).await.unwrap());

        handler.remove(&dir, false).await.unwrap();
        assert!(!handler.exists(&dir).await.unwrap());

        handler.remove(&dir, false).await.unwrap();
        assert!(matches!(
            handler.remove(&dir, true).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_file_respects_force() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let source = address(&temp.path().join("src/a.txt"));
        let target = temp.path().join("out/deeper/a.txt");

        let copied = handler.download_file(&source, &target, true).await.unwrap();
        assert_eq!(copied, target);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a");

        std::fs::write(&target, "changed").unwrap();
        handler.download_file(&source, &target, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "changed");

        handler.download_file(&source, &target, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a");
    }

    #[tokio::test]
    async fn test_copy_within_directory() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let source = address(&temp.path().join("src"));
        let target = address(&temp.path().join("dst"));

        handler
            .copy_within(&source, &target, &TransferOptions::default())
            .await
            .unwrap();

        assert!(temp.path().join("dst/a.txt").is_file());
        assert!(temp.path().join("dst/nested/c.txt").is_file());
    }

    #[tokio::test]
    async fn test_download_directory_lists_files() {
        let temp = nested_dir();
        let handler = LocalHandler::new();
        let source = address(&temp.path().join("src"));
        let target = temp.path().join("download");

        let download = handler
            .download_directory(&source, &target, &TransferOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(download.root, target);
        assert_eq!(
            download.files,
            vec![
                target.join("a.txt"),
                target.join("b.csv"),
                target.join("nested/c.txt")
            ]
        );
    }
}
