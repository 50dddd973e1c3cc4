//! Copy orchestration
//!
//! Picks how data moves between two paths:
//! - into a local destination, the source handler pulls it down directly
//! - within one remote backend, the backend copies server-side
//! - between different remote backends, or from local to remote, data is
//!   staged through local disk and pushed by the destination handler

use std::path::{Path, PathBuf};

use crate::anypath::AnyPath;
use crate::error::{Error, Result};
use crate::kind::StorageKind;
use crate::traits::TransferOptions;

const STAGING_PREFIX: &str = "anypath-staging-";

/// How a copy moves its data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    /// Destination is local: the source handler downloads straight into it
    DirectLocalCopy,
    /// Source and destination share a remote backend: server-side copy
    SameBackendRemoteCopy,
    /// Anything else: download to scratch space (unless already local), then upload
    StageThroughLocal,
}

impl TransferStrategy {
    pub fn select(source: StorageKind, destination: StorageKind) -> Self {
        if destination == StorageKind::Local {
            TransferStrategy::DirectLocalCopy
        } else if source == destination {
            TransferStrategy::SameBackendRemoteCopy
        } else {
            TransferStrategy::StageThroughLocal
        }
    }
}

/// Everything decided before any data moves
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub strategy: TransferStrategy,
    pub destination: AnyPath,
    pub source_is_dir: bool,
}

/// Validate a copy and decide its destination and strategy
pub async fn plan(source: &AnyPath, target: Option<&AnyPath>) -> Result<TransferPlan> {
    if !source.exists().await? {
        return Err(Error::NotFound(source.address().to_string()));
    }
    let source_is_dir = source.is_dir().await?;

    let destination = match target {
        Some(target) => {
            if same_location(source, target).await {
                return Err(Error::ContractViolation(format!(
                    "Cannot copy '{source}' onto itself"
                )));
            }
            if target.exists().await? {
                let target_is_dir = target.is_dir().await?;
                if target_is_dir != source_is_dir {
                    return Err(Error::ContractViolation(format!(
                        "Cannot copy {} '{}' onto existing {} '{}'",
                        describe(source_is_dir),
                        source,
                        describe(target_is_dir),
                        target
                    )));
                }
            }
            target.clone()
        }
        None => {
            let location = source
                .registry()
                .cache()
                .resolve(source.kind(), &source.relative_address(), source_is_dir)
                .await?;
            AnyPath::from_local(&location, source.registry())?
        }
    };

    Ok(TransferPlan {
        strategy: TransferStrategy::select(source.kind(), destination.kind()),
        destination,
        source_is_dir,
    })
}

async fn same_location(source: &AnyPath, target: &AnyPath) -> bool {
    if source.address() == target.address() {
        return true;
    }
    match (source.local_path(), target.local_path()) {
        (Some(a), Some(b)) => match (tokio::fs::canonicalize(&a).await, tokio::fs::canonicalize(&b).await) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

fn describe(is_dir: bool) -> &'static str {
    if is_dir { "directory" } else { "file" }
}

/// Copy `source` to `target`, or into the local cache when there is no target
///
/// Returns the destination path.
pub async fn copy(
    source: &AnyPath,
    target: Option<&AnyPath>,
    options: &TransferOptions,
) -> Result<AnyPath> {
    let plan = plan(source, target).await?;
    tracing::debug!(
        source = %source,
        destination = %plan.destination,
        strategy = ?plan.strategy,
        directory = plan.source_is_dir,
        "Planned copy"
    );

    match plan.strategy {
        TransferStrategy::DirectLocalCopy => {
            let local = PathBuf::from(plan.destination.address());
            pull_to_local(source, &local, plan.source_is_dir, options).await?;
        }
        TransferStrategy::SameBackendRemoteCopy => {
            source
                .handler()
                .copy_within(source.address(), plan.destination.address(), options)
                .await?;
        }
        TransferStrategy::StageThroughLocal => {
            stage_through_local(source, &plan.destination, plan.source_is_dir, options).await?;
        }
    }

    if options.verbose {
        tracing::info!("Copied {source} to {}", plan.destination);
    }
    Ok(plan.destination)
}

/// Materialize `source` at a local path with its own handler
///
/// Returns the local root of what was written, or `None` for a directory
/// source holding no objects.
async fn pull_to_local(
    source: &AnyPath,
    local: &Path,
    is_dir: bool,
    options: &TransferOptions,
) -> Result<Option<PathBuf>> {
    let handler = source.handler();
    if !is_dir {
        let file = handler
            .download_file(source.address(), local, options.force_overwrite)
            .await?;
        return Ok(Some(file));
    }

    match handler
        .download_directory(source.address(), local, options)
        .await?
    {
        Some(download) => {
            tracing::debug!(
                source = %source,
                files = download.files.len(),
                "Directory downloaded"
            );
            Ok(Some(download.root))
        }
        None => {
            tracing::warn!(source = %source, "No objects found below source directory");
            tokio::fs::create_dir_all(local).await?;
            Ok(None)
        }
    }
}

async fn stage_through_local(
    source: &AnyPath,
    destination: &AnyPath,
    is_dir: bool,
    options: &TransferOptions,
) -> Result<()> {
    let handler = destination.handler();

    if let Some(local) = source.local_path() {
        if is_dir {
            handler
                .upload_directory(&local, destination.address(), options)
                .await?;
        } else {
            handler.upload_file(&local, destination.address()).await?;
        }
        return Ok(());
    }

    let staging_root = source.registry().cache().staging_dir();
    tokio::fs::create_dir_all(&staging_root).await?;
    // Removed on drop, whichever way this function returns
    let scratch = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&staging_root)?;
    let staged = scratch.path().join(staged_name(source));
    tracing::debug!(staging = %staged.display(), "Staging through local disk");

    match pull_to_local(source, &staged, is_dir, &options.clone().force_overwrite(true)).await? {
        Some(root) if is_dir => {
            handler
                .upload_directory(&root, destination.address(), options)
                .await?;
        }
        Some(file) => handler.upload_file(&file, destination.address()).await?,
        None => tracing::warn!(source = %source, "Nothing to upload"),
    }
    Ok(())
}

fn staged_name(source: &AnyPath) -> String {
    match source.name() {
        name if name.is_empty() => "staged".to_string(),
        name => name,
    }
}
