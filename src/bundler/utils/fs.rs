//! File system utilities for staging work directories.
//!
//! Provides idempotent directory removal, symlink-preserving tree copies,
//! and permission helpers.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        create_dir_all(dest_dir).await?;
    }
    fs::copy(from, to).await.fs_context("copying file", to)?;
    Ok(())
}

/// Sets unix permission bits on a path.
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .fs_context("setting permissions", path)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Symbolic links are recreated with their original target string and never
/// followed, so dangling and absolute links survive unchanged.
/// Fails if the source path is not a directory or doesn't exist.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!(
            "{from:?} does not exist or is not a directory"
        )));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from).follow_links(false) {
            let entry = entry?;
            debug_assert!(entry.path().starts_with(&from));
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target =
                    std::fs::read_link(entry.path()).fs_context("reading link", entry.path())?;
                std::os::unix::fs::symlink(&target, &dest_path)
                    .fs_context("creating link", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("copying file", &dest_path)?;
            }
        }

        Ok::<(), Error>(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}
