//! Plain tar archive construction.
//!
//! The archive holds the work directory as its single top-level entry, with
//! symlinks stored as links.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::Compression,
};
use flate2::write::GzEncoder;
use xz2::write::XzEncoder;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `work_dir` into a tar archive at `artifact`.
///
/// gzip and xz honor `level` (0-9). `none` writes a bare tar.
pub async fn build(
    package: &str,
    work_dir: &Path,
    artifact: &Path,
    compression: Compression,
    level: u32,
) -> Result<()> {
    let entry_name = work_dir
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::GenericError(format!("{work_dir:?} has no file name")))?;
    let work_dir = work_dir.to_path_buf();
    let artifact = artifact.to_path_buf();
    let package = package.to_string();

    tokio::task::spawn_blocking(move || {
        log::info!("{}: archiving {} -> {}", package, work_dir.display(), artifact.display());
        let file = File::create(&artifact).fs_context("creating archive", &artifact)?;
        let written = match compression {
            Compression::None => write_tar(file, &entry_name, &work_dir).map(|_| ()),
            Compression::Gzip => {
                let encoder = GzEncoder::new(file, flate2::Compression::new(level));
                write_tar(encoder, &entry_name, &work_dir).and_then(|enc| enc.finish().map(|_| ()))
            }
            Compression::Xz => {
                let encoder = XzEncoder::new(file, level);
                write_tar(encoder, &entry_name, &work_dir).and_then(|enc| enc.finish().map(|_| ()))
            }
        };
        written.map_err(|e| {
            // A half-written archive is not an artifact.
            let _ = std::fs::remove_file(&artifact);
            Error::ArtifactBuildFailed {
                package: package.clone(),
                tool: format!("tar ({e})"),
                code: None,
            }
        })
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archive task panicked: {}", e)))?
}

fn write_tar<W: Write>(writer: W, entry_name: &Path, dir: &Path) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    builder.append_dir_all(entry_name, dir)?;
    builder.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::Distro;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn work_dir(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("pkg_1_amd64");
        std::fs::create_dir_all(dir.join("opt/bin")).unwrap();
        std::fs::write(dir.join("opt/bin/tool"), "bin").unwrap();
        std::os::unix::fs::symlink("/missing", dir.join("opt/link")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_gzip_archive_contents() {
        let temp = TempDir::new().unwrap();
        let dir = work_dir(&temp);
        let artifact = temp.path().join("pkg_1_amd64.tar.gz");

        build("pkg", &dir, &artifact, Compression::Gzip, 5)
            .await
            .unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&artifact).unwrap()));
        let mut names = Vec::new();
        let mut link_target = None;
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().into_owned();
            if entry.header().entry_type().is_symlink() {
                link_target = entry.link_name().unwrap().map(|l| l.into_owned());
            }
            names.push(path);
        }
        assert!(names.contains(&PathBuf::from("pkg_1_amd64/opt/bin/tool")));
        assert_eq!(link_target, Some(PathBuf::from("/missing")));
    }

    #[tokio::test]
    async fn test_uncompressed_archive() {
        let temp = TempDir::new().unwrap();
        let dir = work_dir(&temp);
        let artifact = temp.path().join("pkg_1_amd64.tar");

        build("pkg", &dir, &artifact, Compression::None, 0)
            .await
            .unwrap();

        let mut archive = tar::Archive::new(File::open(&artifact).unwrap());
        assert!(archive.entries().unwrap().count() >= 3);
    }

    #[tokio::test]
    async fn test_xz_archive() {
        let temp = TempDir::new().unwrap();
        let dir = work_dir(&temp);
        let name = Distro::Archive.profile().artifact_name("pkg", "1", "amd64", Compression::Xz);
        assert_eq!(name, "pkg_1_amd64.tar.xz");
        let artifact = temp.path().join(name);

        build("pkg", &dir, &artifact, Compression::Xz, 9)
            .await
            .unwrap();

        let bytes = std::fs::read(&artifact).unwrap();
        assert_eq!(&bytes[..6], &[0xfd, b'7', b'z', b'X', b'Z', 0x00]);
        let mut archive = tar::Archive::new(xz2::read::XzDecoder::new(bytes.as_slice()));
        let names: Vec<PathBuf> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().into_owned())
            .collect();
        assert!(names.contains(&PathBuf::from("pkg_1_amd64/opt/bin/tool")));
    }

    #[tokio::test]
    async fn test_missing_work_dir_fails() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("x.tar.gz");
        let res = build(
            "pkg",
            &temp.path().join("absent"),
            &artifact,
            Compression::Gzip,
            5,
        )
        .await;
        assert!(matches!(res, Err(Error::ArtifactBuildFailed { .. })));
        assert!(!artifact.exists());
    }
}
