//! Unpacking of downloaded tool archives.
//!
//! ffmpeg ships as a zip or tar archive whose inner layout differs per
//! builder, so this module both unpacks the formats the catalog uses and
//! knows how to find a named executable inside the resulting tree.
//!
//! Entries that could escape the destination (absolute paths, `..`
//! components, symlinks, hardlinks) are skipped rather than rejected
//! wholesale; the archives are trusted release builds and a stray metadata
//! entry should not abort provisioning.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::types::ArtifactKind;

/// Unpacks `archive` into `dest_dir`, creating it if needed.
///
/// # Errors
///
/// Fails when the archive is unreadable or malformed, or when `dest_dir`
/// cannot be written. [`ArtifactKind::Binary`] is not an archive and is
/// rejected.
pub fn extract_archive(archive: &Path, dest_dir: &Path, kind: ArtifactKind) -> Result<()> {
    debug!("Unpacking {} as {:?}", archive.display(), kind);

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let open = || {
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))
    };

    match kind {
        ArtifactKind::Zip => unpack_zip(open()?, dest_dir),
        ArtifactKind::TarGz => unpack_tar(flate2::read::GzDecoder::new(BufReader::new(open()?)), dest_dir),
        ArtifactKind::TarXz => unpack_tar(xz2::read::XzDecoder::new(BufReader::new(open()?)), dest_dir),
        ArtifactKind::Binary => anyhow::bail!("bare binaries are installed without extraction"),
    }
    .with_context(|| format!("Failed to unpack {}", archive.display()))
}

fn unpack_zip(file: File, dest_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(file).context("not a valid zip archive")?;

    for index in 0..archive.len() {
        let mut item = archive.by_index(index)?;

        // enclosed_name already refuses traversal and absolute paths
        let Some(relative) = item.enclosed_name() else {
            warn!("Skipping zip entry with unsafe name");
            continue;
        };
        let out_path = dest_dir.join(relative);

        if item.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        io::copy(&mut item, &mut out)?;

        preserve_mode(&out_path, item.unix_mode())?;
    }

    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for item in archive.entries()? {
        let mut item = item?;
        let kind = item.header().entry_type();

        // Links could point anywhere; none of the tool archives need them
        // to produce a working binary.
        if kind.is_symlink() || kind.is_hard_link() {
            warn!("Skipping link entry in tar archive");
            continue;
        }

        let Some(relative) = sanitize_entry_path(&item.path()?) else {
            warn!("Skipping tar entry with unsafe path");
            continue;
        };
        let out_path = dest_dir.join(relative);

        if kind.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else if kind.is_file() {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            io::copy(&mut item, &mut out)?;

            preserve_mode(&out_path, item.header().mode().ok())?;
        }
        // Other entry kinds (fifos, devices) are ignored.
    }

    Ok(())
}

/// Returns the entry path if it stays strictly inside the extraction root.
///
/// With link entries skipped, rejecting absolute paths and `..` components
/// is sufficient to prevent escapes.
fn sanitize_entry_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Carries an archive entry's executable bit through to disk (Unix only).
#[allow(unused_variables)]
fn preserve_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Some(mode) = mode {
            if mode & 0o111 != 0 {
                fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))
                    .with_context(|| format!("Failed to chmod {}", path.display()))?;
            }
        }
    }
    Ok(())
}

/// Marks a file executable. No-op on Windows.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let current = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .permissions()
            .mode();
        fs::set_permissions(path, fs::Permissions::from_mode(current | 0o755))
            .with_context(|| format!("Failed to chmod {}", path.display()))?;
        debug!("Marked {} executable", path.display());
    }
    Ok(())
}

// ============================================================================
// Executable Lookup
// ============================================================================

/// Finds an executable named `name` inside an extracted tree.
///
/// Checks the layouts the ffmpeg builders actually use, cheapest first:
/// the root itself, a single versioned top-level folder, a `bin/` subfolder
/// one level down, then a full walk as a last resort.
pub fn locate_executable(root: &Path, name: &str) -> Option<PathBuf> {
    let direct = root.join(name);
    if direct.is_file() {
        return Some(direct);
    }

    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            for candidate in [dir.join(name), dir.join("bin").join(name)] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    walk_for_file(root, name)
}

fn walk_for_file(root: &Path, name: &str) -> Option<PathBuf> {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.file_name().is_some_and(|f| f == name) {
                return Some(path);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Builds a tar archive from (path, mode, contents) triples, compressed
    /// by `wrap`.
    fn build_tar<W: Write>(dest: W, files: &[(&str, u32, &[u8])]) -> W {
        let mut builder = tar::Builder::new(dest);
        for (path, mode, contents) in files {
            let mut header = tar::Header::new_gnu();
            // set_path refuses `..` components, which the traversal test
            // needs in its fixture, so write the name bytes directly.
            header.as_gnu_mut().unwrap().name[..path.len()]
                .copy_from_slice(path.as_bytes());
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append(&header, *contents).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn unpacks_zip_with_nested_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ffmpeg.zip");
        let out = temp.path().join("out");

        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            zip.start_file("ffmpeg", options).unwrap();
            zip.write_all(b"fake binary").unwrap();
            zip.start_file("doc/README", options).unwrap();
            zip.write_all(b"docs").unwrap();
            zip.finish().unwrap();
        }

        extract_archive(&archive, &out, ArtifactKind::Zip).unwrap();
        assert!(out.join("ffmpeg").is_file());
        assert_eq!(fs::read(out.join("doc/README")).unwrap(), b"docs");
    }

    #[test]
    fn unpacks_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ffmpeg.tar.gz");
        let out = temp.path().join("out");

        let encoder = build_tar(
            flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            ),
            &[("ffmpeg-release/ffmpeg", 0o755, b"fake binary")],
        );
        encoder.finish().unwrap();

        extract_archive(&archive, &out, ArtifactKind::TarGz).unwrap();
        assert!(out.join("ffmpeg-release/ffmpeg").is_file());
    }

    #[test]
    fn unpacks_tar_xz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ffmpeg.tar.xz");
        let out = temp.path().join("out");

        let encoder = build_tar(
            xz2::write::XzEncoder::new(File::create(&archive).unwrap(), 6),
            &[("ffmpeg", 0o755, b"fake binary")],
        );
        encoder.finish().unwrap();

        extract_archive(&archive, &out, ArtifactKind::TarXz).unwrap();
        assert!(out.join("ffmpeg").is_file());
    }

    #[test]
    fn bare_binary_is_not_extractable() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("yt-dlp");
        fs::write(&file, b"binary").unwrap();

        assert!(
            extract_archive(&file, &temp.path().join("out"), ArtifactKind::Binary).is_err()
        );
    }

    #[test]
    fn traversal_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sneaky.tar.gz");
        let out = temp.path().join("out");
        let escape = temp.path().join("escaped");

        let encoder = build_tar(
            flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            ),
            &[
                ("ok.txt", 0o644, b"fine" as &[u8]),
                ("../escaped", 0o644, b"should not land outside"),
            ],
        );
        encoder.finish().unwrap();

        extract_archive(&archive, &out, ArtifactKind::TarGz).unwrap();
        assert!(out.join("ok.txt").is_file());
        assert!(!escape.exists(), "entry escaped the extraction root");
    }

    #[test]
    fn symlink_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("linked.tar.gz");
        let out = temp.path().join("out");
        let escape = temp.path().join("target.txt");

        {
            let encoder = flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(encoder);

            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_mode(0o777);
            link.set_cksum();
            builder
                .append_link(&mut link, "jump", "../target.txt")
                .unwrap();

            // A file written through the link would land outside `out`.
            let payload = b"outside";
            let mut header = tar::Header::new_gnu();
            header.set_path("jump").unwrap();
            header.set_size(payload.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &payload[..]).unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive, &out, ArtifactKind::TarGz).unwrap();
        assert!(!escape.exists(), "symlink was followed outside the root");
    }

    #[cfg(unix)]
    #[test]
    fn archive_exec_bit_is_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ffmpeg.tar.gz");
        let out = temp.path().join("out");

        let encoder = build_tar(
            flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            ),
            &[("ffmpeg", 0o755, b"fake binary")],
        );
        encoder.finish().unwrap();

        extract_archive(&archive, &out, ArtifactKind::TarGz).unwrap();
        let mode = fs::metadata(out.join("ffmpeg")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[cfg(unix)]
    #[test]
    fn make_executable_sets_the_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("tool");
        fs::write(&file, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file).unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn finds_executable_at_root() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ffmpeg"), b"bin").unwrap();
        assert_eq!(
            locate_executable(temp.path(), "ffmpeg"),
            Some(temp.path().join("ffmpeg"))
        );
    }

    #[test]
    fn finds_executable_in_versioned_folder() {
        // johnvansickle layout: ffmpeg-7.0-amd64-static/ffmpeg
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("ffmpeg-7.0-amd64-static");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("ffmpeg"), b"bin").unwrap();

        assert_eq!(
            locate_executable(temp.path(), "ffmpeg"),
            Some(sub.join("ffmpeg"))
        );
    }

    #[test]
    fn finds_executable_in_bin_subfolder() {
        // gyan.dev layout: ffmpeg-release-essentials/bin/ffmpeg.exe
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("ffmpeg-release-essentials").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("ffmpeg.exe"), b"bin").unwrap();

        assert_eq!(
            locate_executable(temp.path(), "ffmpeg.exe"),
            Some(bin.join("ffmpeg.exe"))
        );
    }

    #[test]
    fn missing_executable_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(locate_executable(temp.path(), "ffmpeg").is_none());
    }
}
