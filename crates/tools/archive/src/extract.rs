//! Placing downloaded payloads on disk.
//!
//! Zip and tar archives honour the request's extraction sub-path: only
//! entries under that prefix are written, with the prefix stripped.
//! Single-file gzip and raw payloads ignore it.

use flate2::read::GzDecoder;
use rigging_core::{ArchiveKind, Error, FetchRequest, Result};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, trace};

use crate::sniff;

/// Validate `payload` as `request.archive_kind` and write it out.
///
/// # Errors
///
/// Returns [`Error::Format`] when the payload is not the declared kind and
/// [`Error::Io`] when writing fails.
pub fn extract(request: &FetchRequest<'_>, payload: &[u8]) -> Result<()> {
    if let Some(reason) = sniff::check(request.archive_kind, payload) {
        return Err(format_error(request, reason));
    }

    let written = match request.archive_kind {
        ArchiveKind::Zip => extract_zip(request, payload)?,
        ArchiveKind::Tar => extract_tar(request, Archive::new(Cursor::new(payload)))?,
        ArchiveKind::GzipTar => {
            extract_tar(request, Archive::new(GzDecoder::new(Cursor::new(payload))))?
        }
        ArchiveKind::Gzip => extract_gzip(request, payload)?,
        ArchiveKind::RawBinary => place_raw(request, payload)?,
    };

    debug!(
        id = %request.id,
        kind = %request.archive_kind,
        destination = ?request.destination,
        entries = written,
        "Extracted payload"
    );
    Ok(())
}

fn format_error(request: &FetchRequest<'_>, message: impl Into<String>) -> Error {
    Error::format(
        request.id,
        request.url,
        request.archive_kind.as_str(),
        message,
    )
}

/// Path of `entry` relative to the extraction prefix.
///
/// `None` for entries outside the prefix, the prefix itself, and anything
/// that is not a plain relative path.
fn relative_entry_path(entry: &Path, prefix: Option<&str>) -> Option<PathBuf> {
    let entry: PathBuf = entry
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let relative = match prefix {
        Some(prefix) => {
            let prefix: PathBuf = Path::new(prefix.trim_matches('/'))
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect();
            entry.strip_prefix(&prefix).ok()?.to_path_buf()
        }
        None => entry,
    };

    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    (plain && relative.components().next().is_some()).then_some(relative)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create directory"))?;
    }
    Ok(())
}

fn write_file(path: &Path, mut reader: impl Read) -> Result<()> {
    create_parent(path)?;
    let mut file = File::create(path).map_err(|e| Error::io(e, path, "create file"))?;
    std::io::copy(&mut reader, &mut file).map_err(|e| Error::io(e, path, "write file"))?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io(e, path, "set permissions"))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn extract_zip(request: &FetchRequest<'_>, payload: &[u8]) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(payload))
        .map_err(|e| format_error(request, format!("failed to open zip: {e}")))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| format_error(request, format!("failed to read zip entry: {e}")))?;

        let Some(name) = file.enclosed_name() else {
            trace!(entry = %file.name(), "Skipping zip entry with unsafe path");
            continue;
        };
        let Some(relative) = relative_entry_path(&name, request.extract_path) else {
            continue;
        };
        let outpath = request.destination.join(relative);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| Error::io(e, &outpath, "create directory"))?;
            continue;
        }

        write_file(&outpath, &mut file)?;
        if let Some(mode) = file.unix_mode() {
            set_mode(&outpath, mode)?;
        }
        written += 1;
    }

    ensure_any(request, written)
}

fn extract_tar<R: Read>(request: &FetchRequest<'_>, mut archive: Archive<R>) -> Result<usize> {
    std::fs::create_dir_all(request.destination)
        .map_err(|e| Error::io(e, request.destination, "create directory"))?;

    let entries = archive
        .entries()
        .map_err(|e| format_error(request, format!("failed to read tar: {e}")))?;

    let mut written = 0;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| format_error(request, format!("failed to read tar entry: {e}")))?;

        if request.extract_path.is_none() {
            let unpacked = entry
                .unpack_in(request.destination)
                .map_err(|e| Error::io(e, request.destination, "unpack tar entry"))?;
            written += usize::from(unpacked);
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| format_error(request, format!("invalid path in tar: {e}")))?
            .into_owned();
        let Some(relative) = relative_entry_path(&path, request.extract_path) else {
            continue;
        };

        // `unpack` does not sanitise its destination, so links are never
        // recreated here and every parent must be a real directory.
        if entry.header().entry_type().is_symlink() || entry.header().entry_type().is_hard_link()
        {
            trace!(entry = ?path, "Skipping link entry under extraction sub-path");
            continue;
        }
        ensure_no_symlink_parents(request.destination, &relative)?;

        let outpath = request.destination.join(relative);
        create_parent(&outpath)?;
        entry
            .unpack(&outpath)
            .map_err(|e| Error::io(e, &outpath, "unpack tar entry"))?;
        written += 1;
    }

    ensure_any(request, written)
}

/// Reject `relative` if any existing directory between `root` and the
/// entry is a symbolic link.
fn ensure_no_symlink_parents(root: &Path, relative: &Path) -> Result<()> {
    let mut current = root.to_path_buf();
    let parents = relative.parent().into_iter().flat_map(Path::components);
    for component in parents {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(Error::io(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "archive entry would be written through a symbolic link",
                    ),
                    &current,
                    "unpack tar entry",
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(Error::io(e, &current, "inspect directory")),
        }
    }
    Ok(())
}

fn ensure_any(request: &FetchRequest<'_>, written: usize) -> Result<usize> {
    match request.extract_path {
        Some(prefix) if written == 0 => Err(format_error(
            request,
            format!("archive has no entries under '{prefix}'"),
        )),
        _ => Ok(written),
    }
}

/// File name for single-file payloads placed into a directory.
fn file_name_from_url(url: &str, strip_suffix: Option<&str>) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().filter(|s| !s.is_empty())?;
    let name = strip_suffix
        .and_then(|suffix| segment.strip_suffix(suffix))
        .unwrap_or(segment);
    (!name.is_empty()).then(|| name.to_string())
}

fn extract_gzip(request: &FetchRequest<'_>, payload: &[u8]) -> Result<usize> {
    let name = request
        .binary_name
        .map(String::from)
        .or_else(|| file_name_from_url(request.url, Some(".gz")))
        .ok_or_else(|| format_error(request, "cannot name the decompressed file"))?;

    let mut content = Vec::new();
    GzDecoder::new(Cursor::new(payload))
        .read_to_end(&mut content)
        .map_err(|e| format_error(request, format!("failed to decompress: {e}")))?;

    let outpath = request.destination.join(name);
    write_file(&outpath, content.as_slice())?;
    set_mode(&outpath, 0o755)?;
    Ok(1)
}

fn place_raw(request: &FetchRequest<'_>, payload: &[u8]) -> Result<usize> {
    // With a binary name the destination already is the file path.
    let outpath = if request.binary_name.is_some() {
        request.destination.to_path_buf()
    } else {
        let name = file_name_from_url(request.url, None)
            .ok_or_else(|| format_error(request, "cannot name the downloaded file"))?;
        request.destination.join(name)
    };

    write_file(&outpath, payload)?;
    set_mode(&outpath, 0o755)?;
    Ok(1)
}
