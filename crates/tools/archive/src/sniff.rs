//! Payload sniffing.
//!
//! Servers routinely answer a missing artifact with `200 OK` and an HTML
//! page. Checking magic bytes before extraction turns that into a format
//! error naming the URL instead of an obscure decoder failure.

use rigging_core::ArchiveKind;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// End-of-central-directory record; an empty zip starts with it.
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;

/// Markup prefixes, compared case-insensitively after leading whitespace.
const MARKUP_PREFIXES: &[&[u8]] = &[b"<!doctype", b"<html", b"<?xml"];

/// Whether `payload` starts like an HTML or XML document.
#[must_use]
pub fn looks_like_markup(payload: &[u8]) -> bool {
    let start = payload
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(payload.len());
    let trimmed = &payload[start..];

    MARKUP_PREFIXES.iter().any(|prefix| {
        trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
    })
}

/// Whether `payload` carries the magic bytes of `kind`.
///
/// Raw binaries have no magic and always pass.
#[must_use]
pub fn has_magic(kind: ArchiveKind, payload: &[u8]) -> bool {
    match kind {
        ArchiveKind::Zip => {
            payload.starts_with(ZIP_MAGIC) || payload.starts_with(ZIP_EMPTY_MAGIC)
        }
        ArchiveKind::GzipTar | ArchiveKind::Gzip => payload.starts_with(GZIP_MAGIC),
        ArchiveKind::Tar => payload
            .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
            .is_some_and(|magic| magic == TAR_MAGIC),
        ArchiveKind::RawBinary => true,
    }
}

/// Reason `payload` cannot be `kind`, if any.
#[must_use]
pub fn check(kind: ArchiveKind, payload: &[u8]) -> Option<String> {
    if payload.is_empty() {
        return Some("payload is empty".to_string());
    }
    if looks_like_markup(payload) {
        return Some("payload looks like an HTML or XML document".to_string());
    }
    if !has_magic(kind, payload) {
        return Some(format!("payload does not start with the {kind} signature"));
    }
    None
}
