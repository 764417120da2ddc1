use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::types::{ScanStats, WarningKind};

pub(crate) fn make_rel_path(root: &Path, abs_path: &Path) -> String {
    match abs_path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => abs_path.to_string_lossy().replace('\\', "/"),
    }
}

fn record_io_error(stats: &mut ScanStats, err: &io::Error) -> WarningKind {
    match err.kind() {
        io::ErrorKind::NotFound => {
            stats.skipped_not_found = stats.skipped_not_found.saturating_add(1);
        }
        io::ErrorKind::PermissionDenied => {
            stats.skipped_permission_denied = stats.skipped_permission_denied.saturating_add(1);
        }
        _ => {
            stats.skipped_walk_errors = stats.skipped_walk_errors.saturating_add(1);
        }
    }
    WarningKind::Unreadable {
        message: err.to_string(),
    }
}

/// Reads a source file as UTF-8 text.
///
/// Every failure is returned as the warning to record; the caller skips the
/// file and keeps going. A leading byte-order mark is dropped.
pub(crate) fn read_source_text(
    path: &Path,
    max_file_size: Option<u64>,
    stats: &mut ScanStats,
) -> Result<String, WarningKind> {
    let metadata = fs::metadata(path).map_err(|err| record_io_error(stats, &err))?;

    if let Some(max_file_size) = max_file_size
        && metadata.len() > max_file_size
    {
        stats.skipped_too_large = stats.skipped_too_large.saturating_add(1);
        return Err(WarningKind::TooLarge {
            size: metadata.len(),
        });
    }

    let mut file = fs::File::open(path).map_err(|err| record_io_error(stats, &err))?;
    let mut bytes: Vec<u8> = Vec::with_capacity(metadata.len().min(1024 * 1024) as usize);
    // The file may have grown since `metadata`; never read past the cap.
    let read = match max_file_size {
        Some(cap) => file.by_ref().take(cap.saturating_add(1)).read_to_end(&mut bytes),
        None => file.read_to_end(&mut bytes),
    };
    read.map_err(|err| record_io_error(stats, &err))?;

    if let Some(cap) = max_file_size
        && bytes.len() as u64 > cap
    {
        stats.skipped_too_large = stats.skipped_too_large.saturating_add(1);
        return Err(WarningKind::TooLarge {
            size: bytes.len() as u64,
        });
    }

    if bytes.contains(&0) {
        stats.skipped_binary = stats.skipped_binary.saturating_add(1);
        return Err(WarningKind::Binary);
    }

    let len = bytes.len() as u64;
    let mut text = String::from_utf8(bytes).map_err(|_| {
        stats.skipped_undecodable = stats.skipped_undecodable.saturating_add(1);
        WarningKind::Undecodable
    })?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }

    stats.scanned_files = stats.scanned_files.saturating_add(1);
    stats.scanned_bytes = stats.scanned_bytes.saturating_add(len);
    Ok(text)
}
