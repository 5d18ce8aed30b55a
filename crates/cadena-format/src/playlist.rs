//! Playlist expansion for `.m3u` and `.pls` files.
//!
//! Entries are resolved relative to the playlist's own directory unless they
//! are absolute paths or URIs. Playlists may reference further playlists;
//! those are expanded in place.

use crate::error::{FormatError, Result};
use std::path::Path;

/// Whether `filename` names a playlist rather than an audio file.
pub fn is_playlist(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".m3u") || lower.ends_with(".pls")
}

fn is_uri(entry: &str) -> bool {
    entry
        .split_once(':')
        .map(|(scheme, rest)| {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
                && rest.starts_with("//")
        })
        .unwrap_or(false)
}

/// Expand a playlist into the audio filenames it references, recursing into
/// nested playlists.
pub fn expand_playlist(filename: &str) -> Result<Vec<String>> {
    let path = Path::new(filename);
    let is_pls = filename.to_ascii_lowercase().ends_with(".pls");
    let comment_char = if is_pls { ';' } else { '#' };
    let dir = path.parent().unwrap_or(Path::new(""));

    let text = std::fs::read_to_string(path).map_err(|e| FormatError::Playlist {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut entries = Vec::new();
    for line in text.lines() {
        // Strip trailing comments, then surrounding whitespace.
        let line = match line.find(comment_char) {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let entry = if is_pls {
            // Only `FileN=...` keys name tracks; everything else
            // ([playlist], Title, Length, ...) is ignored.
            match split_pls_file_key(line) {
                Some(value) => value.trim(),
                None => continue,
            }
        } else {
            line
        };
        if entry.is_empty() {
            continue;
        }

        let resolved = resolve_entry(dir, entry);
        if is_playlist(&resolved) {
            entries.extend(expand_playlist(&resolved)?);
        } else {
            entries.push(resolved);
        }
    }
    Ok(entries)
}

fn split_pls_file_key(line: &str) -> Option<&str> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let digits = key.get(4..)?;
    if key[..4].eq_ignore_ascii_case("file")
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
    {
        Some(value)
    } else {
        None
    }
}

fn resolve_entry(dir: &Path, entry: &str) -> String {
    if dir.as_os_str().is_empty() || is_uri(entry) || Path::new(entry).is_absolute() {
        entry.to_string()
    } else {
        dir.join(entry).to_string_lossy().into_owned()
    }
}
