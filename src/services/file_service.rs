use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::AppError;

const MAX_COLLISION_ATTEMPTS: usize = 10_000;

pub fn hash_file(path: &Path) -> Result<String, AppError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Most filesystems cap a single name at 255 bytes.
pub const MAX_NAME_BYTES: usize = 255;
/// Room a collision counter can take, `_10000` at most.
pub const MAX_SUFFIX_CHARS: usize = 6;

/// Longest prefix of `value` within both limits.
fn clip(value: &str, max_chars: usize, max_bytes: usize) -> &str {
    let mut end = 0;
    for (count, (idx, c)) in value.char_indices().enumerate() {
        if count + 1 > max_chars || idx + c.len_utf8() > max_bytes {
            break;
        }
        end = idx + c.len_utf8();
    }
    &value[..end]
}

/// First free path in `dir` for `stem.ext`, appending `_1`, `_2`, ... on collision.
/// A suffixed name is shortened so the whole file name stays within
/// `max_chars` characters and `MAX_NAME_BYTES` bytes.
pub fn unique_path(
    dir: &Path,
    stem: &str,
    extension: Option<&str>,
    max_chars: Option<usize>,
) -> Result<PathBuf, AppError> {
    let ext = match extension {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    };
    let file_name = |suffix: Option<usize>| match suffix {
        Some(n) => {
            let suffix = format!("_{n}{ext}");
            let char_room = max_chars
                .unwrap_or(usize::MAX)
                .saturating_sub(suffix.chars().count());
            let byte_room = MAX_NAME_BYTES.saturating_sub(suffix.len());
            format!("{}{suffix}", clip(stem, char_room, byte_room))
        }
        None => format!("{stem}{ext}"),
    };

    let candidate = dir.join(file_name(None));
    if !candidate.exists() {
        return Ok(candidate);
    }
    for n in 1..=MAX_COLLISION_ATTEMPTS {
        let candidate = dir.join(file_name(Some(n)));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(AppError::General(format!(
        "no free name for {stem} in {} after {MAX_COLLISION_ATTEMPTS} attempts",
        dir.display()
    )))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_string())
}

/// Renames `source` to `new_stem` in the same directory, keeping its extension.
/// Returns the source unchanged when the stem is already `new_stem`.
pub fn rename_unique(
    source: &Path,
    new_stem: &str,
    max_chars: Option<usize>,
) -> Result<PathBuf, AppError> {
    if new_stem.is_empty() {
        return Err(AppError::General("new file name is empty".to_string()));
    }
    let current_stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if current_stem == new_stem {
        return Ok(source.to_path_buf());
    }

    let parent = source
        .parent()
        .ok_or_else(|| AppError::General(format!("invalid source path: {}", source.display())))?;
    let destination = unique_path(parent, new_stem, extension_of(source).as_deref(), max_chars)?;
    fs::rename(source, &destination)?;
    Ok(destination)
}

/// Moves `source` into `dest_dir`, resolving name collisions like `rename_unique`.
pub fn move_into_dir(
    source: &Path,
    dest_dir: &Path,
    max_chars: Option<usize>,
) -> Result<PathBuf, AppError> {
    if !dest_dir.is_dir() {
        return Err(AppError::General(format!(
            "destination is not a directory: {}",
            dest_dir.display()
        )));
    }
    if source.parent() == Some(dest_dir) {
        return Ok(source.to_path_buf());
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| AppError::General(format!("invalid source path: {}", source.display())))?;
    let destination = unique_path(dest_dir, &stem, extension_of(source).as_deref(), max_chars)?;

    if fs::rename(source, &destination).is_err() {
        fs::copy(source, &destination)?;
        fs::remove_file(source)?;
    }
    Ok(destination)
}
