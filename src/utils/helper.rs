use chrono::NaiveDate;
use uuid::Uuid;
use crate::types::ids::{FileId, FolderId};
use crate::utils::hash::digest_hex;

/// Identity of guest sessions and of blank display names.
pub const ANONYMOUS_USER: &str = "user";

const NAME_DIGEST_CHARS: usize = 12;

/// Make a user display name safe for file names: ASCII letters, digits and
/// `-` are kept, every other run of characters becomes a single `_`.
///
/// A non-blank name with nothing ASCII in it maps to `user-` plus a short
/// digest of the trimmed name, so distinct users never share day-files with
/// each other or with the guest identity.
pub fn sanitize_user_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            if pending_separator && !sanitized.is_empty() {
                sanitized.push('_');
            }
            pending_separator = false;
            sanitized.push(c);
        } else {
            pending_separator = true;
        }
    }

    let trimmed = name.trim();
    if !sanitized.is_empty() {
        sanitized
    } else if trimmed.is_empty() {
        ANONYMOUS_USER.to_string()
    } else {
        let digest = digest_hex(trimmed.as_bytes());
        format!("{}-{}", ANONYMOUS_USER, &digest[..NAME_DIGEST_CHARS])
    }
}

/// `YYYYMMDD`
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `YYYY-MM-DD`
pub fn dashed_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Generate a new blob-store file id
pub fn generate_file_id() -> FileId {
    FileId(Uuid::new_v4().to_string())
}

/// Generate a new blob-store folder id
pub fn generate_folder_id() -> FolderId {
    FolderId(Uuid::new_v4().to_string())
}
