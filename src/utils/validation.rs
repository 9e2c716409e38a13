use std::path::Path;
use thiserror::Error;

/// Longest filename S3 keys comfortably allow once the user prefix is added
pub const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Error, PartialEq)]
pub enum FilenameError {
    #[error("Filename cannot be empty")]
    Empty,
    #[error("Filename exceeds {} characters", MAX_FILENAME_LEN)]
    TooLong,
    #[error("Image key must stay inside the user's folder")]
    OutsidePrefix,
}

/// Reduce a client-supplied filename to a safe single path component
pub fn sanitize_filename(filename: &str) -> Result<String, FilenameError> {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from filename: {}", filename);
    }

    // Browsers on Windows may still send backslash separated paths
    let last = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        return Err(FilenameError::Empty);
    }
    if sanitized.chars().count() > MAX_FILENAME_LEN {
        return Err(FilenameError::TooLong);
    }

    Ok(sanitized)
}

/// Check a name taken from a listing, such as `album/cat.png`, for use as a
/// key under the user's prefix. Unlike [`sanitize_filename`] nothing is
/// rewritten: a name that cannot address an object inside the prefix is rejected.
pub fn validate_object_name(name: &str) -> Result<&str, FilenameError> {
    if name.is_empty() {
        return Err(FilenameError::Empty);
    }
    if name.chars().count() > MAX_FILENAME_LEN {
        return Err(FilenameError::TooLong);
    }
    let escapes = name.contains('\\')
        || name.chars().any(char::is_control)
        || name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes {
        return Err(FilenameError::OutsidePrefix);
    }
    Ok(name)
}

/// Storage key of a user's image
pub fn object_key(user_id: &str, filename: &str) -> String {
    format!("{}/{}", user_id, filename)
}

/// Listing prefix covering every image of a user
pub fn user_prefix(user_id: &str) -> String {
    format!("{}/", user_id)
}
