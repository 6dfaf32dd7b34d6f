//! Naming and location of stored ciphertext blobs.

use std::path::{Path, PathBuf};

use crate::runtime::normalize;

const ENCRYPTED_SUFFIX: &str = ".enc";

/// Blob name for a file upload: the original file name plus `.enc`.
pub fn binary_blob_name(original_name: &str) -> String {
    format!("{}{}", original_name, ENCRYPTED_SUFFIX)
}

/// Blob name for pasted code: `user<id>_<sanitized>.<ext>.enc`.
pub fn text_blob_name(user_id: i64, name: &str, runtime: &str) -> String {
    let extension = normalize(runtime)
        .map(|runtime| runtime.extension())
        .unwrap_or("txt");
    format!(
        "user{}_{}.{}{}",
        user_id,
        sanitize_name(name),
        extension,
        ENCRYPTED_SUFFIX
    )
}

/// Replaces every character that is not an ASCII letter or digit with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Absolute locations are kept, relative ones are resolved in the uploads dir.
pub fn resolve_code_location(uploads_dir: &Path, location: &str) -> PathBuf {
    let path = Path::new(location);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        uploads_dir.join(path)
    }
}
