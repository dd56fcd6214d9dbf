use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::config::get_config;
use crate::error::{Error, Result};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Why an upload cannot be stored, if it cannot.
pub fn upload_problem(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return Some("Uploaded file is empty".to_string());
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Some(format!(
            "File is too large (max {} MB)",
            MAX_UPLOAD_BYTES / 1024 / 1024
        ));
    }
    None
}

/// Writes an upload under `UPLOADS_DIR/<subdir>/` and returns its path relative to the uploads root.
pub async fn store_upload(subdir: &str, extension: &str, data: &[u8]) -> Result<String> {
    if let Some(problem) = upload_problem(data) {
        return Err(Error::BadRequest(problem));
    }

    let root = PathBuf::from(&get_config().uploads_dir);
    let dir = root.join(subdir);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    tokio::fs::write(dir.join(&file_name), data).await?;
    Ok(format!("{}/{}", subdir, file_name))
}

/// Resolves a stored relative path, refusing anything that escapes the uploads root.
pub fn resolve_upload(relative: &str) -> Result<PathBuf> {
    if !is_safe_relative(relative) {
        return Err(Error::BadRequest("Invalid file path".to_string()));
    }
    Ok(PathBuf::from(&get_config().uploads_dir).join(relative))
}

pub async fn read_upload(relative: &str) -> Result<Vec<u8>> {
    let path = resolve_upload(relative)?;
    tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound("Stored file not found".to_string()),
        _ => Error::Io(e),
    })
}

/// Best-effort removal of stored uploads.
pub async fn remove_uploads(relative_paths: &[String]) {
    for relative in relative_paths {
        let removed = match resolve_upload(relative) {
            Ok(path) => tokio::fs::remove_file(&path).await.map_err(Error::Io),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            tracing::warn!(path = %relative, error = ?e, "could not remove stored upload");
        }
    }
}

fn is_safe_relative(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// File name safe to echo back in a Content-Disposition header.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    if cleaned.trim().is_empty() {
        "resume".to_string()
    } else {
        cleaned.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal() {
        assert!(is_safe_relative("resumes/abc.pdf"));
        assert!(!is_safe_relative("../etc/passwd"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("resumes/../../x"));
        assert!(!is_safe_relative(""));
    }

    #[test]
    fn empty_and_oversized_uploads_are_refused() {
        assert_eq!(upload_problem(b"").as_deref(), Some("Uploaded file is empty"));
        assert!(upload_problem(&vec![b'a'; MAX_UPLOAD_BYTES + 1]).is_some());
        assert!(upload_problem(&vec![b'a'; MAX_UPLOAD_BYTES]).is_none());
        assert!(upload_problem(b"resume text").is_none());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("C:\\docs\\cv \"final\".pdf"), "cv final.pdf");
        assert_eq!(sanitize_file_name("../../"), "resume");
    }
}
