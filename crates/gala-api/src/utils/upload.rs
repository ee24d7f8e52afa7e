//! Common utilities for file upload handlers

use axum::extract::Multipart;
use gala_core::AppError;

/// A single file pulled out of a multipart upload body.
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// Extract all files from a multipart form.
/// Fields must be named "files"; other field names are ignored.
pub async fn extract_image_batch(
    mut multipart: Multipart,
    max_files: usize,
) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "files" {
            if files.len() >= max_files {
                return Err(AppError::InvalidInput(format!(
                    "Too many files; at most {} files are allowed per upload",
                    max_files
                )));
            }

            let file_name = field
                .file_name()
                .map(|s: &str| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let content_type = field
                .content_type()
                .map(|s: &str| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

            files.push(UploadedFile {
                data: data.to_vec(),
                file_name,
                content_type,
            });
        }
    }

    if files.is_empty() {
        return Err(AppError::InvalidInput(
            "No files provided; send at least one field named 'files'".to_string(),
        ));
    }

    Ok(files)
}

/// Extract the probe photo from a multipart form.
/// Only one field named "selfie" is accepted; multiple fields are rejected.
pub async fn extract_selfie(mut multipart: Multipart) -> Result<(Vec<u8>, String), AppError> {
    let mut selfie_data: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "selfie" {
            if selfie_data.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple selfie fields are not allowed; send exactly one field named 'selfie'"
                        .to_string(),
                ));
            }
            content_type = field.content_type().map(|s: &str| s.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

            selfie_data = Some(data.to_vec());
        }
    }

    let selfie_data =
        selfie_data.ok_or_else(|| AppError::InvalidInput("No selfie provided".to_string()))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((selfie_data, content_type))
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Validate content type against allowlist. Compares normalized MIME type only (no parameter bypass).
pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !allowed_types.iter().any(|ct| normalized == ct.to_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

/// Validate file extension
pub fn validate_file_extension(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, AppError> {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    if !allowed_extensions.contains(&extension) {
        return Err(AppError::InvalidInput(format!(
            "Invalid file extension. Allowed extensions: {}",
            allowed_extensions.join(", ")
        )));
    }

    Ok(extension)
}

/// Sanitize filename to prevent path traversal and invalid characters.
/// Returns an error if the filename contains path traversal attempts.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    if filename.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}

/// Validate Content-Type matches extension (wrapper for validation module)
pub fn validate_extension_content_type_match(
    filename: &str,
    content_type: &str,
) -> Result<(), AppError> {
    crate::validation::validate_extension_content_type_match(filename, content_type)
        .map_err(AppError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("foo/../bar").is_err());
        assert!(sanitize_filename("....").is_err());
    }

    #[test]
    fn sanitize_filename_accepts_valid_names() {
        assert_eq!(sanitize_filename("image.png").unwrap(), "image.png");
        assert_eq!(sanitize_filename("my-file_1.jpg").unwrap(), "my-file_1.jpg");
    }

    #[test]
    fn sanitize_filename_replaces_special_characters() {
        assert_eq!(
            sanitize_filename("my photo (1).jpg").unwrap(),
            "my_photo__1_.jpg"
        );
    }

    #[test]
    fn validate_content_type_ignores_parameters() {
        let allowed = vec!["image/jpeg".to_string()];
        assert!(validate_content_type("image/jpeg; charset=utf-8", &allowed).is_ok());
        assert!(validate_content_type("image/png", &allowed).is_err());
    }

    #[test]
    fn validate_file_extension_is_case_insensitive() {
        let allowed = vec!["jpg".to_string(), "png".to_string()];
        assert_eq!(validate_file_extension("photo.JPG", &allowed).unwrap(), "jpg");
        assert!(validate_file_extension("photo.gif", &allowed).is_err());
    }

    #[test]
    fn validate_file_size_enforces_limit() {
        assert!(validate_file_size(100, 200).is_ok());
        assert!(validate_file_size(300, 200).is_err());
    }
}
