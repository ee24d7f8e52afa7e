//! Validation utilities for API handlers

use std::path::Path;

/// Validate that Content-Type matches the file extension
/// This prevents Content-Type spoofing attacks where malicious files
/// are uploaded with legitimate Content-Types.
pub fn validate_extension_content_type_match(
    filename: &str,
    content_type: &str,
) -> Result<(), String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if extension.is_empty() {
        return Err("File must have an extension".to_string());
    }

    let normalized_content_type = content_type.to_lowercase();

    // Map common image extensions to expected Content-Types
    let expected_content_types: Vec<&str> = match extension.as_str() {
        "jpg" | "jpeg" => vec!["image/jpeg"],
        "png" => vec!["image/png"],
        "gif" => vec!["image/gif"],
        "webp" => vec!["image/webp"],
        "avif" => vec!["image/avif"],
        "bmp" => vec!["image/bmp"],
        "heic" => vec!["image/heic", "image/heif"],
        _ => {
            // For unknown extensions, skip cross-validation but log a warning
            // The extension and content-type will still be validated individually
            tracing::debug!(
                extension = %extension,
                content_type = %content_type,
                "Unknown extension, skipping Content-Type/extension cross-validation"
            );
            return Ok(());
        }
    };

    // Check if the provided Content-Type matches any expected type for this extension
    if !expected_content_types.iter().any(|ct| {
        normalized_content_type == *ct || normalized_content_type.starts_with(&format!("{};", ct))
    }) {
        return Err(format!(
            "Content-Type '{}' does not match extension '{}'. Expected one of: {}",
            content_type,
            extension,
            expected_content_types.join(", ")
        ));
    }

    Ok(())
}
