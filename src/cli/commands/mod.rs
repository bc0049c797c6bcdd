pub mod admin;
pub mod auth;
pub mod members;
pub mod profile;

use std::path::Path;

use kindred::domain::PhotoUpload;

/// Read an image from disk for upload.
pub(crate) async fn read_photo(path: &Path) -> anyhow::Result<PhotoUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(PhotoUpload::from_file_name(file_name, bytes))
}
