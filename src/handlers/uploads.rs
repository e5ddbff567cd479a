use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::auth::AdminUser;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::handlers::common::success_response;
use crate::AppState;

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/", post(upload_file))
}

#[derive(Debug, Serialize)]
struct FileUploadResponse {
    message: String,
    url: String,
}

/// Store an uploaded media file under the upload directory and return the
/// public URL it is served at. Filenames are timestamp-prefixed so repeated
/// uploads of the same file never collide.
async fn upload_file(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(format!("Invalid multipart body: {}", e)))?
        .ok_or_else(|| ServiceError::ValidationError("No file provided".into()))?;

    let original_name = field
        .file_name()
        .map(|name| name.replace(' ', "_"))
        .unwrap_or_else(|| "upload".to_string());
    let filename = format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), original_name);

    let data = field.bytes().await.map_err(|e| {
        ServiceError::ValidationError(format!("Failed to read upload: {}", e))
    })?;

    let dir = std::path::Path::new(&state.config.upload_dir);
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!("Could not create upload directory: {}", e);
        return Err(ServiceError::InternalServerError);
    }
    if let Err(e) = tokio::fs::write(dir.join(&filename), &data).await {
        error!("File upload failed: {}", e);
        return Err(ServiceError::InternalServerError);
    }

    let url = format!("/uploads/{}", filename);
    info!(%url, bytes = data.len(), "file uploaded");
    state
        .event_sender
        .send_or_log(Event::FileUploaded { url: url.clone() })
        .await;

    Ok(success_response(FileUploadResponse {
        message: "File uploaded successfully".to_string(),
        url,
    }))
}
