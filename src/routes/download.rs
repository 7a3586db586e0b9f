use axum::{
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Extension,
};

use crate::{
    errors::{AppError, AppResult},
    extractors, AppContext,
};

pub async fn download_endpoint(
    ctx: Extension<AppContext>,
    extractors::Path(file_id): extractors::Path<i64>,
) -> AppResult<impl IntoResponse> {
    let file = match ctx.files.fetch_file(file_id).await {
        Ok(file) => file.ok_or(AppError::FileNotFound)?,
        Err(why) => {
            tracing::warn!("failed to look up file {file_id}: {why:?}");
            return Err(AppError::FileNotFound);
        }
    };

    // expired rows are kept, so they answer 410 rather than 404
    if file.is_expired(ctx.clock.now()) {
        return Err(AppError::FileExpired);
    }

    Ok((StatusCode::FOUND, [(LOCATION, file.file_url)]))
}
