use axum::Extension;
use bytes::Bytes;

use crate::{
    errors::{AppError, AppResult},
    extractors,
    models::File,
    repository::InsertFile,
    storage::object_key,
    utilities::sanitize_file_name,
    AppContext,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

struct FilePart {
    file_name: String,
    content_type: String,
    data: Bytes,
}

async fn handle_upload(ctx: &AppContext, part: FilePart) -> AppResult<File> {
    let key = object_key(&ctx.cfg.storage.key_prefix);

    // object first, row second; a failed insert leaves the object orphaned
    let file_url = ctx
        .objects
        .put(&key, part.data, &part.content_type)
        .await
        .map_err(AppError::UploadFailed)?;

    let file = ctx
        .files
        .insert_file(InsertFile {
            filename: part.file_name,
            file_url,
            ttl: ctx.cfg.general.expiry_ttl(),
        })
        .await
        .map_err(|why| {
            tracing::error!("object `{key}` was stored but its metadata was not, leaving it orphaned");
            AppError::MetadataWriteFailed(why)
        })?;

    Ok(file)
}

pub async fn upload_endpoint(
    ctx: Extension<AppContext>,
    extractors::Multipart(mut multipart): extractors::Multipart,
) -> AppResult<String> {
    let mut upload = None;

    // drain the whole body before touching storage so a bad tail can't leave artifacts
    while let Some(field) = multipart.next_field().await? {
        if upload.is_some() || field.name() != Some("file") {
            continue;
        }

        let file_name = sanitize_file_name(field.file_name());
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;

        upload = Some(FilePart {
            file_name,
            content_type,
            data,
        });
    }

    let part = upload.ok_or(AppError::MissingFile)?;
    let file = handle_upload(&ctx, part).await?;
    tracing::info!("stored file {} as {}", file.id, file.file_url);

    Ok(format!(
        "File uploaded successfully. Download link: {}\nFile ID: {}\n",
        file.file_url, file.id
    ))
}
