use axum::Extension;
use chrono::SecondsFormat;

use crate::{errors::AppResult, models::File, AppContext};

fn render_listing(files: &[File]) -> String {
    files
        .iter()
        .map(|file| {
            format!(
                "File: {}, Expiry Date: {}, URL: {}\n",
                file.filename,
                file.expiry_date.to_rfc3339_opts(SecondsFormat::Secs, true),
                file.file_url
            )
        })
        .collect()
}

pub async fn list_endpoint(ctx: Extension<AppContext>) -> AppResult<String> {
    let files = ctx.files.fetch_files().await?;
    Ok(render_listing(&files))
}
