use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::{report, report_done, FetchError, ProgressFn};

pub(super) async fn download(
    client: &Client,
    url: &Url,
    destination: &Path,
    progress: Option<&ProgressFn>,
) -> Result<u64, FetchError> {
    let response = client.get(url.clone()).send().await?;

    match response.status() {
        StatusCode::OK => {}
        StatusCode::NOT_FOUND => return Err(FetchError::NotFound(url.to_string())),
        other => {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: other.as_u16(),
            })
        }
    }

    let total = response.content_length();
    let mut file = File::create(destination).await?;
    let mut received: u64 = 0;
    report(progress, received, total);

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        report(progress, received, total);
    }

    file.flush().await?;
    report_done(progress, received, total);
    Ok(received)
}
