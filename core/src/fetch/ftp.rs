use reqwest::Url;
use std::path::Path;
use suppaftp::tokio::AsyncFtpStream;
use suppaftp::types::FileType;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{report, report_done, FetchError, ProgressFn};

const DEFAULT_FTP_PORT: u16 = 21;
const CHUNK_SIZE: usize = 64 * 1024;

/// Anonymous passive-mode binary retrieval of a single file
pub(super) async fn download(
    url: &Url,
    user: &str,
    password: &str,
    destination: &Path,
    progress: Option<&ProgressFn>,
) -> Result<u64, FetchError> {
    let host = url.host_str().ok_or_else(|| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: "missing host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(DEFAULT_FTP_PORT);
    let remote_path = url.path();

    let mut ftp_stream = AsyncFtpStream::connect(format!("{}:{}", host, port)).await?;
    ftp_stream.login(user, password).await?;
    ftp_stream.transfer_type(FileType::Binary).await?;

    // not every server answers SIZE, progress then has no total
    let total = ftp_stream.size(remote_path).await.ok().map(|n| n as u64);

    let mut reader = ftp_stream.retr_as_stream(remote_path).await?;
    let mut file = File::create(destination).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    report(progress, received, total);

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        received += n as u64;
        report(progress, received, total);
    }
    file.flush().await?;
    report_done(progress, received, total);

    ftp_stream.finalize_retr_stream(reader).await?;
    ftp_stream.quit().await?;

    Ok(received)
}
