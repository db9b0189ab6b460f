//! # Transfer
//!
//! Runs one download end to end: open the body, stream chunks into a
//! staging file, publish progress, and settle the stream with a terminal
//! value. The finished file is renamed onto the destination only once it
//! is complete, so the destination never holds half-written bytes; failure
//! and cancellation both remove the staging file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::progress::{Progress, ProgressSender};
use crate::request::RequestSpec;

/// Execute a download and settle its progress stream.
///
/// Bytes stream into `work` and are renamed onto `dest` once complete.
/// Always publishes exactly one terminal value: [`Progress::Done`] with the
/// finished file at `dest`, or [`Progress::Failed`] with `work` removed and
/// `dest` untouched.
#[instrument(skip_all, fields(url = %spec.url), level = "debug")]
pub(crate) async fn run(
    fetcher: Arc<dyn Fetcher>,
    spec: RequestSpec,
    work: PathBuf,
    dest: PathBuf,
    progress: ProgressSender,
    cancel: CancellationToken,
) {
    match stream_to_file(fetcher.as_ref(), &spec, &work, &progress, &cancel).await {
        Ok(bytes) => match fs::rename(&work, &dest).await {
            Ok(()) => {
                debug!(bytes, "Download complete");
                progress.send(Progress::Done);
            }
            Err(e) => {
                remove_partial(&work).await;
                error!(error = %e, "Failed to move finished download into place");
                progress.send(Progress::Failed);
            }
        },
        Err(FetchError::Cancelled) => {
            remove_partial(&work).await;
            debug!("Download cancelled");
            progress.send(Progress::Failed);
        }
        Err(e) => {
            remove_partial(&work).await;
            error!(error = %e, "Download failed");
            progress.send(Progress::Failed);
        }
    }
}

async fn stream_to_file(
    fetcher: &dyn Fetcher,
    spec: &RequestSpec,
    work: &Path,
    progress: &ProgressSender,
    cancel: &CancellationToken,
) -> Result<u64, FetchError> {
    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        body = fetcher.fetch(spec) => body?,
    };

    info!(content_length = ?body.content_length, "Starting download");

    let mut file = fs::File::create(work).await?;
    let mut stream = body.stream;
    let mut read_bytes: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = chunk else { break };
        let chunk = chunk?;

        file.write_all(&chunk).await?;
        read_bytes += chunk.len() as u64;
        progress.send(Progress::Fraction(fraction(read_bytes, body.content_length)));
    }

    file.flush().await?;
    Ok(read_bytes)
}

/// Bytes read over bytes expected. Servers that do not advertise a length
/// get a -1 denominator, so the values are negative but still monotone in
/// magnitude; consumers are expected to rely on the terminal value instead.
fn fraction(read_bytes: u64, content_length: Option<u64>) -> f32 {
    let total = match content_length {
        Some(len) if len > 0 => len as f32,
        _ => -1.0,
    };
    read_bytes as f32 / total
}

/// Remove a partially-written staging file, tolerating its absence.
async fn remove_partial(work: &Path) {
    if let Err(e) = fs::remove_file(work).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = ?work, error = %e, "Failed to remove partial download");
        }
    }
}
