use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::fs_utils::{
    copy_with_progress, ensure_parent_dir, fraction_of, read_chunk, write_via_part, CHUNK_SIZE,
};
use crate::uris::Location;

const USER_AGENT: &str = concat!("jdict/", env!("CARGO_PKG_VERSION"));

/// Fetches `source` into `target`: local regular files are copied, remote
/// URLs are streamed over HTTP(S). The target only appears once complete.
pub fn fetch<F>(source: &Location, target: &Path, mut on_progress: F) -> Result<u64>
where
    F: FnMut(f64) -> Result<()>,
{
    ensure_parent_dir(target)?;
    match source {
        Location::Local(path) => {
            if !path.is_file() {
                return Err(anyhow!(
                    "source is not a regular file: {}",
                    path.display()
                ));
            }
            debug!(source = %path.display(), target = %target.display(), "copying local source");
            write_via_part(target, |part| copy_with_progress(path, part, &mut on_progress))
        }
        Location::Remote(url) => {
            debug!(url = %url, target = %target.display(), "downloading source");
            write_via_part(target, |part| download_http(url, part, &mut on_progress))
        }
    }
}

fn download_http<F>(url: &str, out_path: &Path, on_progress: &mut F) -> Result<u64>
where
    F: FnMut(f64) -> Result<()>,
{
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(None::<Duration>)
        .build()
        .context("failed to build HTTP client")?;
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("server rejected request: {url}"))?;
    let content_length = response.content_length();

    let mut output = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut received = 0_u64;
    loop {
        let read = read_chunk(&mut response, &mut buf)
            .with_context(|| format!("failed to read response body: {url}"))?;
        if read == 0 {
            break;
        }
        output
            .write_all(&buf[..read])
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        received += read as u64;
        let fraction = content_length
            .map(|total| fraction_of(received, total))
            .unwrap_or(0.0);
        on_progress(fraction)?;
    }
    output
        .flush()
        .with_context(|| format!("failed to flush {}", out_path.display()))?;

    if let Some(total) = content_length {
        if received < total {
            return Err(anyhow!(
                "download truncated: received {received} of {total} bytes from {url}"
            ));
        }
    }
    Ok(received)
}
