use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Decoder, DecoderResult, Encoder, EncoderResult};
use jdict_core::TextEncoding;
use tracing::warn;

use crate::fs_utils::{copy_with_progress, ensure_parent_dir, fraction_of, read_chunk, CHUNK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionReport {
    pub bytes_read: u64,
    /// Malformed input bytes dropped while decoding.
    pub malformed_bytes: u64,
    /// Characters the target encoding cannot represent.
    pub unmappable_chars: u64,
}

/// Streams `source` into `target`, converting from one text encoding to
/// another. Malformed byte sequences are dropped and decoding resumes after
/// them; only I/O failures are errors.
pub fn convert_encoding<F>(
    source: &Path,
    target: &Path,
    from: TextEncoding,
    to: TextEncoding,
    mut on_progress: F,
) -> Result<ConversionReport>
where
    F: FnMut(f64) -> Result<()>,
{
    if from == to {
        let bytes_read = copy_with_progress(source, target, on_progress)?;
        return Ok(ConversionReport {
            bytes_read,
            ..ConversionReport::default()
        });
    }

    let mut input =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let total = input
        .metadata()
        .with_context(|| format!("failed to stat {}", source.display()))?
        .len();
    ensure_parent_dir(target)?;
    let mut output = BufWriter::new(
        File::create(target).with_context(|| format!("failed to create {}", target.display()))?,
    );

    let mut decoder = from.encoding().new_decoder_without_bom_handling();
    let mut encoder = (to != TextEncoding::Utf8).then(|| to.encoding().new_encoder());
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut decoded = String::new();
    let mut encoded = Vec::new();
    let mut report = ConversionReport::default();

    loop {
        let read = read_chunk(&mut input, &mut buf)
            .with_context(|| format!("failed to read {}", source.display()))?;
        let last = read == 0;
        let mut pending = &buf[..read];

        loop {
            decoded.clear();
            reserve_decoded(&decoder, &mut decoded, pending.len());
            let (result, consumed) =
                decoder.decode_to_string_without_replacement(pending, &mut decoded, last);
            pending = &pending[consumed..];

            let written = match encoder.as_mut() {
                Some(encoder) => {
                    encoded.clear();
                    report.unmappable_chars += encode_into(encoder, &decoded, &mut encoded, last);
                    output.write_all(&encoded)
                }
                None => output.write_all(decoded.as_bytes()),
            };
            written.with_context(|| format!("failed to write {}", target.display()))?;

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, _) => {
                    report.malformed_bytes += u64::from(bad);
                }
            }
        }

        if last {
            break;
        }
        report.bytes_read += read as u64;
        on_progress(fraction_of(report.bytes_read, total))?;
    }

    output
        .flush()
        .with_context(|| format!("failed to flush {}", target.display()))?;

    if report.malformed_bytes > 0 || report.unmappable_chars > 0 {
        warn!(
            source = %source.display(),
            malformed_bytes = report.malformed_bytes,
            unmappable_chars = report.unmappable_chars,
            "skipped undecodable input while converting {} to {}",
            from.as_str(),
            to.as_str()
        );
    }
    Ok(report)
}

fn reserve_decoded(decoder: &Decoder, decoded: &mut String, input_len: usize) {
    let needed = decoder
        .max_utf8_buffer_length_without_replacement(input_len)
        .unwrap_or(input_len.saturating_mul(3))
        .max(16);
    decoded.reserve(needed);
}

/// Encodes `text`, dropping characters the encoder cannot map. Returns the
/// number of dropped characters.
fn encode_into(encoder: &mut Encoder, mut text: &str, out: &mut Vec<u8>, last: bool) -> u64 {
    let mut unmappable = 0;
    loop {
        let needed = encoder
            .max_buffer_length_from_utf8_without_replacement(text.len())
            .unwrap_or(text.len().saturating_mul(4))
            .max(16);
        out.reserve(needed);
        let (result, consumed) = encoder.encode_from_utf8_to_vec_without_replacement(text, out, last);
        text = &text[consumed..];
        match result {
            EncoderResult::InputEmpty => return unmappable,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(_) => unmappable += 1,
        }
    }
}
