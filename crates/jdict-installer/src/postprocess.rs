use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};
use regex::bytes::Regex;

use crate::fs_utils::{ensure_parent_dir, fraction_of};

/// Entries tagged as places: `(p)`, `(st)`, or either inside a tag list.
pub const PLACE_PATTERN: &str = r"\((?:[^)]*,)?(?:p|st)[,)]";
/// Entries tagged as names: surname, unclassified, given, female, male,
/// full name, product or company.
pub const NAME_PATTERN: &str = r"\((?:[^)]*,)?(?:s|u|g|f|m|h|pr|co)[,)]";

const RADICAL_SEPARATOR_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub lines: u64,
    pub matched: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitReport {
    pub lines: u64,
    pub names: u64,
    pub places: u64,
}

/// Joins radical decompositions into a kanji dictionary.
///
/// For every kanji line the leading token (bytes up to the first space) is
/// looked up by scanning the radicals file from the start. When a radicals
/// line carries the same token, its payload after the ` :` separator is
/// spliced in right after the kanji token. Lines without a match are copied
/// unchanged. The scan is a nested loop over both files.
pub fn merge_radicals<F>(
    kanji: &Path,
    radicals: &Path,
    target: &Path,
    mut on_progress: F,
) -> Result<MergeReport>
where
    F: FnMut(f64) -> Result<()>,
{
    let kanji_file =
        File::open(kanji).with_context(|| format!("failed to open {}", kanji.display()))?;
    let total = kanji_file
        .metadata()
        .with_context(|| format!("failed to stat {}", kanji.display()))?
        .len();
    let mut kanji_reader = BufReader::new(kanji_file);
    let mut radicals_reader = BufReader::new(
        File::open(radicals).with_context(|| format!("failed to open {}", radicals.display()))?,
    );
    ensure_parent_dir(target)?;
    let mut output = BufWriter::new(
        File::create(target).with_context(|| format!("failed to create {}", target.display()))?,
    );

    let mut line = Vec::new();
    let mut scratch = Vec::new();
    let mut consumed = 0_u64;
    let mut report = MergeReport::default();
    loop {
        line.clear();
        let read = kanji_reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("failed to read {}", kanji.display()))?;
        if read == 0 {
            break;
        }
        consumed += read as u64;

        let (body, newline) = split_line_ending(&line);
        let token_end = leading_token_len(body);
        let token = &body[..token_end];
        let payload = if token.is_empty() {
            None
        } else {
            find_radicals(&mut radicals_reader, token, &mut scratch)
                .with_context(|| format!("failed to scan {}", radicals.display()))?
        };

        let write = |output: &mut BufWriter<File>| -> std::io::Result<()> {
            output.write_all(token)?;
            if let Some(payload) = &payload {
                output.write_all(payload)?;
            }
            output.write_all(&body[token_end..])?;
            output.write_all(newline)
        };
        write(&mut output).with_context(|| format!("failed to write {}", target.display()))?;

        report.lines += 1;
        if payload.is_some() {
            report.matched += 1;
        }
        on_progress(fraction_of(consumed, total))?;
    }

    output
        .flush()
        .with_context(|| format!("failed to flush {}", target.display()))?;
    Ok(report)
}

fn find_radicals(
    radicals: &mut BufReader<File>,
    token: &[u8],
    scratch: &mut Vec<u8>,
) -> std::io::Result<Option<Vec<u8>>> {
    radicals.seek(SeekFrom::Start(0))?;
    loop {
        scratch.clear();
        if radicals.read_until(b'\n', scratch)? == 0 {
            return Ok(None);
        }
        let (body, _) = split_line_ending(scratch);
        if body.first() == Some(&b'#') {
            continue;
        }
        let token_end = leading_token_len(body);
        if &body[..token_end] != token {
            continue;
        }
        let rest = &body[token_end..];
        let payload = &rest[RADICAL_SEPARATOR_LEN.min(rest.len())..];
        return Ok(Some(payload.to_vec()));
    }
}

/// Sorts the lines of a combined names dictionary into a names file and a
/// places file. Each line is tested against both patterns independently and
/// written to every file it matches. Output files that end up empty are
/// removed.
pub fn split_names_places<F>(
    source: &Path,
    names_target: &Path,
    places_target: &Path,
    mut on_progress: F,
) -> Result<SplitReport>
where
    F: FnMut(f64) -> Result<()>,
{
    let place = Regex::new(PLACE_PATTERN).context("failed to compile place pattern")?;
    let name = Regex::new(NAME_PATTERN).context("failed to compile name pattern")?;

    let source_file =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let total = source_file
        .metadata()
        .with_context(|| format!("failed to stat {}", source.display()))?
        .len();
    let mut reader = BufReader::new(source_file);
    let mut names = create_writer(names_target)?;
    let mut places = create_writer(places_target)?;

    let mut line = Vec::new();
    let mut consumed = 0_u64;
    let mut report = SplitReport::default();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("failed to read {}", source.display()))?;
        if read == 0 {
            break;
        }
        consumed += read as u64;
        report.lines += 1;

        if place.is_match(&line) {
            places
                .write_all(&line)
                .with_context(|| format!("failed to write {}", places_target.display()))?;
            report.places += 1;
        }
        if name.is_match(&line) {
            names
                .write_all(&line)
                .with_context(|| format!("failed to write {}", names_target.display()))?;
            report.names += 1;
        }
        on_progress(fraction_of(consumed, total))?;
    }

    for (writer, path, written) in [
        (names, names_target, report.names),
        (places, places_target, report.places),
    ] {
        finish_writer(writer, path)?;
        if written == 0 {
            fs::remove_file(path)
                .with_context(|| format!("failed to remove empty {}", path.display()))?;
        }
    }
    Ok(report)
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn finish_writer(mut writer: BufWriter<File>, path: &Path) -> Result<()> {
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

fn leading_token_len(line: &[u8]) -> usize {
    line.iter().position(|byte| *byte == b' ').unwrap_or(line.len())
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    let mut end = line.len();
    if line[..end].ends_with(b"\n") {
        end -= 1;
    }
    if line[..end].ends_with(b"\r") {
        end -= 1;
    }
    line.split_at(end)
}
