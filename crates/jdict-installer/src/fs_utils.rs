use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Sibling path a stage writes to before renaming into place.
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

pub(crate) fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

pub(crate) fn fraction_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).min(1.0)
}

/// Copies `source` to `target` in fixed-size chunks, reporting the fraction
/// copied after every chunk. An error from `on_progress` stops the copy.
pub(crate) fn copy_with_progress<F>(source: &Path, target: &Path, mut on_progress: F) -> Result<u64>
where
    F: FnMut(f64) -> Result<()>,
{
    let mut input =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let total = input
        .metadata()
        .with_context(|| format!("failed to stat {}", source.display()))?
        .len();
    ensure_parent_dir(target)?;
    let mut output =
        File::create(target).with_context(|| format!("failed to create {}", target.display()))?;

    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut copied = 0_u64;
    loop {
        let read = read_chunk(&mut input, &mut buf)
            .with_context(|| format!("failed to read {}", source.display()))?;
        if read == 0 {
            break;
        }
        output
            .write_all(&buf[..read])
            .with_context(|| format!("failed to write {}", target.display()))?;
        copied += read as u64;
        on_progress(fraction_of(copied, total))?;
    }
    output
        .flush()
        .with_context(|| format!("failed to flush {}", target.display()))?;
    Ok(copied)
}

/// Writes through a `.part` sibling and renames it over `target` only when
/// `write` succeeds; the partial file is removed otherwise.
pub(crate) fn write_via_part<T, F>(target: &Path, write: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let part = part_path(target);
    let value = match write(&part) {
        Ok(value) => value,
        Err(err) => {
            let _ = fs::remove_file(&part);
            return Err(err);
        }
    };

    if target.exists() {
        fs::remove_file(target)
            .with_context(|| format!("failed to replace {}", target.display()))?;
    }
    fs::rename(&part, target)
        .with_context(|| format!("failed to move {} into place", target.display()))?;
    Ok(value)
}
