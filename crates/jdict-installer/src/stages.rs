use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use jdict_core::{Compression, Stage, TextEncoding};
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, ProgressReporter};
use crate::descriptor::InstallDescriptor;
use crate::download::fetch;
use crate::error::Canceled;
use crate::fs_utils::{copy_with_progress, part_path, remove_file_if_exists, write_via_part};
use crate::pipe::pipe_through;
use crate::postprocess::{merge_radicals, split_names_places};
use crate::transcode::convert_encoding;

/// Mutable state of one pipeline run: where it is, whom to tell, and
/// whether it should stop.
pub(crate) struct StageRun<'a, 'r> {
    descriptor: &'a InstallDescriptor,
    cancel: &'a CancellationToken,
    reporter: &'a mut (dyn ProgressReporter + 'r),
    gunzip: &'a [String],
    aborted: bool,
    reported: f64,
}

impl<'a, 'r> StageRun<'a, 'r> {
    pub(crate) fn new(
        descriptor: &'a InstallDescriptor,
        cancel: &'a CancellationToken,
        reporter: &'a mut (dyn ProgressReporter + 'r),
        gunzip: &'a [String],
    ) -> Self {
        Self {
            descriptor,
            cancel,
            reporter,
            gunzip,
            aborted: false,
            reported: 0.0,
        }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.aborted || self.cancel.is_canceled()
    }

    pub(crate) fn begin_atom(&mut self, stage: Stage, atom: usize) -> Result<()> {
        self.descriptor.update_status(|status| {
            status.stage = stage;
            status.atom = atom;
            status.fraction = 0.0;
        });
        self.advance(0.0)
    }

    /// Records progress within the current atom and reports the pipeline
    /// total. Fails with [`Canceled`] once the install should stop.
    pub(crate) fn advance(&mut self, fraction: f64) -> Result<()> {
        self.descriptor
            .update_status(|status| status.fraction = fraction.clamp(0.0, 1.0));
        self.report(self.descriptor.progress());
        if self.should_stop() {
            return Err(Canceled.into());
        }
        Ok(())
    }

    pub(crate) fn report(&mut self, progress: f64) {
        self.reported = self.reported.max(progress);
        if !self.reporter.report(self.reported) {
            self.aborted = true;
        }
    }
}

pub(crate) fn run_stage(run: &mut StageRun<'_, '_>, stage: Stage) -> Result<()> {
    match stage {
        Stage::Downloading => download(run),
        Stage::Decompression => decompress(run),
        Stage::TextEncoding => convert(run),
        Stage::Postprocessing => postprocess(run),
        Stage::Finalization => finalize(run),
        Stage::Nothing => Ok(()),
    }
}

fn atom_paths<'d>(
    descriptor: &'d InstallDescriptor,
    stage: Stage,
    atom: usize,
) -> Result<Option<(&'d Path, &'d Path)>> {
    let Some(source) = descriptor.source(stage, atom) else {
        return Ok(None);
    };
    let source = source
        .as_path()
        .ok_or_else(|| anyhow!("{} input is not a local file: {source}", stage.as_str()))?;
    let target = descriptor
        .uris()
        .target_path(stage, atom)
        .ok_or_else(|| anyhow!("no {} output for input {}", stage.as_str(), source.display()))?;
    Ok(Some((source, target)))
}

fn download(run: &mut StageRun<'_, '_>) -> Result<()> {
    let descriptor = run.descriptor;
    let stage = Stage::Downloading;
    let mut atom = 0;
    while let Some(source) = descriptor.source(stage, atom) {
        let target = descriptor
            .uris()
            .target_path(stage, atom)
            .ok_or_else(|| anyhow!("no download target for {source}"))?;
        run.begin_atom(stage, atom)?;
        let bytes = fetch(source, target, |fraction| run.advance(fraction))
            .with_context(|| format!("failed to fetch {source}"))?;
        debug!(source = %source, target = %target.display(), bytes, "fetched");
        atom += 1;
    }
    Ok(())
}

fn decompress(run: &mut StageRun<'_, '_>) -> Result<()> {
    let descriptor = run.descriptor;
    let stage = Stage::Decompression;
    let mut atom = 0;
    while let Some((source, target)) = atom_paths(descriptor, stage, atom)? {
        run.begin_atom(stage, atom)?;
        let result = match descriptor.compression() {
            Compression::Gzip => {
                let gunzip = run.gunzip;
                pipe_through(gunzip, source, target, |fraction| run.advance(fraction))
            }
            Compression::None => {
                copy_with_progress(source, target, |fraction| run.advance(fraction)).map(|_| ())
            }
        };
        result.with_context(|| format!("failed to decompress {}", source.display()))?;
        atom += 1;
    }
    Ok(())
}

fn convert(run: &mut StageRun<'_, '_>) -> Result<()> {
    let descriptor = run.descriptor;
    let stage = Stage::TextEncoding;
    let mut atom = 0;
    while let Some((source, target)) = atom_paths(descriptor, stage, atom)? {
        run.begin_atom(stage, atom)?;
        let report = convert_encoding(
            source,
            target,
            descriptor.encoding(),
            TextEncoding::Utf8,
            |fraction| run.advance(fraction),
        )
        .with_context(|| format!("failed to convert {}", source.display()))?;
        debug!(
            source = %source.display(),
            malformed_bytes = report.malformed_bytes,
            "converted to UTF-8"
        );
        atom += 1;
    }
    Ok(())
}

fn postprocess(run: &mut StageRun<'_, '_>) -> Result<()> {
    let descriptor = run.descriptor;
    let stage = Stage::Postprocessing;
    let uris = descriptor.uris();
    let first_source = required_path(uris.source_path(stage, 0), "postprocessing input")?;
    let first_target = required_path(uris.target_path(stage, 0), "postprocessing output")?;
    run.begin_atom(stage, 0)?;

    if descriptor.merge() {
        let radicals = required_path(uris.source_path(stage, 1), "radicals input")?;
        let report = merge_radicals(first_source, radicals, first_target, |fraction| {
            run.advance(fraction)
        })?;
        info!(
            dictionary = descriptor.filename(),
            lines = report.lines,
            matched = report.matched,
            "merged radicals"
        );
    } else if descriptor.split() {
        let places = required_path(uris.target_path(stage, 1), "places output")?;
        let report = split_names_places(first_source, first_target, places, |fraction| {
            run.advance(fraction)
        })?;
        info!(
            dictionary = descriptor.filename(),
            lines = report.lines,
            names = report.names,
            places = report.places,
            "split names and places"
        );
    } else {
        copy_with_progress(first_source, first_target, |fraction| run.advance(fraction))?;
    }
    Ok(())
}

fn finalize(run: &mut StageRun<'_, '_>) -> Result<()> {
    let descriptor = run.descriptor;
    let stage = Stage::Finalization;
    let mut atom = 0;
    while let Some((source, target)) = atom_paths(descriptor, stage, atom)? {
        run.begin_atom(stage, atom)?;
        if descriptor.split() && !source.exists() {
            debug!(source = %source.display(), "no entries for split output; removing stale install");
            remove_file_if_exists(target)
                .with_context(|| format!("failed to remove {}", target.display()))?;
            atom += 1;
            continue;
        }
        write_via_part(target, |part| {
            copy_with_progress(source, part, |fraction| run.advance(fraction))
        })
        .with_context(|| format!("failed to install {}", target.display()))?;
        atom += 1;
    }
    Ok(())
}

/// Removes every file written before finalization. Failures are logged and
/// skipped.
pub(crate) fn clean(descriptor: &InstallDescriptor) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in descriptor.uris().intermediates() {
        for candidate in [part_path(&path), path] {
            if !candidate.exists() {
                continue;
            }
            match remove_file_if_exists(&candidate) {
                Ok(()) => removed.push(candidate),
                Err(err) => {
                    warn!(path = %candidate.display(), error = %err, "failed to remove intermediate file")
                }
            }
        }
    }
    removed
}

fn required_path<'p>(path: Option<&'p Path>, what: &str) -> Result<&'p Path> {
    path.ok_or_else(|| anyhow!("missing {what}"))
}
