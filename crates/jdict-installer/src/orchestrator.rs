use jdict_core::{InstallState, Stage};
use tracing::{info, warn};

use crate::cancel::{CancellationToken, ProgressReporter};
use crate::descriptor::InstallDescriptor;
use crate::error::{is_canceled, InstallError};
use crate::pipe::GUNZIP_ARGV;
use crate::stages::{clean, run_stage, StageRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Filter used for gzip sources; reads stdin, writes stdout.
    pub gunzip: Vec<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            gunzip: GUNZIP_ARGV.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

pub fn install(
    descriptor: &InstallDescriptor,
    cancel: &CancellationToken,
    reporter: &mut dyn ProgressReporter,
) -> Result<InstallOutcome, InstallError> {
    install_with_options(descriptor, cancel, reporter, &InstallOptions::default())
}

/// Runs download, decompression, text encoding, postprocessing and
/// finalization in order, stopping at the first failure or cancellation.
/// Intermediate files are always removed afterwards.
pub fn install_with_options(
    descriptor: &InstallDescriptor,
    cancel: &CancellationToken,
    reporter: &mut dyn ProgressReporter,
    options: &InstallOptions,
) -> Result<InstallOutcome, InstallError> {
    descriptor.validate()?;
    descriptor.update_status(|status| {
        status.stage = Stage::Downloading;
        status.atom = 0;
        status.fraction = 0.0;
        status.state = InstallState::Installing;
    });
    info!(dictionary = descriptor.filename(), "installing");

    let mut run = StageRun::new(descriptor, cancel, reporter, &options.gunzip);
    let mut failure = None;
    let mut canceled = false;
    for stage in Stage::TRANSFORMS {
        info!(dictionary = descriptor.filename(), stage = stage.as_str(), "stage started");
        if let Err(err) = run_stage(&mut run, stage) {
            if is_canceled(&err) {
                canceled = true;
            } else {
                warn!(dictionary = descriptor.filename(), stage = stage.as_str(), error = %format!("{err:#}"), "stage failed");
                failure = Some(InstallError::from_stage(stage, err));
            }
            break;
        }
        if stop_requested(&run, stage) {
            canceled = true;
            break;
        }
    }

    if canceled {
        descriptor.update_status(|status| status.state = InstallState::Canceling);
    }
    let removed = clean(descriptor);
    info!(dictionary = descriptor.filename(), removed = removed.len(), "cleaned intermediate files");

    if let Some(err) = failure {
        descriptor.update_status(|status| status.state = InstallState::Errored);
        return Err(err);
    }

    if canceled {
        descriptor.update_status(|status| {
            status.stage = Stage::Downloading;
            status.atom = 0;
            status.fraction = 0.0;
            status.state = InstallState::NotInstalled;
        });
        info!(dictionary = descriptor.filename(), "install canceled");
        return Ok(InstallOutcome::Canceled);
    }

    descriptor.update_status(|status| {
        status.stage = Stage::Nothing;
        status.atom = 0;
        status.fraction = 1.0;
        status.state = InstallState::Installed;
    });
    run.report(descriptor.progress());
    info!(dictionary = descriptor.filename(), "installed");
    Ok(InstallOutcome::Installed)
}

/// Whether to stop after `completed` ran. Once finalization has installed the
/// files a late cancellation no longer applies.
pub(crate) fn stop_requested(run: &StageRun<'_, '_>, completed: Stage) -> bool {
    completed != Stage::Finalization && run.should_stop()
}
