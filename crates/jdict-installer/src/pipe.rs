use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use tracing::debug;

use crate::fs_utils::{ensure_parent_dir, fraction_of, read_chunk, CHUNK_SIZE};

pub const GUNZIP_ARGV: [&str; 2] = ["gunzip", "-cd"];

/// A spawned filter process with both stdin and stdout piped.
#[derive(Debug)]
pub struct DuplexProcess {
    child: Child,
    program: String,
}

impl DuplexProcess {
    pub fn spawn<S: AsRef<OsStr>>(argv: &[S]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("filter command must not be empty"))?;
        let program_name = program.as_ref().to_string_lossy().into_owned();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start filter '{program_name}'"))?;
        Ok(Self {
            child,
            program: program_name,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin of '{}' is not available", self.program))
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout of '{}' is not available", self.program))
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
    }

    pub fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .with_context(|| format!("failed to wait for filter '{}'", self.program))
    }
}

/// Runs `source` through the filter `argv` into `target`. One thread feeds
/// the file into the child's stdin while another drains its stdout; progress
/// is the fraction of `source` fed so far. An error from `on_progress` stops
/// feeding, kills the child and is returned as is.
pub fn pipe_through<S, F>(argv: &[S], source: &Path, target: &Path, mut on_progress: F) -> Result<()>
where
    S: AsRef<OsStr>,
    F: FnMut(f64) -> Result<()>,
{
    let total = std::fs::metadata(source)
        .with_context(|| format!("failed to stat {}", source.display()))?
        .len();
    ensure_parent_dir(target)?;

    let mut process = DuplexProcess::spawn(argv)?;
    let stdin = process.take_stdin()?;
    let stdout = process.take_stdout()?;
    debug!(filter = process.program(), source = %source.display(), target = %target.display(), "piping through filter");

    let stop = AtomicBool::new(false);
    let (progress_tx, progress_rx) = unbounded::<u64>();

    let (interrupted, fed, drained) = thread::scope(|scope| {
        let stop = &stop;
        let feeder = scope.spawn(move || feed(source, stdin, stop, progress_tx));
        let drainer = scope.spawn(move || drain(stdout, target));

        let mut interrupted = Ok(());
        for sent in progress_rx.iter() {
            if interrupted.is_ok() {
                if let Err(err) = on_progress(fraction_of(sent, total)) {
                    stop.store(true, Ordering::SeqCst);
                    interrupted = Err(err);
                }
            }
        }

        let fed = feeder
            .join()
            .unwrap_or_else(|_| Err(anyhow!("pipe feeder thread panicked")));
        if interrupted.is_err() {
            process.kill();
        }
        let drained = drainer
            .join()
            .unwrap_or_else(|_| Err(anyhow!("pipe drainer thread panicked")));
        (interrupted, fed, drained)
    });

    let status = process.wait()?;
    interrupted?;
    fed?;
    drained?;
    if !status.success() {
        return Err(anyhow!(
            "filter '{}' exited with {status} while processing {}",
            process.program(),
            source.display()
        ));
    }
    Ok(())
}

fn feed(source: &Path, mut stdin: ChildStdin, stop: &AtomicBool, progress: Sender<u64>) -> Result<u64> {
    let mut input =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut sent = 0_u64;
    while !stop.load(Ordering::SeqCst) {
        let read = read_chunk(&mut input, &mut buf)
            .with_context(|| format!("failed to read {}", source.display()))?;
        if read == 0 {
            break;
        }
        stdin
            .write_all(&buf[..read])
            .context("failed to write to filter stdin")?;
        sent += read as u64;
        let _ = progress.send(sent);
    }
    Ok(sent)
}

fn drain(mut stdout: ChildStdout, target: &Path) -> Result<u64> {
    let mut output =
        File::create(target).with_context(|| format!("failed to create {}", target.display()))?;
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut received = 0_u64;
    loop {
        let read = read_chunk(&mut stdout, &mut buf).context("failed to read filter stdout")?;
        if read == 0 {
            break;
        }
        output
            .write_all(&buf[..read])
            .with_context(|| format!("failed to write {}", target.display()))?;
        received += read as u64;
    }
    output
        .flush()
        .with_context(|| format!("failed to flush {}", target.display()))?;
    Ok(received)
}
