use log::{debug, error, info, warn};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{ErrorKind, Read};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::{LineSender, OutputChannel};
use crate::error::SupervisorError;
use crate::line_decoder::LineDecoder;
use crate::project::{shell_argv, ProjectTarget};

pub const BUILD_STARTED: &str = "Starting build..";
pub const BUILD_FINISHED: &str = "Build finished!";

const PTY_COLUMNS: u16 = 200;
const PTY_SIZE: PtySize = PtySize {
    rows: 50,
    cols: PTY_COLUMNS,
    pixel_width: 0,
    pixel_height: 0,
};
const STDERR_TAIL_LINES: usize = 20;

/// Owns one project's build → run → terminate → rebuild lifecycle.
///
/// Must be driven from inside a tokio runtime: builds run as async tasks and the output of the
/// running process is read on the blocking pool.
pub struct ProcessSupervisor {
    target: Arc<ProjectTarget>,
    /// Written by the build task, read by the UI loop.
    built: Arc<AtomicBool>,
    started: bool,
    process: Option<RunningProcess>,
    build_task: Option<JoinHandle<()>>,
    /// Output readers and process reapers.
    tasks: Vec<JoinHandle<()>>,
    launches: u64,
    output: OutputChannel,
}

struct RunningProcess {
    child: Box<dyn Child + Send + Sync>,
    // Kept so the pty stays open for as long as the process is ours.
    _master: Box<dyn MasterPty + Send>,
}

impl ProcessSupervisor {
    pub fn new(target: ProjectTarget) -> Self {
        Self {
            target: Arc::new(target),
            built: Arc::new(AtomicBool::new(false)),
            started: false,
            process: None,
            build_task: None,
            tasks: Vec::new(),
            launches: 0,
            output: OutputChannel::new(),
        }
    }

    pub fn target(&self) -> &ProjectTarget {
        &self.target
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// How many times the run command has been launched.
    pub fn launch_count(&self) -> u64 {
        self.launches
    }

    pub fn try_pop_line(&mut self) -> Option<String> {
        self.output.try_pop()
    }

    /// Kick off a fresh build in the background. Builds already in flight are left to finish.
    pub fn build(&mut self) {
        self.built.store(false, Ordering::Release);
        let task = tokio::spawn(run_build(
            Arc::clone(&self.target),
            Arc::clone(&self.built),
            self.output.sender(),
        ));
        if let Some(previous) = self.build_task.replace(task) {
            if !previous.is_finished() {
                debug!("{}: previous build still running", self.target.label);
            }
        }
    }

    /// Launch the run command. Only legal once a build has finished.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if !self.is_built() {
            return Err(SupervisorError::InvalidState {
                label: self.target.label.clone(),
            });
        }

        let (process, reader) = match spawn_in_pty(&self.target) {
            Ok(spawned) => spawned,
            Err(err) => {
                let err = SupervisorError::Spawn {
                    label: self.target.label.clone(),
                    command: self.target.run_command.clone(),
                    reason: format!("{err:#}"),
                };
                // Without this the UI loop would retry the launch on every tick.
                self.built.store(false, Ordering::Release);
                self.output.sender().push(err.to_string());
                return Err(err);
            }
        };
        info!("{}: started `{}`", self.target.label, self.target.run_command);

        self.process = Some(process);
        self.started = true;
        self.launches += 1;

        let lines = self.output.sender();
        let label = self.target.label.clone();
        self.tasks.retain(|task| !task.is_finished());
        self.tasks
            .push(tokio::task::spawn_blocking(move || pump_output(reader, lines, &label)));
        Ok(())
    }

    /// Ask the running process to die without waiting for it. No-op when nothing runs.
    pub fn terminate(&mut self) {
        if let Some(process) = self.process.take() {
            debug!("{}: terminating", self.target.label);
            let label = self.target.label.clone();
            // Killing can sit through a hang-up grace period, so it stays off the UI thread
            // whenever a runtime is around.
            match Handle::try_current() {
                Ok(runtime) => self
                    .tasks
                    .push(runtime.spawn_blocking(move || stop(process, &label))),
                Err(_) => stop(process, &label),
            }
        }
        self.started = false;
    }

    /// Terminate the current process and build again. The build does not wait for the old
    /// process to exit.
    pub fn rebuild(&mut self) {
        info!("{}: rebuild requested", self.target.label);
        self.terminate();
        self.build();
    }

    /// Terminate, cancel the in-flight build and wait up to `grace` for the output readers to
    /// see their streams close and the process to be reaped. Returns whether everything
    /// finished in time.
    pub async fn shutdown(&mut self, grace: Duration) -> bool {
        self.stop_all();
        self.join_tasks(Instant::now() + grace).await
    }

    /// Terminate the running process and cancel the in-flight build, without waiting.
    pub fn stop_all(&mut self) {
        self.terminate();
        if let Some(build) = self.build_task.take() {
            build.abort();
        }
    }

    /// Wait until `deadline` for the output readers and reapers. Returns whether all of them
    /// finished.
    pub async fn join_tasks(&mut self, deadline: Instant) -> bool {
        let mut all_joined = true;
        for task in self.tasks.drain(..) {
            if tokio::time::timeout_at(deadline, task).await.is_err() {
                warn!("{}: background task still running at shutdown", self.target.label);
                all_joined = false;
            }
        }
        all_joined
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_build(target: Arc<ProjectTarget>, built: Arc<AtomicBool>, lines: LineSender) {
    lines.push(BUILD_STARTED);
    info!("{}: building with `{}`", target.label, target.build_command);

    let (program, args) = shell_argv(&target.build_command);
    let result = Command::new(program)
        .args(args)
        .current_dir(&target.dir)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(output) => {
            if output.status.success() {
                info!("{}: build succeeded", target.label);
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let tail = stderr
                    .lines()
                    .rev()
                    .take(STDERR_TAIL_LINES)
                    .collect::<Vec<_>>();
                warn!(
                    "{}: build exited with {}:\n{}",
                    target.label,
                    output.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
                );
            }
            // Queued before the flag flips so it always lands ahead of the run output.
            lines.push(BUILD_FINISHED);
            built.store(true, Ordering::Release);
        }
        Err(err) => {
            error!("{}: could not launch build: {err}", target.label);
            lines.push(format!("Build could not be launched: {err}"));
        }
    }
}

fn spawn_in_pty(target: &ProjectTarget) -> anyhow::Result<(RunningProcess, Box<dyn Read + Send>)> {
    let pair = native_pty_system().openpty(PTY_SIZE)?;

    let (program, args) = shell_argv(&target.run_command);
    let mut command = CommandBuilder::new(program);
    command.args(args);
    command.cwd(&target.dir);

    let child = pair.slave.spawn_command(command)?;
    // Our copy of the slave end must close, or the reader never sees end-of-stream.
    drop(pair.slave);
    let reader = pair.master.try_clone_reader()?;

    let process = RunningProcess {
        child,
        _master: pair.master,
    };
    Ok((process, reader))
}

fn pump_output(mut reader: Box<dyn Read + Send>, lines: LineSender, label: &str) {
    let mut decoder = LineDecoder::new(usize::from(PTY_COLUMNS));
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                for line in decoder.feed(&buf[..n]) {
                    lines.push(line);
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            // Linux reports a hung-up pty as EIO rather than a zero-length read.
            Err(err) => {
                debug!("{label}: output stream closed: {err}");
                break;
            }
        }
    }
    if let Some(line) = decoder.finish() {
        lines.push(line);
    }
}

fn stop(mut process: RunningProcess, label: &str) {
    if let Err(err) = process.child.kill() {
        // Usually means the process already exited.
        debug!("{label}: kill failed: {err}");
    }
    match process.child.wait() {
        Ok(status) => info!("{label}: process exited ({status:?})"),
        Err(err) => warn!("{label}: failed to wait for process: {err}"),
    }
}

#[cfg(test)]
mod test {
    use super::{ProcessSupervisor, BUILD_FINISHED, BUILD_STARTED};
    use crate::error::SupervisorError;
    use crate::project::ProjectTarget;
    use crossterm::style::Color;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn target(build: &str, run: &str) -> ProjectTarget {
        ProjectTarget::new("test", std::env::temp_dir(), build, run, Color::Reset, 't')
    }

    async fn wait_for(supervisor: &mut ProcessSupervisor, count: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut lines = Vec::new();
        while lines.len() < count {
            assert!(Instant::now() < deadline, "timed out, got {lines:?}");
            match supervisor.try_pop_line() {
                Some(line) => lines.push(line),
                None => sleep(Duration::from_millis(5)).await,
            }
        }
        lines
    }

    async fn wait_until_built(supervisor: &ProcessSupervisor) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !supervisor.is_built() {
            assert!(Instant::now() < deadline, "build never finished");
            sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_before_build_is_rejected() {
        let mut supervisor = ProcessSupervisor::new(target("true", "true"));
        let err = supervisor.start().unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidState { .. }));
        assert!(!supervisor.is_started());
        assert_eq!(supervisor.launch_count(), 0);
        assert_eq!(supervisor.try_pop_line(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn build_reports_two_status_lines() {
        let mut supervisor = ProcessSupervisor::new(target("true", "true"));
        supervisor.build();
        assert_eq!(
            wait_for(&mut supervisor, 2).await,
            vec![BUILD_STARTED, BUILD_FINISHED]
        );
        assert!(supervisor.is_built());
        assert!(!supervisor.is_started());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_build_still_finishes() {
        let mut supervisor = ProcessSupervisor::new(target("echo oops >&2; exit 3", "true"));
        supervisor.build();
        assert_eq!(
            wait_for(&mut supervisor, 2).await,
            vec![BUILD_STARTED, BUILD_FINISHED]
        );
        assert!(supervisor.is_built());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn build_in_missing_directory_reports_error() {
        let mut supervisor = ProcessSupervisor::new(ProjectTarget::new(
            "test",
            "/definitely/not/a/real/dir",
            "true",
            "true",
            Color::Reset,
            't',
        ));
        supervisor.build();
        let lines = wait_for(&mut supervisor, 2).await;
        assert_eq!(lines[0], BUILD_STARTED);
        assert!(lines[1].starts_with("Build could not be launched"), "{lines:?}");
        assert!(!supervisor.is_built());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_output_reaches_the_channel() {
        let mut supervisor = ProcessSupervisor::new(target("true", "echo hello; echo world"));
        supervisor.build();
        wait_until_built(&supervisor).await;
        supervisor.start().unwrap();
        assert!(supervisor.is_started());
        assert_eq!(
            wait_for(&mut supervisor, 4).await,
            vec![BUILD_STARTED, BUILD_FINISHED, "hello", "world"]
        );
        assert!(supervisor.shutdown(Duration::from_secs(5)).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn terminate_is_idempotent() {
        let mut supervisor = ProcessSupervisor::new(target("true", "true"));
        supervisor.terminate();
        supervisor.terminate();
        assert!(!supervisor.is_started());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn terminate_stops_a_running_process() {
        let mut supervisor = ProcessSupervisor::new(target("true", "exec sleep 30"));
        supervisor.build();
        wait_until_built(&supervisor).await;
        supervisor.start().unwrap();
        supervisor.terminate();
        assert!(!supervisor.is_started());
        supervisor.terminate();
        assert!(supervisor.shutdown(Duration::from_secs(5)).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rebuild_resets_built_then_builds_again() {
        let mut supervisor = ProcessSupervisor::new(target("sleep 0.2", "exec sleep 30"));
        supervisor.build();
        wait_until_built(&supervisor).await;
        supervisor.start().unwrap();

        supervisor.rebuild();
        assert!(!supervisor.is_built());
        assert!(!supervisor.is_started());
        wait_until_built(&supervisor).await;

        supervisor.start().unwrap();
        assert_eq!(supervisor.launch_count(), 2);
        assert!(supervisor.shutdown(Duration::from_secs(5)).await);
    }
}
