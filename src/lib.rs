/*
Two projects, one terminal. Each gets a pane and a supervisor.

Supervisor lifecycle
    build: background task, "Starting build.." / "Build finished!" around the build command
    start: only once built; run command inside a pty so stdout and stderr interleave
    reader: blocking pool, pty bytes -> vte actions -> plain lines -> channel
    terminate: kill request, never waits; reader sees the stream close on its own
    rebuild: terminate + build, no waiting on the old process

UI loop
    poll one key (never blocks)
    per project: start if built and not started, pop at most one line, redraw pane
    sleep a tick

Channel is the only thing the background tasks and the UI share.
*/
pub mod channel;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod keymap;
mod line_decoder;
pub mod pane;
pub mod project;
pub mod supervisor;
pub mod terminal;
mod vte_actions;

pub use channel::{LineSender, OutputChannel};
pub use dashboard::{Dashboard, Tick};
pub use error::SupervisorError;
pub use pane::Pane;
pub use project::{reference_targets, ProjectTarget};
pub use supervisor::ProcessSupervisor;
pub use terminal::{CrosstermKeys, KeySource, TerminalSurface};
