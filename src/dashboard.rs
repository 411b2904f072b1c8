use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::Print;
use log::{debug, error, info};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::Instant;

use crate::keymap::{action_for_key, controls_legend, Action};
use crate::pane::{split_columns, Pane};
use crate::project::{validate_targets, ProjectTarget};
use crate::supervisor::ProcessSupervisor;
use crate::terminal::KeySource;

/// A pane and the supervisor feeding it.
pub struct Project {
    pane: Pane,
    supervisor: ProcessSupervisor,
}

impl Project {
    pub fn pane(&self) -> &Pane {
        &self.pane
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Quit,
}

/// The UI loop: one cooperative driver over every project plus the keyboard.
pub struct Dashboard<W: Write, K: KeySource> {
    out: W,
    keys: K,
    targets: Vec<ProjectTarget>,
    projects: Vec<Project>,
    legend: String,
    legend_row: u16,
    legend_width: u16,
    legend_drawn: bool,
}

impl<W: Write, K: KeySource> Dashboard<W, K> {
    /// Lays the panes out over a `(cols, rows)` surface and starts building every project.
    pub fn new(
        out: W,
        keys: K,
        targets: Vec<ProjectTarget>,
        (cols, rows): (u16, u16),
    ) -> Result<Self> {
        validate_targets(&targets)?;
        let count = u16::try_from(targets.len()).context("too many projects")?;

        let projects = targets
            .iter()
            .zip(split_columns(cols, rows, count))
            .map(|(target, rect)| {
                let mut supervisor = ProcessSupervisor::new(target.clone());
                supervisor.build();
                Project {
                    pane: Pane::new(target.label.clone(), target.color, rect),
                    supervisor,
                }
            })
            .collect();

        Ok(Self {
            out,
            keys,
            legend: controls_legend(&targets),
            targets,
            projects,
            legend_row: rows.saturating_sub(1),
            legend_width: cols,
            legend_drawn: false,
        })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// One pass of the loop. Never blocks.
    pub fn tick(&mut self) -> io::Result<Tick> {
        match self.keys.poll_key() {
            Ok(Some(key)) => match action_for_key(key, &self.targets) {
                Some(Action::Quit) => {
                    info!("quit requested");
                    return Ok(Tick::Quit);
                }
                Some(Action::Rebuild(index)) => self.projects[index].supervisor.rebuild(),
                None => {}
            },
            Ok(None) => {}
            Err(err) => debug!("keyboard poll failed: {err}"),
        }

        if !self.legend_drawn {
            let legend: String = self
                .legend
                .chars()
                .take(usize::from(self.legend_width))
                .collect();
            queue!(self.out, MoveTo(0, self.legend_row), Print(legend))?;
            self.legend_drawn = true;
        }

        for project in &mut self.projects {
            let supervisor = &mut project.supervisor;
            if supervisor.is_built() && !supervisor.is_started() {
                if let Err(err) = supervisor.start() {
                    error!("{err}");
                }
            }
            if let Some(line) = supervisor.try_pop_line() {
                project.pane.append(&line);
            }
            project.pane.redraw(&mut self.out)?;
        }
        self.out.flush()?;
        Ok(Tick::Continue)
    }

    /// Tick every `interval` until quit, then shut every project down.
    pub async fn run(mut self, interval: Duration, shutdown_grace: Duration) -> Result<()> {
        let result = loop {
            match self.tick() {
                Ok(Tick::Quit) => break Ok(()),
                Ok(Tick::Continue) => {}
                Err(err) => break Err(err).context("failed to draw the dashboard"),
            }
            tokio::time::sleep(interval).await;
        };
        self.shutdown(shutdown_grace).await;
        result
    }

    /// Terminate every running process. Returns whether all output readers wound down within
    /// `grace`, which bounds the whole shutdown rather than each project's.
    pub async fn shutdown(&mut self, grace: Duration) -> bool {
        for project in &mut self.projects {
            project.supervisor.stop_all();
        }
        let deadline = Instant::now() + grace;
        let mut all_joined = true;
        for project in &mut self.projects {
            all_joined &= project.supervisor.join_tasks(deadline).await;
        }
        all_joined
    }
}
