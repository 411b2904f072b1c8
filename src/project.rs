use anyhow::{bail, Result};
use crossterm::style::Color;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::keymap::QUIT_KEY;

/// One supervised project. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProjectTarget {
    pub label: String,
    pub dir: PathBuf,
    pub build_command: String,
    pub run_command: String,
    pub color: Color,
    pub hotkey: char,
}

impl ProjectTarget {
    pub fn new(
        label: impl Into<String>,
        dir: impl Into<PathBuf>,
        build_command: impl Into<String>,
        run_command: impl Into<String>,
        color: Color,
        hotkey: char,
    ) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
            build_command: build_command.into(),
            run_command: run_command.into(),
            color,
            hotkey,
        }
    }

    /// A cargo project living in `<root>/<name>` whose binary is also called `name`.
    pub fn cargo_binary(
        root: &Path,
        name: &str,
        label: impl Into<String>,
        color: Color,
        hotkey: char,
    ) -> Self {
        Self::new(
            label,
            root.join(name),
            "cargo build --quiet",
            format!("target/debug/{name}"),
            color,
            hotkey,
        )
    }
}

/// The two projects the dashboard was written for.
pub fn reference_targets(root: &Path) -> Vec<ProjectTarget> {
    vec![
        ProjectTarget::cargo_binary(root, "azusa", "Azusa", Color::Blue, 'a'),
        ProjectTarget::cargo_binary(root, "api", "API", Color::Green, 'w'),
    ]
}

pub fn validate_targets(targets: &[ProjectTarget]) -> Result<()> {
    if targets.is_empty() {
        bail!("no projects to supervise");
    }
    let mut seen = HashSet::new();
    for target in targets {
        if target.hotkey == QUIT_KEY {
            bail!("{}: `{QUIT_KEY}` is reserved for quitting", target.label);
        }
        if !seen.insert(target.hotkey) {
            bail!("{}: hotkey `{}` is bound twice", target.label, target.hotkey);
        }
    }
    Ok(())
}

/// Program and arguments that hand `command` to the platform shell.
pub(crate) fn shell_argv(command: &str) -> (&'static str, [&str; 2]) {
    if cfg!(windows) {
        ("cmd", ["/C", command])
    } else {
        ("sh", ["-c", command])
    }
}
