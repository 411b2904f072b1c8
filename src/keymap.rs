use crate::project::ProjectTarget;

pub const QUIT_KEY: char = 'q';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Rebuild the project at this index.
    Rebuild(usize),
}

pub fn action_for_key(key: char, targets: &[ProjectTarget]) -> Option<Action> {
    if key == QUIT_KEY {
        return Some(Action::Quit);
    }
    targets
        .iter()
        .position(|target| target.hotkey == key)
        .map(Action::Rebuild)
}

pub fn controls_legend(targets: &[ProjectTarget]) -> String {
    let parts = std::iter::once(format!("{QUIT_KEY} quit"))
        .chain(
            targets
                .iter()
                .map(|target| format!("{} rebuild {}", target.hotkey, target.label)),
        )
        .collect::<Vec<_>>();
    format!("Keys: {}", parts.join("  "))
}
