//! Live status display.
//!
//! [`render_lines`] turns a snapshot into the text block shown to the
//! operator; [`TerminalStatus`] draws it on stdout, only when it changed.

use std::io::{self, Write};

use tracing::debug;

use mirror_core::{CaptureMode, ContinuousSignal, DiscreteId, HidKeyCode, InputSnapshot};

use crate::application::tick::StatusSink;

/// Formats one snapshot.
///
/// Keys are shown upper-cased (`Q: Pressed`), modifiers and buttons by their
/// config names (`ctrl: Released`, `mouse_left: Pressed`).  While paused a
/// final line tells the operator how to resume.
pub fn render_lines(snapshot: &InputSnapshot, mode: CaptureMode, toggle_key: HidKeyCode) -> Vec<String> {
    let mut lines: Vec<String> = snapshot
        .discrete()
        .iter()
        .map(|(id, pressed)| {
            let label = match id {
                DiscreteId::Key(_) => id.label().to_uppercase(),
                _ => id.label(),
            };
            let state = if *pressed { "Pressed" } else { "Released" };
            format!("{label}: {state}")
        })
        .collect();

    lines.push(format!(
        "Mouse Speed X: {:.2}",
        snapshot.continuous(ContinuousSignal::PointerVelocityX)
    ));
    lines.push(format!(
        "Mouse Speed Y: {:.2}",
        snapshot.continuous(ContinuousSignal::PointerVelocityY)
    ));
    lines.push(format!(
        "Scroll Wheel Speed: {:.2}",
        snapshot.continuous(ContinuousSignal::ScrollVelocity)
    ));

    if mode == CaptureMode::Paused {
        let key = toggle_key
            .name()
            .map(str::to_uppercase)
            .unwrap_or_else(|| format!("{toggle_key:?}"));
        lines.push(format!("Capture Paused. Press '{key}' to Resume."));
    }
    lines
}

/// Redraws the status block in place on a terminal.
pub struct TerminalStatus<W: Write = io::Stdout> {
    out: W,
    toggle_key: HidKeyCode,
    last: Vec<String>,
}

impl TerminalStatus<io::Stdout> {
    pub fn stdout(toggle_key: HidKeyCode) -> Self {
        Self::new(io::stdout(), toggle_key)
    }
}

impl<W: Write> TerminalStatus<W> {
    pub fn new(out: W, toggle_key: HidKeyCode) -> Self {
        Self {
            out,
            toggle_key,
            last: Vec::new(),
        }
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        // clear screen, cursor home
        write!(self.out, "\x1b[2J\x1b[H")?;
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> StatusSink for TerminalStatus<W> {
    fn render(&mut self, snapshot: &InputSnapshot, mode: CaptureMode) {
        let lines = render_lines(snapshot, mode, self.toggle_key);
        if lines == self.last {
            return;
        }
        if let Err(e) = self.draw(&lines) {
            debug!("status redraw failed: {e}");
        }
        self.last = lines;
    }
}

/// Status sink for `--no-status`: renders nothing.
#[derive(Debug, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn render(&mut self, _snapshot: &InputSnapshot, _mode: CaptureMode) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{InputStateStore, Modifier, MouseButton, TrackedSet};
    use std::time::Instant;

    fn store() -> InputStateStore {
        let tracked = TrackedSet::new(
            vec![HidKeyCode::KeyQ],
            vec![Modifier::Ctrl],
            vec![MouseButton::Left],
        )
        .unwrap();
        InputStateStore::new(&tracked)
    }

    #[test]
    fn test_lines_follow_tracked_order() {
        // Arrange
        let mut store = store();
        store.set_discrete(DiscreteId::Key(HidKeyCode::KeyQ), true).unwrap();
        store.set_continuous(ContinuousSignal::PointerVelocityX, 0.2, Instant::now());

        // Act
        let lines = render_lines(&store.snapshot(), CaptureMode::Enabled, HidKeyCode::KeyP);

        // Assert
        assert_eq!(
            lines,
            vec![
                "Q: Pressed",
                "ctrl: Released",
                "mouse_left: Released",
                "Mouse Speed X: 0.20",
                "Mouse Speed Y: 0.00",
                "Scroll Wheel Speed: 0.00",
            ]
        );
    }

    #[test]
    fn test_paused_adds_resume_hint() {
        let lines = render_lines(&store().snapshot(), CaptureMode::Paused, HidKeyCode::KeyP);
        assert_eq!(lines.last().unwrap(), "Capture Paused. Press 'P' to Resume.");
    }

    #[test]
    fn test_terminal_only_redraws_on_change() {
        // Arrange
        let mut status = TerminalStatus::new(Vec::new(), HidKeyCode::KeyP);
        let mut store = store();

        // Act
        status.render(&store.snapshot(), CaptureMode::Enabled);
        let after_first = status.out.len();
        status.render(&store.snapshot(), CaptureMode::Enabled);
        let after_repeat = status.out.len();
        store.set_discrete(DiscreteId::Modifier(Modifier::Ctrl), true).unwrap();
        status.render(&store.snapshot(), CaptureMode::Enabled);

        // Assert
        assert!(after_first > 0);
        assert_eq!(after_repeat, after_first);
        let text = String::from_utf8(status.out).unwrap();
        assert!(text.ends_with("Scroll Wheel Speed: 0.00\n"));
        assert!(text.contains("ctrl: Pressed"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let mut status = TerminalStatus::new(BrokenPipe, HidKeyCode::KeyP);
        status.render(&store().snapshot(), CaptureMode::Enabled);
    }
}
