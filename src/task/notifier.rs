// src/task/notifier.rs

//! Failure notifications.

use std::fmt::Debug;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

pub const NOTIFICATION_TITLE: &str = "assetdag notification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// Task that failed.
    pub task: String,
    /// First error diagnostic, if any.
    pub detail: Option<String>,
}

impl Notification {
    pub fn new(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            message: message.into(),
            task: task.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Capability handed to tasks for reporting failures to the developer.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, notification: &Notification);
}

/// Prints a banner on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: &Notification) {
        warn!(task = %n.task, "{}", n.message);
        let rule = "=".repeat(66);
        eprintln!("{rule}");
        eprintln!("== {}", n.title);
        eprintln!("== [{}] {}", n.task, n.message);
        if let Some(detail) = &n.detail {
            eprintln!("== {detail}");
        }
        eprintln!("{rule}");
    }
}

/// Console banner plus a desktop notification via `notify-send` (Linux) or
/// `osascript` (macOS).
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier {
    console: ConsoleNotifier,
}

impl DesktopNotifier {
    fn command(n: &Notification) -> Option<Command> {
        let body = match &n.detail {
            Some(detail) => format!("{}\n{detail}", n.message),
            None => n.message.clone(),
        };

        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification {} with title {}",
                applescript_string(&body),
                applescript_string(&n.title)
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            Some(cmd)
        } else if cfg!(unix) {
            let mut cmd = Command::new("notify-send");
            cmd.arg(&n.title).arg(body);
            Some(cmd)
        } else {
            None
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, n: &Notification) {
        self.console.notify(n);

        let Some(mut cmd) = Self::command(n) else {
            return;
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Fire and forget; reap the child on a blocking thread.
        match cmd.spawn() {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => debug!(error = %e, "desktop notification unavailable"),
        }
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_strings_are_escaped() {
        assert_eq!(applescript_string(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn notification_uses_fixed_title() {
        let n = Notification::new("css", "Error compiling CSS.").with_detail("a.css:1:1");
        assert_eq!(n.title, NOTIFICATION_TITLE);
        assert_eq!(n.detail.as_deref(), Some("a.css:1:1"));
    }
}
