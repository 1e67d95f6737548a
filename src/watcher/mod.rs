//! Polling file watcher for the markdown and CSS inputs.
//!
//! A single background thread stats each configured file once per interval,
//! re-reads it when the modification time moves, and reports only real
//! content changes. The thread never touches settings: it sends
//! [`WatchEvent`]s, calls the owner's update request, and the owner applies
//! them.
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::settings::DEFAULT_POLL_INTERVAL;

/// Which input a watched file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    Markdown,
    Css,
}

/// New content read from a watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub target: WatchTarget,
    pub path: PathBuf,
    pub content: String,
}

/// Everything that changed during one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub changes: Vec<FileChange>,
}

/// Files to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub markdown_path: Option<PathBuf>,
    pub css_path: Option<PathBuf>,
    pub interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            markdown_path: None,
            css_path: None,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchConfig {
    fn interval(&self) -> Duration {
        if self.interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.interval
        }
    }
}

/// Poll bookkeeping for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    pub path: PathBuf,
    pub last_modified: Option<SystemTime>,
    pub last_seen_content: Option<String>,
}

impl WatchState {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_modified: None,
            last_seen_content: None,
        }
    }

    /// Returns the new content if the file changed since the last poll.
    ///
    /// A successful read always advances `last_modified`, even when the
    /// bytes are unchanged, so a touched file is read once and not again.
    fn poll(&mut self) -> Option<String> {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                trace!(path = %self.path.display(), %err, "stat failed, skipping");
                return None;
            }
        };
        if self.last_modified == Some(modified) {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %self.path.display(), %err, "read failed, retrying next poll");
                return None;
            }
        };
        self.last_modified = Some(modified);

        if self.last_seen_content.as_deref() == Some(content.as_str()) {
            trace!(path = %self.path.display(), "modified time moved, content unchanged");
            return None;
        }
        self.last_seen_content = Some(content.clone());
        Some(content)
    }
}

/// The per-file state machine driven by the watcher thread.
#[derive(Debug, Default)]
pub struct Poller {
    interval: Duration,
    markdown: Option<WatchState>,
    css: Option<WatchState>,
}

impl Poller {
    pub fn new(config: &WatchConfig) -> Self {
        let mut poller = Self::default();
        poller.configure(config);
        poller
    }

    /// Apply a new configuration. State survives for paths that did not
    /// change and is dropped for paths that are no longer watched.
    ///
    /// Returns true if a path was added that has never been polled.
    pub fn configure(&mut self, config: &WatchConfig) -> bool {
        self.interval = config.interval();
        let markdown_added = retarget(&mut self.markdown, config.markdown_path.as_ref());
        let css_added = retarget(&mut self.css, config.css_path.as_ref());
        markdown_added || css_added
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn is_idle(&self) -> bool {
        self.markdown.is_none() && self.css.is_none()
    }

    pub const fn state(&self, target: WatchTarget) -> Option<&WatchState> {
        match target {
            WatchTarget::Markdown => self.markdown.as_ref(),
            WatchTarget::Css => self.css.as_ref(),
        }
    }

    /// Run one poll cycle over every configured file.
    pub fn poll(&mut self) -> Vec<FileChange> {
        let mut changes = Vec::new();
        for (target, slot) in [
            (WatchTarget::Markdown, &mut self.markdown),
            (WatchTarget::Css, &mut self.css),
        ] {
            let Some(state) = slot.as_mut() else {
                continue;
            };
            if let Some(content) = state.poll() {
                debug!(?target, path = %state.path.display(), bytes = content.len(), "file content changed");
                changes.push(FileChange {
                    target,
                    path: state.path.clone(),
                    content,
                });
            }
        }
        changes
    }
}

fn retarget(slot: &mut Option<WatchState>, path: Option<&PathBuf>) -> bool {
    match (slot.as_ref(), path) {
        (Some(state), Some(path)) if state.path == *path => false,
        (_, Some(path)) => {
            *slot = Some(WatchState::new(path.clone()));
            true
        }
        (_, None) => {
            *slot = None;
            false
        }
    }
}

enum Command {
    Configure(WatchConfig),
    Stop,
}

/// Handle to the background polling thread.
///
/// Dropping the handle stops the thread and waits for it to exit.
pub struct FileWatcher {
    commands: Sender<Command>,
    events: Receiver<WatchEvent>,
    handle: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Start polling with `config`.
    ///
    /// `request_update` runs on the watcher thread once for every event it
    /// queues, so the owner knows to drain the queue.
    ///
    /// # Errors
    /// Returns [`Error::WatcherSpawn`] if the thread cannot be created.
    pub fn spawn(
        config: WatchConfig,
        request_update: impl Fn() + Send + 'static,
    ) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let poller = Poller::new(&config);
        let handle = thread::Builder::new()
            .name("mdsource-watcher".to_string())
            .spawn(move || run(poller, &command_rx, &event_tx, &request_update))
            .map_err(Error::WatcherSpawn)?;

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Replace the watched paths and interval.
    pub fn configure(&self, config: WatchConfig) {
        if self.commands.send(Command::Configure(config)).is_err() {
            warn!("file watcher thread is gone, configuration dropped");
        }
    }

    /// Next pending event, without blocking.
    pub fn try_next(&self) -> Option<WatchEvent> {
        self.events.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Stop the thread and wait for it. Called automatically on drop.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.commands.send(Command::Stop);
        if handle.join().is_err() {
            warn!("file watcher thread panicked");
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut poller: Poller,
    commands: &Receiver<Command>,
    events: &Sender<WatchEvent>,
    request_update: &dyn Fn(),
) {
    // Files known at spawn are read right away, same as ones added later.
    let mut next_poll = if poller.is_idle() {
        Instant::now() + poller.interval()
    } else {
        Instant::now()
    };
    loop {
        let wait = next_poll.saturating_duration_since(Instant::now());
        match commands.recv_timeout(wait) {
            Ok(Command::Configure(config)) => {
                let added = poller.configure(&config);
                let now = Instant::now();
                next_poll = if added {
                    now
                } else {
                    next_poll.min(now + poller.interval())
                };
                continue;
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        next_poll = Instant::now() + poller.interval();
        if poller.is_idle() {
            continue;
        }
        let changes = poller.poll();
        if changes.is_empty() {
            continue;
        }
        if events.send(WatchEvent { changes }).is_err() {
            break;
        }
        request_update();
    }
    debug!("file watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn set_mtime(path: &std::path::Path, secs: u64) {
        let file = File::options().write(true).open(path).expect("open");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .expect("set mtime");
    }

    fn markdown_config(path: PathBuf) -> WatchConfig {
        WatchConfig {
            markdown_path: Some(path),
            css_path: None,
            interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_touch_without_content_change_advances_mtime_only() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Same").expect("write");
        set_mtime(&path, 1_000);

        let mut poller = Poller::new(&markdown_config(path.clone()));
        assert_eq!(poller.poll().len(), 1, "first read reports content");

        set_mtime(&path, 2_000);
        assert!(poller.poll().is_empty(), "same bytes must not trigger");
        let state = poller.state(WatchTarget::Markdown).expect("state");
        assert_eq!(
            state.last_modified,
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000))
        );
        assert_eq!(state.last_seen_content.as_deref(), Some("# Same"));
    }

    #[test]
    fn test_content_change_reported_once() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "one").expect("write");
        set_mtime(&path, 1_000);

        let mut poller = Poller::new(&markdown_config(path.clone()));
        poller.poll();

        std::fs::write(&path, "two").expect("write");
        set_mtime(&path, 2_000);
        let changes = poller.poll();
        assert_eq!(
            changes,
            vec![FileChange {
                target: WatchTarget::Markdown,
                path: path.clone(),
                content: "two".to_string(),
            }]
        );
        assert!(poller.poll().is_empty(), "unchanged mtime is skipped");
        assert_eq!(
            poller
                .state(WatchTarget::Markdown)
                .and_then(|s| s.last_seen_content.as_deref()),
            Some("two")
        );
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("later.css");
        let mut poller = Poller::new(&WatchConfig {
            markdown_path: None,
            css_path: Some(path.clone()),
            interval: Duration::from_millis(20),
        });
        assert!(poller.poll().is_empty());
        assert_eq!(
            poller.state(WatchTarget::Css).and_then(|s| s.last_modified),
            None
        );

        std::fs::write(&path, "body {}").expect("write");
        let changes = poller.poll();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target, WatchTarget::Css);
    }

    #[test]
    fn test_configure_keeps_state_for_same_path_and_clears_removed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "text").expect("write");

        let config = markdown_config(path.clone());
        let mut poller = Poller::new(&config);
        poller.poll();

        assert!(!poller.configure(&config), "same path is not new");
        assert!(poller.poll().is_empty());

        assert!(!poller.configure(&WatchConfig::default()));
        assert!(poller.is_idle());
        assert!(poller.state(WatchTarget::Markdown).is_none());

        assert!(poller.configure(&config), "re-added path starts fresh");
        assert_eq!(poller.poll().len(), 1);
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let poller = Poller::new(&WatchConfig {
            interval: Duration::ZERO,
            ..WatchConfig::default()
        });
        assert_eq!(poller.interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_thread_delivers_change_event() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "**bold**").expect("write");

        let watcher = FileWatcher::spawn(markdown_config(path.clone()), || {}).expect("spawn");
        let event = watcher
            .next_timeout(Duration::from_secs(5))
            .expect("change event");
        assert_eq!(event.changes.len(), 1);
        assert_eq!(event.changes[0].content, "**bold**");
        assert!(
            watcher.next_timeout(Duration::from_millis(100)).is_none(),
            "unchanged file must stay quiet"
        );
    }

    #[test]
    fn test_drop_stops_thread_promptly() {
        let watcher = FileWatcher::spawn(
            WatchConfig {
                interval: Duration::from_secs(30),
                ..WatchConfig::default()
            },
            || {},
        )
        .expect("spawn");
        let start = Instant::now();
        drop(watcher);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_configure_picks_up_new_file_without_waiting_full_interval() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("late.md");
        std::fs::write(&path, "late").expect("write");

        let watcher = FileWatcher::spawn(
            WatchConfig {
                interval: Duration::from_secs(30),
                ..WatchConfig::default()
            },
            || {},
        )
        .expect("spawn");
        watcher.configure(WatchConfig {
            markdown_path: Some(path),
            css_path: None,
            interval: Duration::from_secs(30),
        });
        let event = watcher.next_timeout(Duration::from_secs(5));
        assert!(event.is_some(), "newly configured file should be read promptly");
    }

    #[test]
    fn test_file_present_at_spawn_is_read_without_waiting_full_interval() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "ready").expect("write");

        let watcher = FileWatcher::spawn(
            WatchConfig {
                markdown_path: Some(path),
                css_path: None,
                interval: Duration::from_secs(30),
            },
            || {},
        )
        .expect("spawn");
        let event = watcher
            .next_timeout(Duration::from_secs(5))
            .expect("initial read");
        assert_eq!(event.changes[0].content, "ready");
    }

    #[test]
    fn test_update_requested_once_per_content_change() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "one").expect("write");
        set_mtime(&path, 1_000);

        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let watcher = FileWatcher::spawn(markdown_config(path.clone()), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("spawn");

        watcher
            .next_timeout(Duration::from_secs(5))
            .expect("initial read");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        std::fs::write(&path, "two").expect("write");
        set_mtime(&path, 2_000);
        watcher
            .next_timeout(Duration::from_secs(5))
            .expect("second change");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(requests.load(Ordering::SeqCst), 2);

        set_mtime(&path, 3_000);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(requests.load(Ordering::SeqCst), 2, "touch is not a change");
    }
}
