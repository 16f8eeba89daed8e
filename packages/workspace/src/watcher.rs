use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::warn;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Invalid sheet filter: {0}")]
    FilterError(#[from] regex::Error),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Watches a source directory and yields file events on a tokio channel
pub struct SheetWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
}

impl SheetWatcher {
    pub fn new(path: &Path) -> WatcherResult<Self> {
        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Wait for the next event. Watch errors are logged and skipped.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await? {
                Ok(event) => return Some(event),
                Err(error) => warn!(%error, "Watch error"),
            }
        }
    }

    pub fn try_next_event(&mut self) -> Option<Event> {
        match self.receiver.try_recv() {
            Ok(Ok(event)) => Some(event),
            _ => None,
        }
    }
}

/// Files whose contents may have changed
pub fn changed_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => event.paths.as_slice(),
        _ => &[],
    }
}

/// Maps sheet names, usually URLs, to file names under the watched root.
///
/// Without a pattern every sheet is watched under the last segment of its
/// name. With a pattern only matching sheets are watched, and the first
/// capture group, when present, is the file name.
#[derive(Debug, Clone, Default)]
pub struct SheetFilter {
    pattern: Option<Regex>,
}

impl SheetFilter {
    pub fn new(pattern: Option<&str>) -> WatcherResult<Self> {
        Ok(Self {
            pattern: pattern.map(Regex::new).transpose()?,
        })
    }

    pub fn file_name(&self, sheet_name: &str) -> Option<String> {
        let Some(pattern) = &self.pattern else {
            return last_segment(sheet_name);
        };
        let captures = pattern.captures(sheet_name)?;
        match captures.get(1) {
            Some(group) if !group.as_str().is_empty() => Some(group.as_str().to_string()),
            _ => last_segment(sheet_name),
        }
    }

    pub fn resolve(&self, root: &Path, sheet_name: &str) -> Option<PathBuf> {
        self.file_name(sheet_name).map(|name| root.join(name))
    }
}

fn last_segment(sheet_name: &str) -> Option<String> {
    let path = sheet_name.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}
