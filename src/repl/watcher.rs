use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Watches one configuration file and forwards notify events to a channel.
///
/// The parent directory is watched rather than the file, since editors
/// often save by writing a new file and renaming it over the old one.
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    target: Option<PathBuf>,
}

impl ConfigWatcher {
    pub fn new(tx: Sender<notify::Result<Event>>) -> notify::Result<Self> {
        let watcher = notify::recommended_watcher(move |res| {
            // Send errors mean the REPL has gone away
            let _ = tx.send(res);
        })?;

        Ok(Self {
            watcher,
            target: None,
        })
    }

    /// Watch `path`, replacing any previously watched file
    pub fn watch<P: AsRef<Path>>(&mut self, path: P) -> notify::Result<PathBuf> {
        let target = path.as_ref().canonicalize().map_err(notify::Error::io)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| notify::Error::generic("config file has no parent directory"))?;

        self.unwatch()?;
        self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        self.target = Some(target.clone());
        Ok(target)
    }

    /// Stop watching; a no-op when nothing is watched
    pub fn unwatch(&mut self) -> notify::Result<()> {
        if let Some(old) = self.target.take() {
            if let Some(dir) = old.parent() {
                self.watcher.unwatch(dir)?;
            }
        }
        Ok(())
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// The watched file, if `event` wrote to it
    pub fn changed_target(&self, event: &Event) -> Option<&Path> {
        let target = self.target.as_deref()?;
        touches(target, event).then_some(target)
    }
}

/// Whether `event` is a write or creation of `target`
fn touches(target: &Path, event: &Event) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p == target || (p.file_name() == target.file_name() && p.parent() == target.parent()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_touches_only_target_writes() {
        let target = Path::new("/tmp/etude/config.json");
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert!(touches(target, &event(modify, "/tmp/etude/config.json")));
        assert!(touches(
            target,
            &event(EventKind::Create(CreateKind::File), "/tmp/etude/config.json")
        ));
        assert!(!touches(target, &event(modify, "/tmp/etude/other.json")));
        assert!(!touches(target, &event(modify, "/tmp/elsewhere/config.json")));
        assert!(!touches(
            target,
            &event(EventKind::Remove(RemoveKind::File), "/tmp/etude/config.json")
        ));
    }

    #[test]
    fn test_watch_missing_file_fails() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut watcher = ConfigWatcher::new(tx).unwrap();
        assert!(watcher.watch("/definitely/not/here/config.json").is_err());
        assert!(watcher.target().is_none());
    }

    #[test]
    fn test_watch_replaces_target() {
        let dir = std::env::temp_dir().join(format!("etude-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let first = dir.join("a.json");
        let second = dir.join("b.json");
        std::fs::write(&first, "{}").unwrap();
        std::fs::write(&second, "{}").unwrap();

        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut watcher = ConfigWatcher::new(tx).unwrap();
        watcher.watch(&first).unwrap();
        let target = watcher.watch(&second).unwrap();
        assert_eq!(watcher.target(), Some(target.as_path()));

        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &target.to_string_lossy(),
        );
        assert_eq!(watcher.changed_target(&write), Some(target.as_path()));
        watcher.unwatch().unwrap();
        assert!(watcher.changed_target(&write).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
