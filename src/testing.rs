//! Adapter and factory doubles shared by unit tests.

use crate::error::{MalDumpError, Result};
use crate::quarantine::{AdapterFactory, Entry, QuarantineAdapter, StoreStatus};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct FakeAdapter {
    name: String,
    root: PathBuf,
    entries: Vec<Entry>,
    export_error: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeAdapter {
    pub fn new(name: &str, entries: Vec<Entry>) -> Self {
        Self {
            name: name.to_string(),
            root: PathBuf::from("/"),
            entries,
            export_error: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adapter whose store turns out to be unreadable at export time.
    pub fn corrupt(name: &str, reason: &str) -> Self {
        Self {
            export_error: Some(reason.to_string()),
            ..Self::new(name, Vec::new())
        }
    }

    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    /// Counter of `export` calls, shared with the boxed adapter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn QuarantineAdapter> {
        Box::new(self)
    }
}

impl QuarantineAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn export(&self) -> Result<Vec<Entry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.export_error {
            Some(ref reason) => Err(MalDumpError::store_corrupt(&self.name, reason.as_str())),
            None => Ok(self.entries.clone()),
        }
    }
}

#[derive(Debug)]
pub struct FakeFactory {
    key: String,
    status: StoreStatus,
    entries: Vec<Entry>,
    open_fails: bool,
}

impl FakeFactory {
    pub fn present(key: &str, entries: Vec<Entry>) -> Self {
        Self {
            key: key.to_string(),
            status: StoreStatus::Present,
            entries,
            open_fails: false,
        }
    }

    pub fn absent(key: &str) -> Self {
        Self {
            status: StoreStatus::Absent,
            ..Self::present(key, Vec::new())
        }
    }

    pub fn corrupt(key: &str, reason: &str) -> Self {
        Self {
            status: StoreStatus::Corrupt {
                reason: reason.to_string(),
            },
            ..Self::present(key, Vec::new())
        }
    }

    pub fn failing_open(key: &str) -> Self {
        Self {
            open_fails: true,
            ..Self::present(key, Vec::new())
        }
    }
}

impl AdapterFactory for FakeFactory {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.key
    }

    fn probe(&self, _root: &Path) -> StoreStatus {
        self.status.clone()
    }

    fn open(&self, root: &Path) -> Result<Box<dyn QuarantineAdapter>> {
        if self.open_fails {
            return Err(MalDumpError::store_corrupt(&self.key, "header unreadable"));
        }
        Ok(FakeAdapter::new(&self.key, self.entries.clone())
            .with_root(root)
            .boxed())
    }
}
