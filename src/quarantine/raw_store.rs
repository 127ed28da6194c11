//! Adapters that export a vendor's quarantine containers verbatim.
//!
//! The containers are copied byte for byte; decoding them is left to
//! vendor-specific adapters plugged into the registry.

use crate::error::{MalDumpError, Result};
use crate::quarantine::vendors::VendorLayout;
use crate::quarantine::{AdapterFactory, Entry, QuarantineAdapter, StoreStatus};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn store_dir(layout: &VendorLayout, root: &Path) -> PathBuf {
    layout
        .store
        .split('/')
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

#[derive(Debug, Clone)]
pub struct RawStoreFactory {
    layout: &'static VendorLayout,
    max_depth: usize,
}

impl RawStoreFactory {
    pub fn new(layout: &'static VendorLayout, max_depth: usize) -> Self {
        Self {
            layout,
            max_depth: max_depth.max(1),
        }
    }
}

impl AdapterFactory for RawStoreFactory {
    fn key(&self) -> &str {
        self.layout.key
    }

    fn name(&self) -> &str {
        self.layout.name
    }

    fn probe(&self, root: &Path) -> StoreStatus {
        let store = store_dir(self.layout, root);

        let metadata = match fs::metadata(&store) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return StoreStatus::Absent,
            Err(e) => {
                return StoreStatus::Corrupt {
                    reason: format!("cannot access {}: {}", store.display(), e),
                }
            }
        };

        if !metadata.is_dir() {
            return StoreStatus::Corrupt {
                reason: format!("{} is not a directory", store.display()),
            };
        }

        if let Err(e) = fs::read_dir(&store) {
            return StoreStatus::Corrupt {
                reason: format!("cannot list {}: {}", store.display(), e),
            };
        }

        if let Some(marker) = self.layout.marker {
            if !store.join(marker).exists() {
                return StoreStatus::Corrupt {
                    reason: format!("missing {} in {}", marker, store.display()),
                };
            }
        }

        StoreStatus::Present
    }

    fn open(&self, root: &Path) -> Result<Box<dyn QuarantineAdapter>> {
        let filter = ContainerFilter::new(self.layout.containers).map_err(|e| {
            MalDumpError::Config {
                message: format!("Invalid container pattern for {}: {}", self.layout.name, e),
            }
        })?;

        Ok(Box::new(RawStoreAdapter {
            layout: self.layout,
            root: root.to_path_buf(),
            filter,
            max_depth: self.max_depth,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ContainerFilter {
    pattern: Regex,
}

impl ContainerFilter {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// `relative` is the store-relative path with `/` separators.
    pub fn is_container(&self, relative: &str) -> bool {
        self.pattern.is_match(relative)
    }
}

#[derive(Debug)]
pub struct RawStoreAdapter {
    layout: &'static VendorLayout,
    root: PathBuf,
    filter: ContainerFilter,
    max_depth: usize,
}

impl RawStoreAdapter {
    pub fn store_dir(&self) -> PathBuf {
        store_dir(self.layout, &self.root)
    }

    fn relative_name(entry: &DirEntry, store: &Path) -> Option<String> {
        let relative = entry.path().strip_prefix(store).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    fn read_container(&self, path: &Path, relative: &str) -> Result<Entry> {
        let corrupt = |e: std::io::Error| MalDumpError::RecordCorrupt {
            vendor: self.layout.name.to_string(),
            record: relative.to_string(),
            reason: e.to_string(),
        };

        let malfile = fs::read(path).map_err(corrupt)?;
        let timestamp = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let md5 = format!("{:x}", Md5::digest(&malfile));

        Ok(Entry::builder(format!("{}/{}", self.layout.store, relative), malfile)
            .maybe_timestamp(timestamp)
            .md5(md5)
            .build())
    }

    /// Container files under `store`, with their store-relative names.
    fn containers(&self, store: &Path) -> Vec<(PathBuf, String)> {
        let walker = WalkDir::new(store)
            .max_depth(self.max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        let mut containers = Vec::new();
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    tracing::warn!(vendor = self.layout.name, error = %err, "skipping unreadable quarantine path");
                    continue;
                }
            };

            if !item.file_type().is_file() {
                continue;
            }

            let Some(relative) = Self::relative_name(&item, store) else {
                continue;
            };
            if self.filter.is_container(&relative) {
                containers.push((item.into_path(), relative));
            }
        }
        containers
    }

    /// Unreadable records are logged and skipped; the rest are still read.
    fn read_containers(&self, containers: &[(PathBuf, String)]) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(containers.len());
        for (path, relative) in containers {
            match self.read_container(path, relative) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::warn!(vendor = self.layout.name, %error, "skipping quarantine record");
                }
            }
        }
        entries
    }
}

impl QuarantineAdapter for RawStoreAdapter {
    fn name(&self) -> &str {
        self.layout.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn export(&self) -> Result<Vec<Entry>> {
        let store = self.store_dir();
        if !store.is_dir() {
            return Err(MalDumpError::store_corrupt(
                self.layout.name,
                format!("{} is no longer readable", store.display()),
            ));
        }

        let entries = self.read_containers(&self.containers(&store));
        tracing::debug!(vendor = self.layout.name, count = entries.len(), "exported quarantine store");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::vendors::LAYOUTS;
    use tempfile::TempDir;

    fn layout(key: &str) -> &'static VendorLayout {
        LAYOUTS.iter().find(|l| l.key == key).unwrap()
    }

    fn create_store(root: &Path, layout: &VendorLayout) -> PathBuf {
        let store = store_dir(layout, root);
        fs::create_dir_all(&store).unwrap();
        store
    }

    #[test]
    fn test_probe_absent() {
        let root = TempDir::new().unwrap();
        let factory = RawStoreFactory::new(layout("malwarebytes"), 8);
        assert_eq!(factory.probe(root.path()), StoreStatus::Absent);
    }

    #[test]
    fn test_probe_present() {
        let root = TempDir::new().unwrap();
        create_store(root.path(), layout("malwarebytes"));
        let factory = RawStoreFactory::new(layout("malwarebytes"), 8);
        assert_eq!(factory.probe(root.path()), StoreStatus::Present);
    }

    #[test]
    fn test_probe_store_is_a_file() {
        let root = TempDir::new().unwrap();
        let store = store_dir(layout("mcafee"), root.path());
        fs::write(&store, b"not a directory").unwrap();

        let factory = RawStoreFactory::new(layout("mcafee"), 8);
        assert!(matches!(
            factory.probe(root.path()),
            StoreStatus::Corrupt { .. }
        ));
    }

    #[test]
    fn test_probe_missing_marker() {
        let root = TempDir::new().unwrap();
        create_store(root.path(), layout("defender"));
        let factory = RawStoreFactory::new(layout("defender"), 8);
        assert!(matches!(
            factory.probe(root.path()),
            StoreStatus::Corrupt { .. }
        ));
    }

    #[test]
    fn test_export_copies_matching_containers() {
        let root = TempDir::new().unwrap();
        let store = create_store(root.path(), layout("malwarebytes"));
        fs::write(store.join("b.data"), b"second").unwrap();
        fs::write(store.join("a.data"), b"first").unwrap();
        fs::write(store.join("a.quar"), b"metadata").unwrap();

        let factory = RawStoreFactory::new(layout("malwarebytes"), 8);
        let adapter = factory.open(root.path()).unwrap();
        let entries = adapter.export().unwrap();

        assert_eq!(adapter.name(), "Malwarebytes");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].path(),
            "ProgramData/Malwarebytes/MBAMService/Quarantine/a.data"
        );
        assert_eq!(entries[0].malfile(), b"first");
        assert_eq!(entries[0].md5(), "8b04d5e3775d298e78455efc5ca404d5");
        assert!(entries[0].timestamp().is_some());
        assert!(entries.iter().all(Entry::is_consistent));
    }

    #[test]
    fn test_export_empty_store() {
        let root = TempDir::new().unwrap();
        create_store(root.path(), layout("avira"));
        let adapter = RawStoreFactory::new(layout("avira"), 8)
            .open(root.path())
            .unwrap();
        assert!(adapter.export().unwrap().is_empty());
    }

    #[test]
    fn test_export_nested_containers() {
        let root = TempDir::new().unwrap();
        let store = create_store(root.path(), layout("defender"));
        let bucket = store.join("ResourceData").join("3A");
        fs::create_dir_all(&bucket).unwrap();
        fs::create_dir_all(store.join("Entries")).unwrap();
        fs::write(bucket.join("3AF1C2"), b"payload").unwrap();
        fs::write(store.join("Entries").join("{0000}"), b"entry").unwrap();

        let factory = RawStoreFactory::new(layout("defender"), 8);
        assert_eq!(factory.probe(root.path()), StoreStatus::Present);

        let entries = factory.open(root.path()).unwrap().export().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path().ends_with("Quarantine/ResourceData/3A/3AF1C2"));
    }

    #[test]
    fn test_export_after_store_removed() {
        let root = TempDir::new().unwrap();
        let store = create_store(root.path(), layout("gdata"));
        let adapter = RawStoreFactory::new(layout("gdata"), 8)
            .open(root.path())
            .unwrap();

        fs::remove_dir_all(&store).unwrap();
        assert!(matches!(
            adapter.export(),
            Err(MalDumpError::StoreCorrupt { .. })
        ));
    }

    #[test]
    fn test_unreadable_record_is_skipped() {
        let root = TempDir::new().unwrap();
        let mbam = layout("malwarebytes");
        let store = create_store(root.path(), mbam);
        fs::write(store.join("a.data"), b"first").unwrap();
        fs::write(store.join("c.data"), b"third").unwrap();

        let adapter = RawStoreAdapter {
            layout: mbam,
            root: root.path().to_path_buf(),
            filter: ContainerFilter::new(mbam.containers).unwrap(),
            max_depth: 8,
        };

        let mut containers = adapter.containers(&store);
        assert_eq!(containers.len(), 2);
        containers.insert(1, (store.join("b.data"), "b.data".to_string()));

        assert!(matches!(
            adapter.read_container(&containers[1].0, &containers[1].1),
            Err(MalDumpError::RecordCorrupt { ref record, .. }) if record == "b.data"
        ));

        let entries = adapter.read_containers(&containers);
        let payloads: Vec<&[u8]> = entries.iter().map(Entry::malfile).collect();
        assert_eq!(payloads, vec![&b"first"[..], &b"third"[..]]);
    }

    #[test]
    fn test_container_filter() {
        let filter = ContainerFilter::new(r"(?i)\.bup$").unwrap();
        assert!(filter.is_container("sample.BUP"));
        assert!(!filter.is_container("sample.bup.txt"));
        assert!(ContainerFilter::new("(").is_err());
    }
}
