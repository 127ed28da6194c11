use crate::error::{MalDumpError, Result};
use crate::quarantine::adapter::{AdapterFactory, QuarantineAdapter, StoreStatus};
use crate::quarantine::vendors;

use std::path::Path;
use std::sync::Arc;

/// A vendor whose store was found but could not be used.
#[derive(Debug)]
pub struct AdapterFailure {
    pub vendor: String,
    pub error: MalDumpError,
}

/// Result of probing a root for every known vendor.
#[derive(Debug, Default)]
pub struct Detection {
    /// Adapters for the stores that were found, in catalog order.
    pub adapters: Vec<Box<dyn QuarantineAdapter>>,
    pub failures: Vec<AdapterFailure>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty() && self.failures.is_empty()
    }

    pub fn vendor_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

/// Ordered catalog of vendor adapter factories.
///
/// The order is the declaration order, not alphabetical; it decides the order
/// adapters are returned by [`Registry::detect`] and therefore how console
/// output and archive members are grouped.
#[derive(Debug, Clone)]
pub struct Registry {
    factories: Vec<Arc<dyn AdapterFactory>>,
}

impl Registry {
    pub fn new(factories: Vec<Box<dyn AdapterFactory>>) -> Self {
        Self {
            factories: factories.into_iter().map(Arc::from).collect(),
        }
    }

    /// Catalog of every vendor layout shipped with the crate.
    pub fn builtin() -> Self {
        Self::builtin_with_depth(vendors::DEFAULT_MAX_DEPTH)
    }

    /// Built-in catalog walking at most `max_depth` levels into each store.
    pub fn builtin_with_depth(max_depth: usize) -> Self {
        Self::new(vendors::builtin_factories(max_depth))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// `(key, name)` pairs in catalog order.
    pub fn vendors(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.factories.iter().map(|f| (f.key(), f.name()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Registry limited to the vendors named in `keys`, in catalog order.
    pub fn restrict(&self, keys: &[String]) -> Result<Self> {
        if let Some(unknown) = keys.iter().find(|k| !self.contains(k)) {
            return Err(MalDumpError::UnknownVendor {
                key: unknown.clone(),
            });
        }

        let factories = self
            .factories
            .iter()
            .filter(|f| keys.iter().any(|k| k.eq_ignore_ascii_case(f.key())))
            .cloned()
            .collect();

        Ok(Self { factories })
    }

    /// Builds the adapter for one vendor the caller already knows about.
    ///
    /// Unlike [`Registry::detect`], a missing store is an error here.
    pub fn named_init(&self, key: &str, root: &Path) -> Result<Box<dyn QuarantineAdapter>> {
        let factory = self.find(key).ok_or_else(|| MalDumpError::UnknownVendor {
            key: key.to_string(),
        })?;

        match factory.probe(root) {
            StoreStatus::Present => factory.open(root),
            StoreStatus::Absent => Err(MalDumpError::StoreNotFound {
                vendor: factory.name().to_string(),
                root: root.to_path_buf(),
            }),
            StoreStatus::Corrupt { reason } => {
                Err(MalDumpError::store_corrupt(factory.name(), reason))
            }
        }
    }

    /// Probes `root` for every vendor in the catalog.
    ///
    /// Never fails: absent stores are skipped silently and broken ones are
    /// reported in [`Detection::failures`] without affecting other vendors.
    pub fn detect(&self, root: &Path) -> Detection {
        let mut detection = Detection::default();

        for (factory, status) in self.probe_all(root) {
            match status {
                StoreStatus::Absent => {
                    tracing::debug!(vendor = factory.name(), root = %root.display(), "no quarantine store");
                }
                StoreStatus::Present => match factory.open(root) {
                    Ok(adapter) => {
                        tracing::debug!(vendor = factory.name(), "quarantine store detected");
                        detection.adapters.push(adapter);
                    }
                    Err(error) => {
                        tracing::warn!(vendor = factory.name(), %error, "failed to open quarantine store");
                        detection.failures.push(AdapterFailure {
                            vendor: factory.name().to_string(),
                            error,
                        });
                    }
                },
                StoreStatus::Corrupt { reason } => {
                    tracing::warn!(vendor = factory.name(), %reason, "corrupt quarantine store");
                    detection.failures.push(AdapterFailure {
                        vendor: factory.name().to_string(),
                        error: MalDumpError::store_corrupt(factory.name(), reason),
                    });
                }
            }
        }

        detection
    }

    #[cfg(feature = "parallel")]
    fn probe_all(&self, root: &Path) -> Vec<(&dyn AdapterFactory, StoreStatus)> {
        use rayon::prelude::*;

        // Indexed collect keeps catalog order.
        self.factories
            .par_iter()
            .map(|f| (f.as_ref(), f.probe(root)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn probe_all(&self, root: &Path) -> Vec<(&dyn AdapterFactory, StoreStatus)> {
        self.factories
            .iter()
            .map(|f| (f.as_ref(), f.probe(root)))
            .collect()
    }

    fn find(&self, key: &str) -> Option<&dyn AdapterFactory> {
        self.factories
            .iter()
            .find(|f| f.key().eq_ignore_ascii_case(key))
            .map(|f| f.as_ref())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
