//! Capability contracts every vendor implements.

use crate::error::Result;
use crate::quarantine::Entry;

use std::fmt::Debug;
use std::path::Path;

/// One vendor's quarantine store bound to a root path.
///
/// Implementations must:
/// - return an empty vector, not an error, when the store holds nothing;
/// - skip records they cannot read instead of failing the whole export;
/// - have no side effects outside the vendor's own store, so `export` can be
///   called again and re-read the store.
pub trait QuarantineAdapter: Send + Sync + Debug {
    /// Stable vendor identifier. Used as the archive namespace and the
    /// `antivirus` report column.
    fn name(&self) -> &str;

    /// Root the adapter was bound to.
    fn root(&self) -> &Path;

    /// Reads and decodes the store.
    fn export(&self) -> Result<Vec<Entry>>;
}

/// Outcome of looking for one vendor's store under a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    Absent,
    Present,
    Corrupt { reason: String },
}

impl StoreStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, StoreStatus::Present)
    }
}

/// Constructor for one vendor's adapter, registered in the [`Registry`].
///
/// [`Registry`]: crate::quarantine::Registry
pub trait AdapterFactory: Send + Sync + Debug {
    /// Lookup key for targeted initialization (`--vendor`).
    fn key(&self) -> &str;

    /// Display name, identical to the adapter's [`QuarantineAdapter::name`].
    fn name(&self) -> &str;

    /// Checks whether the store exists under `root` and looks well-formed.
    /// Absence is a normal result and must not be reported as an error.
    fn probe(&self, root: &Path) -> StoreStatus;

    /// Binds an adapter to `root` without probing.
    fn open(&self, root: &Path) -> Result<Box<dyn QuarantineAdapter>>;
}
