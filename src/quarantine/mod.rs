pub mod adapter;
pub mod entry;
pub mod raw_store;
pub mod registry;
pub mod vendors;

pub use adapter::{AdapterFactory, QuarantineAdapter, StoreStatus};
pub use entry::{Entry, EntryBuilder};
pub use raw_store::{RawStoreAdapter, RawStoreFactory};
pub use registry::{AdapterFailure, Detection, Registry};
pub use vendors::{VendorLayout, DEFAULT_MAX_DEPTH};
