//! Built-in catalog of vendor quarantine layouts.

use crate::quarantine::raw_store::RawStoreFactory;
use crate::quarantine::AdapterFactory;

/// Default walk depth inside a quarantine store.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Where a vendor keeps its quarantine, relative to the OS root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorLayout {
    pub key: &'static str,
    pub name: &'static str,
    /// Store directory relative to the root, `/`-separated.
    pub store: &'static str,
    /// Entry that must exist inside the store for it to be usable.
    pub marker: Option<&'static str>,
    /// Pattern matched against store-relative, `/`-separated container paths.
    pub containers: &'static str,
}

pub static LAYOUTS: &[VendorLayout] = &[
    VendorLayout {
        key: "defender",
        name: "Microsoft Defender",
        store: "ProgramData/Microsoft/Windows Defender/Quarantine",
        marker: Some("ResourceData"),
        containers: r"^ResourceData/[0-9A-Fa-f]{2}/[0-9A-Fa-f]+$",
    },
    VendorLayout {
        key: "malwarebytes",
        name: "Malwarebytes",
        store: "ProgramData/Malwarebytes/MBAMService/Quarantine",
        marker: None,
        containers: r"(?i)^[^/]+\.data$",
    },
    VendorLayout {
        key: "avast",
        name: "Avast",
        store: "ProgramData/Avast Software/Avast/chest",
        marker: None,
        containers: r"^[^/.]+$",
    },
    VendorLayout {
        key: "avg",
        name: "AVG",
        store: "ProgramData/AVG/Antivirus/chest",
        marker: None,
        containers: r"^[^/.]+$",
    },
    VendorLayout {
        key: "avira",
        name: "Avira",
        store: "ProgramData/Avira/Antivirus/INFECTED",
        marker: None,
        containers: r"(?i)\.qua$",
    },
    VendorLayout {
        key: "gdata",
        name: "G Data",
        store: "ProgramData/G DATA/AVK Full/Quarantine",
        marker: None,
        containers: r"(?i)\.q$",
    },
    VendorLayout {
        key: "mcafee",
        name: "McAfee",
        store: "Quarantine",
        marker: None,
        containers: r"(?i)\.bup$",
    },
];

pub fn builtin_factories(max_depth: usize) -> Vec<Box<dyn AdapterFactory>> {
    LAYOUTS
        .iter()
        .map(|layout| Box::new(RawStoreFactory::new(layout, max_depth)) as Box<dyn AdapterFactory>)
        .collect()
}
