use chrono::{DateTime, Utc};

/// One recovered quarantine record: the payload plus the metadata the vendor
/// kept about it.
///
/// Entries are produced by adapters and never modified afterwards; the fields
/// are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    timestamp: Option<DateTime<Utc>>,
    threat: String,
    path: String,
    size: u64,
    md5: String,
    malfile: Vec<u8>,
}

impl Entry {
    /// Creates an entry whose recorded size is the payload length.
    pub fn new<P: Into<String>>(path: P, malfile: Vec<u8>) -> Self {
        EntryBuilder::new(path, malfile).build()
    }

    pub fn builder<P: Into<String>>(path: P, malfile: Vec<u8>) -> EntryBuilder {
        EntryBuilder::new(path, malfile)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn threat(&self) -> &str {
        &self.threat
    }

    /// Original location of the file as recorded by the vendor. Untrusted.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size as recorded by the vendor.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn md5(&self) -> &str {
        &self.md5
    }

    pub fn malfile(&self) -> &[u8] {
        &self.malfile
    }

    pub fn payload_len(&self) -> u64 {
        self.malfile.len() as u64
    }

    /// Whether the recorded size matches the payload length.
    pub fn is_consistent(&self) -> bool {
        self.size == self.payload_len()
    }
}

#[derive(Debug, Clone)]
pub struct EntryBuilder {
    timestamp: Option<DateTime<Utc>>,
    threat: String,
    path: String,
    size: Option<u64>,
    md5: String,
    malfile: Vec<u8>,
}

impl EntryBuilder {
    pub fn new<P: Into<String>>(path: P, malfile: Vec<u8>) -> Self {
        Self {
            timestamp: None,
            threat: String::new(),
            path: path.into(),
            size: None,
            md5: String::new(),
            malfile,
        }
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn maybe_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn threat<S: Into<String>>(mut self, threat: S) -> Self {
        self.threat = threat.into();
        self
    }

    pub fn md5<S: Into<String>>(mut self, md5: S) -> Self {
        self.md5 = md5.into();
        self
    }

    /// Overrides the recorded size. Vendors occasionally disagree with the
    /// payload they hand back; the value is kept as given.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn build(self) -> Entry {
        let size = self.size.unwrap_or(self.malfile.len() as u64);
        Entry {
            timestamp: self.timestamp,
            threat: self.threat,
            path: self.path,
            size,
            md5: self.md5,
            malfile: self.malfile,
        }
    }
}
