//! Turns vendor-recorded paths into archive member names.
//!
//! Vendor metadata is untrusted: paths can come from either OS, carry drive
//! letters, be empty, or try to climb out of the archive with `..`.

use std::collections::HashSet;

pub const DEFAULT_DELIMITER: &str = "/";

/// Returns the part after the drive letter of a `C:\dir\file` style path.
///
/// Only a path with exactly one colon qualifies; no colon or several colons
/// mean the path is not drive-prefixed.
pub fn strip_drive(path: &str) -> Option<&str> {
    let mut parts = path.split(':');
    let _drive = parts.next()?;
    let rest = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(rest)
}

/// Drops the drive letter of a Windows path and rejoins its components with
/// `delimiter`. Anything else is returned unchanged.
///
/// ```
/// use maldump::export::normalize_path;
///
/// assert_eq!(normalize_path(r"C:\Users\a\file.exe", "/"), "Users/a/file.exe");
/// assert_eq!(normalize_path(r"C:\a\b.exe", "_"), "a_b.exe");
/// assert_eq!(normalize_path("/var/lib/file.bin", "/"), "/var/lib/file.bin");
/// ```
pub fn normalize_path(path: &str, delimiter: &str) -> String {
    match strip_drive(path) {
        Some(rest) => rest
            .split('\\')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(delimiter),
        None => path.to_string(),
    }
}

/// Makes one path segment safe to use on any OS.
pub fn sanitize_segment(segment: &str) -> String {
    let sanitized: String = segment
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trailing dots and spaces are stripped by Windows
    sanitized.trim_end_matches(&['.', ' '][..]).to_string()
}

/// Re-splits a fragment on both separators and drops everything that could
/// escape the member's directory.
pub fn sanitize_fragment(fragment: &str) -> String {
    safe_segments(fragment.split(['/', '\\'])).join("/")
}

fn safe_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Vec<String> {
    segments
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Whether member names joined with `delimiter` keep it verbatim. Reserved
/// characters, backslashes, control characters and anything that forms an
/// empty, `.` or `..` segment would otherwise be rewritten or dropped.
pub fn is_safe_delimiter(delimiter: &str) -> bool {
    if delimiter.is_empty() {
        return false;
    }
    let joined = format!("a{}b", delimiter);
    sanitize_fragment(&joined) == joined
}

/// `<adapter>/<normalized path>`, or `<adapter>/unnamed_<index>` when nothing
/// usable is left of the recorded path.
///
/// Follows [`normalize_path`], except that unsafe segments are removed before
/// the delimiter joins them and non-drive paths lose their leading `/`.
pub fn archive_member_name(adapter: &str, path: &str, delimiter: &str, index: usize) -> String {
    let namespace = match sanitize_segment(adapter) {
        ns if ns.is_empty() => "unknown".to_string(),
        ns => ns,
    };

    let fragment = match strip_drive(path) {
        Some(rest) => sanitize_fragment(&safe_segments(rest.split('\\')).join(delimiter)),
        None => sanitize_fragment(path),
    };

    if fragment.is_empty() {
        format!("{}/unnamed_{}", namespace, index)
    } else {
        format!("{}/{}", namespace, fragment)
    }
}

/// Hands out archive member names that can all be unpacked side by side:
/// no name repeats, and no name is both a file and a parent directory.
#[derive(Debug)]
pub struct MemberNamer {
    delimiter: String,
    files: HashSet<String>,
    dirs: HashSet<String>,
}

impl MemberNamer {
    pub fn new<S: Into<String>>(delimiter: S) -> Self {
        Self {
            delimiter: delimiter.into(),
            files: HashSet::new(),
            dirs: HashSet::new(),
        }
    }

    /// Repeats get a numeric suffix: `x/y.exe`, `x/y.exe.1`, `x/y.exe.2`.
    /// A parent directory already taken by a file is suffixed the same way,
    /// so `v/a` followed by `v/a/b.exe` yields `v/a.1/b.exe`.
    pub fn member_name(&mut self, adapter: &str, path: &str, index: usize) -> String {
        let base = archive_member_name(adapter, path, &self.delimiter, index);
        let mut segments: Vec<String> = base.split('/').map(str::to_string).collect();

        for depth in 1..segments.len() {
            let prefix = segments[..depth].join("/");
            if self.files.contains(&prefix) {
                let free = first_free(&prefix, |candidate| self.files.contains(candidate));
                segments[depth - 1] = free.rsplit('/').next().unwrap_or(&free).to_string();
            }
        }

        let name = first_free(&segments.join("/"), |candidate| {
            self.files.contains(candidate) || self.dirs.contains(candidate)
        });

        for depth in 1..segments.len() {
            self.dirs.insert(segments[..depth].join("/"));
        }
        self.files.insert(name.clone());
        name
    }
}

fn first_free(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}.{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

impl Default for MemberNamer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}
