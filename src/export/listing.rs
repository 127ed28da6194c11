use crate::export::pipeline::CollectedStore;

use console::style;
use std::io::{self, Write};

/// Prints one `--- <vendor> ---` section per store that has entries, each
/// followed by the recorded paths. Sections are separated by a blank line.
///
/// Returns the number of paths written.
pub fn write_listing<W: Write>(out: &mut W, stores: &[CollectedStore], colored: bool) -> io::Result<usize> {
    let mut written = 0;
    let mut first = true;

    for store in stores.iter().filter(|s| !s.entries.is_empty()) {
        if !first {
            writeln!(out)?;
        }
        first = false;

        let header = format!("--- {} ---", store.name);
        if colored {
            writeln!(out, "{}", style(header).yellow().force_styling(true))?;
        } else {
            writeln!(out, "{}", header)?;
        }

        for entry in &store.entries {
            writeln!(out, "{}", entry.path())?;
            written += 1;
        }
    }

    out.flush()?;
    Ok(written)
}
