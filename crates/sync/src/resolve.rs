//! Which remote archives have no local counterpart yet.

use logstat_compress::Compression;
use std::collections::BTreeSet;

/// Remote names with no decompressed counterpart in `local`.
///
/// Every local `*.log` name is mapped to the `*.log.gz` archive it came from
/// before comparing. Other local files (transient archives left behind by an
/// interrupted run, unrelated files) are ignored. The result is sorted so
/// that runs log in a stable order.
///
/// ```
/// let remote = ["site-2024-01-01.log.gz", "site-2024-01-02.log.gz"];
/// let local = ["site-2024-01-01.log", "notes.txt"];
/// assert_eq!(logstat_sync::resolve::missing(remote, local), vec!["site-2024-01-02.log.gz"]);
/// ```
pub fn missing<'a>(
    remote: impl IntoIterator<Item = &'a str>,
    local: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let present: BTreeSet<String> = local
        .into_iter()
        .filter(|name| Compression::from_path(name) == Compression::None && name.ends_with(".log"))
        .map(|name| Compression::Gzip.append_extension(name))
        .collect();
    let remote: BTreeSet<&str> = remote.into_iter().collect();
    remote.into_iter().filter(|name| !present.contains(*name)).collect()
}
