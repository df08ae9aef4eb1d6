//! Partial template discovery
//!
//! Partials are found once, when the renderer is built, by listing
//! `<root>/<partials>` and keeping the files carrying the template extension.
//! Each partial is identified as `<partials>/<file stem>`, which is the name
//! templates use to include it.

use std::path::Path;

use crate::error::LayoutError;

/// List the partial identifiers under `root/partials`
///
/// Entries are returned in directory-listing order; the order is not
/// normalised.
///
/// # Errors
///
/// Returns [`LayoutError::PartialDiscovery`] if the directory cannot be read.
///
/// # Examples
///
/// ```rust,no_run
/// use acton_layout::template::discover_partials;
///
/// # fn example() -> Result<(), acton_layout::error::LayoutError> {
/// let partials = discover_partials("templates".as_ref(), "partials", ".html")?;
/// // e.g. ["partials/header", "partials/footer"]
/// # Ok(())
/// # }
/// ```
pub fn discover_partials(
    root: &Path,
    partials: &str,
    extension: &str,
) -> Result<Vec<String>, LayoutError> {
    let dir = root.join(partials);
    let discovery_error = |source| LayoutError::PartialDiscovery {
        path: dir.clone(),
        source,
    };

    let mut found = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping partial with non UTF-8 name");
            continue;
        };

        match name.strip_suffix(extension) {
            Some(stem) if !stem.is_empty() => found.push(format!("{partials}/{stem}")),
            _ => {}
        }
    }

    tracing::debug!(dir = %dir.display(), count = found.len(), "discovered partials");
    Ok(found)
}
