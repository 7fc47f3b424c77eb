use crate::consts::CONTENT_NAME_REGEX;
use std::path::Path;

/// Derive the etext number of a content file from its archive path.
///
/// Only the file name is considered, so `cache/epub/345/pg345.txt`,
/// `files/345/345-0.txt` and `345.txt` all resolve to `345`.
///
/// ```
/// use bookcase_catalog::etext_number_from_path;
///
/// assert_eq!(etext_number_from_path("cache/epub/345/pg345.txt"), Some(345));
/// assert_eq!(etext_number_from_path("cache/epub/345/pg345.rdf"), None);
/// ```
pub fn etext_number_from_path(path: impl AsRef<Path>) -> Option<u64> {
    let name = path.as_ref().file_name()?.to_str()?;
    let captures = CONTENT_NAME_REGEX.captures(name)?;
    captures.get(1)?.as_str().parse::<u64>().ok().filter(|number| *number > 0)
}

/// Whether an archive path points at the catalog document.
///
/// Compares the file name only, ignoring ASCII case.
pub fn is_catalog_path(path: impl AsRef<Path>, catalog_name: &str) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(catalog_name))
}
