use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Any line containing this phrase ends the preamble of a catalog document.
pub const HEADER_MARKER: &str = "TITLE and AUTHOR";
/// Lines starting with this character wrap the title of the previous entry.
pub const CONTINUATION_MARKER: char = '~';
/// Separates the title from the author inside an entry's text.
pub const AUTHOR_SEPARATOR: &str = ", by ";
/// Author recorded when an entry doesn't name one.
pub const UNKNOWN_AUTHOR: &str = "Unknown";
/// File name of the catalog document inside Project Gutenberg archives.
pub const DEFAULT_CATALOG_NAME: &str = "GUTINDEX.ALL";

// Non-greedy free text, whitespace, a digit run, then nothing but whitespace.
regex!(ENTRY_REGEX, r"^(.+?)\s+(\d+)\s*$");
// Matches `pg345.txt`, `345.txt` and `345-0.txt` (the `-0`/`-8` suffixes are
// encoding variants of the same etext).
regex!(CONTENT_NAME_REGEX, r"^(?:pg)?(\d+)(?:-\d+)?\.txt$");
