//! Line-by-line parsing of catalog documents.

use crate::consts::{AUTHOR_SEPARATOR, CONTINUATION_MARKER, ENTRY_REGEX, HEADER_MARKER};
use crate::models::CatalogRecord;
use std::str::Lines;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Still inside the preamble; nothing is a record yet.
    SeekingHeader,
    /// The header marker has been seen. There is no way back.
    InIndex,
}

/// Lazy, order-preserving iterator of [`CatalogRecord`]s over the text of a
/// catalog document.
///
/// Every line before the first line containing [`HEADER_MARKER`] is ignored.
/// Afterwards, lines that don't look like an entry are skipped silently; the
/// format is noisy (section headers, wrapped titles, separators) and none of
/// that noise is an error.
///
/// # Examples
///
/// ```
/// use bookcase_catalog::CatalogParser;
///
/// let text = "Preamble 999\nTITLE and AUTHOR     ETEXT NO.\n\nDracula, by Bram Stoker     345\n";
/// let records: Vec<_> = CatalogParser::new(text).collect();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].etext_number, 345);
/// assert_eq!(records[0].author, "Bram Stoker");
/// ```
#[derive(Clone, Debug)]
pub struct CatalogParser<'a> {
    lines: Lines<'a>,
    state: State,
}

impl<'a> CatalogParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { lines: text.lines(), state: State::SeekingHeader }
    }

    /// Whether the header marker has been seen yet.
    pub fn in_index(&self) -> bool {
        self.state == State::InIndex
    }
}

impl Iterator for CatalogParser<'_> {
    type Item = CatalogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            // Real catalogs repeat the column header between sections; those
            // repeats are never entries either.
            if line.contains(HEADER_MARKER) {
                self.state = State::InIndex;
                continue;
            }
            if self.state == State::SeekingHeader {
                continue;
            }
            if let Some(record) = parse_line(line) {
                return Some(record);
            }
        }
        None
    }
}

/// Parse the full text of a catalog document.
///
/// Shorthand for [`CatalogParser::new`].
pub fn parse_catalog(text: &str) -> CatalogParser<'_> {
    CatalogParser::new(text)
}

/// Parse a single line from the index region of a catalog.
///
/// Returns `None` for blank lines, continuation lines (starting with `~`) and
/// anything that doesn't end in an etext number. Continuation lines are NOT
/// merged into the previous record; the wrapped part of a long title is
/// dropped.
pub fn parse_line(line: &str) -> Option<CatalogRecord> {
    if line.trim().is_empty() || line.starts_with(CONTINUATION_MARKER) {
        return None;
    }
    let captures = ENTRY_REGEX.captures(line)?;
    let blob = captures.get(1)?.as_str().trim();
    let digits = captures.get(2)?.as_str();
    let etext_number = match digits.parse::<u64>() {
        Ok(number) if number > 0 => number,
        _ => {
            tracing::trace!(digits, "skipping catalog line with an unusable etext number");
            return None;
        },
    };
    let (title, author) = match blob.split_once(AUTHOR_SEPARATOR) {
        Some((title, author)) => (title, Some(author)),
        None => (blob, None),
    };
    // A blob starting with the separator has nothing to its left; keep the
    // whole blob as the title rather than recording an empty one.
    let title = if title.is_empty() { blob } else { title };
    Some(CatalogRecord::new(etext_number, title, author))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::UNKNOWN_AUTHOR;
    use rstest::rstest;

    const CATALOG: &str = "\
GUTINDEX.ALL Some preamble that mentions etext 1234
Updated 2024 with entries like 99

TITLE and AUTHOR                                                     ETEXT NO.

Dracula, by Bram Stoker                                                  345
~ [Subtitle: continuation of something]                                  999
Moby Dick; Or, The Whale, by Herman Melville                            2701

Pride and Prejudice, by Jane Austen                                     1342
 [Language: English]
A Catalog Entry Without An Author                                         11
";

    #[test]
    fn test_parses_the_reference_line() {
        let line = "Dracula, by Bram Stoker                                          345";
        let record = parse_line(line).unwrap();
        assert_eq!(record, CatalogRecord::new(345, "Dracula", Some("Bram Stoker")));
    }

    #[test]
    fn test_parses_document_in_order() {
        let numbers: Vec<u64> = parse_catalog(CATALOG).map(|r| r.etext_number).collect();
        assert_eq!(numbers, vec![345, 2701, 1342, 11]);
    }

    #[test]
    fn test_preamble_is_ignored() {
        let records: Vec<_> = parse_catalog(CATALOG).collect();
        assert!(records.iter().all(|r| r.etext_number != 1234 && r.etext_number != 99));
    }

    #[test]
    fn test_nothing_is_parsed_without_header() {
        let text = "Dracula, by Bram Stoker     345\nMoby Dick, by Herman Melville     2701\n";
        let mut parser = parse_catalog(text);
        assert_eq!(parser.next(), None);
        assert!(!parser.in_index());
    }

    #[test]
    fn test_continuation_lines_are_excluded() {
        let records: Vec<_> = parse_catalog(CATALOG).collect();
        assert!(records.iter().all(|r| r.etext_number != 999));
        assert!(records.iter().all(|r| !r.title.starts_with('~')));
    }

    #[test]
    fn test_repeated_header_is_not_a_record() {
        let text = "TITLE and AUTHOR     1\nDracula, by Bram Stoker   345\nTITLE and AUTHOR     2\n";
        let numbers: Vec<u64> = parse_catalog(text).map(|r| r.etext_number).collect();
        assert_eq!(numbers, vec![345]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "TITLE and AUTHOR\r\nDracula, by Bram Stoker   345\r\n";
        let records: Vec<_> = parse_catalog(text).collect();
        assert_eq!(records, vec![CatalogRecord::new(345, "Dracula", Some("Bram Stoker"))]);
    }

    #[rstest]
    #[case("Dracula, by Bram Stoker   345", 345, "Dracula", "Bram Stoker")]
    #[case("Anonymous Pamphlet   12", 12, "Anonymous Pamphlet", UNKNOWN_AUTHOR)]
    #[case("Title, by First, by Second   7", 7, "Title", "First, by Second")]
    #[case("Trailing whitespace, by Someone   42   \t", 42, "Trailing whitespace", "Someone")]
    #[case("Numbers 1984 in title, by George Orwell   5", 5, "Numbers 1984 in title", "George Orwell")]
    #[case(", by Nobody   8", 8, ", by Nobody", "Nobody")]
    fn test_entry_lines(#[case] line: &str, #[case] number: u64, #[case] title: &str, #[case] author: &str) {
        let record = parse_line(line).unwrap();
        assert_eq!(record.etext_number, number);
        assert_eq!(record.title, title);
        assert_eq!(record.author, author);
    }

    #[rstest]
    #[case("")]
    #[case("     ")]
    #[case("~ Dracula, by Bram Stoker   345")]
    #[case("~345")]
    #[case("Just a section header")]
    #[case("345")]
    #[case("Ends in digits glued345")]
    #[case("Numbers then text 345 abc")]
    #[case("Zero is not an etext number   0")]
    #[case("Far too large   99999999999999999999999999")]
    fn test_skipped_lines(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }
}
