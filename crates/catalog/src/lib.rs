//! Parsing of plain-text catalog indexes.
//!
//! A catalog document (Project Gutenberg's `GUTINDEX.ALL` being the canonical
//! example) is a free-form preamble followed by one line per work:
//!
//! ```text
//! TITLE and AUTHOR                                                 ETEXT NO.
//!
//! Dracula, by Bram Stoker                                                345
//! ~ wrapped continuation of a long title, ignored
//! ```
//!
//! - [`parse_catalog`] lazily yields a [`CatalogRecord`] per entry line, in
//!   document order,
//! - [`Catalog`] indexes those records by etext number for matching, and
//! - [`etext_number_from_path`] / [`is_catalog_path`] recognise the members of
//!   an archive that the catalog describes.
//!
//! Nothing in this crate fails: lines that can't be parsed are noise and are
//! skipped.

mod catalog;
mod consts;
mod models;
mod parser;
mod path;

pub use crate::catalog::Catalog;
pub use crate::consts::{AUTHOR_SEPARATOR, CONTINUATION_MARKER, DEFAULT_CATALOG_NAME, HEADER_MARKER, UNKNOWN_AUTHOR};
pub use crate::models::CatalogRecord;
pub use crate::parser::{CatalogParser, parse_catalog, parse_line};
pub use crate::path::{etext_number_from_path, is_catalog_path};
