//! Archive fixtures built in-test.

use crate::source::ByteSource;
use bytes::Bytes;
use flate2::Compression as GzLevel;
use flate2::write::GzEncoder;
use futures::{StreamExt, stream};
use std::io::{self, Write};
use tar::{Builder, EntryType, Header};
use tokio::sync::oneshot;

pub(crate) enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
    Symlink(&'a str, &'a str),
}

pub(crate) fn tarball(members: &[Member<'_>]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for member in members {
        let mut header = Header::new_gnu();
        header.set_mode(0o644);
        header.set_mtime(1_700_000_000);
        match member {
            Member::File(path, data) => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, path, *data).unwrap();
            },
            Member::Dir(path) => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                builder.append_data(&mut header, path, io::empty()).unwrap();
            },
            Member::Symlink(path, target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                builder.append_link(&mut header, path, target).unwrap();
            },
        }
    }
    builder.into_inner().unwrap()
}

pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub(crate) fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Bytes that don't compress, so truncating the envelope lands mid-entry.
pub(crate) fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as u8
        })
        .collect()
}

/// Serves the first `served` bytes of `data` in `chunk_size` slices, then
/// never yields again. The receiver resolves once the source is dropped.
pub(crate) fn stalling_source(data: &[u8], served: usize, chunk_size: usize) -> (ByteSource, oneshot::Receiver<()>) {
    let (alive, dropped) = oneshot::channel::<()>();
    let head: Vec<io::Result<Bytes>> =
        data[..served].chunks(chunk_size).map(|chunk| Ok(Bytes::copy_from_slice(chunk))).collect();
    let chunks = stream::iter(head).chain(stream::pending()).map(move |chunk| {
        let _alive = &alive;
        chunk
    });
    (ByteSource::from_stream(chunks, Some(data.len() as u64)), dropped)
}

/// Serves `data` in `chunk_size` slices without announcing a total.
pub(crate) fn unsized_source(data: &[u8], chunk_size: usize) -> ByteSource {
    let chunks: Vec<io::Result<Bytes>> =
        data.chunks(chunk_size).map(|chunk| Ok(Bytes::copy_from_slice(chunk))).collect();
    ByteSource::from_stream(stream::iter(chunks), None)
}

pub(crate) const CATALOG: &str = "\
GUTINDEX.ALL

A preamble line shaped like an entry, by Nobody                            99
Updated nightly.

TITLE and AUTHOR                                                     ETEXT NO.

Dracula, by Bram Stoker                                                    345
Moby Dick; Or, The Whale, by Herman Melville                              2701
~ [Subtitle: a continuation line that must never become a record]     9999
Pride and Prejudice, by Jane Austen                                       1342
Alice's Adventures in Wonderland, by Lewis Carroll                          11
Frankenstein; Or, The Modern Prometheus, by Mary Wollstonecraft Shelley     84
";

/// A small library: catalog, four of the five catalogued works (one of
/// them twice), one uncatalogued work, and some noise members.
pub(crate) fn library_members<'a>(catalog_first: bool) -> Vec<Member<'a>> {
    let mut members = vec![
        Member::Dir("cache/"),
        Member::Dir("cache/epub/"),
        Member::File("cache/epub/345/pg345.txt", b"Chapter I. Jonathan Harker's Journal."),
        Member::File("cache/epub/345/pg345.rdf", b"<rdf/>"),
        Member::File("cache/epub/2701/pg2701.txt", b"Call me Ishmael."),
        Member::Symlink("cache/epub/latest.txt", "cache/epub/2701/pg2701.txt"),
        Member::File("cache/epub/1342/pg1342.txt", b"It is a truth universally acknowledged."),
        Member::File("files/1342/1342-0.txt", b"It is a truth universally acknowledged."),
        Member::File("cache/epub/11/pg11.txt", b"Alice was beginning to get very tired."),
        Member::File("cache/epub/77777/pg77777.txt", b"Not in the catalog."),
    ];
    let catalog = Member::File("GUTINDEX.ALL", CATALOG.as_bytes());
    if catalog_first {
        members.insert(0, catalog);
    } else {
        members.push(catalog);
    }
    members
}
