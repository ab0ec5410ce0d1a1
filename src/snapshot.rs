// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The binary snapshot codec.
//!
//! One file holds the whole engine: documents (with field maps), the
//! inverted index (with positions), and the id counter. Everything is
//! little-endian and tightly packed:
//!
//! ```text
//! u32 magic = 0x53454152 ("SEAR")   u32 version = 1
//! u64 num_documents                 u64 num_terms
//! u64 next_doc_id
//! per document:
//!   u64 doc_id, u64 term_count, u64 num_fields
//!   per field: u64 key_len, key bytes, u64 val_len, val bytes
//! u64 num_index_terms
//! per term:
//!   u64 term_len, term bytes
//!   u64 num_postings
//!   per posting: u64 doc_id, u32 term_frequency,
//!                u64 num_positions, u32 × num_positions
//! ```
//!
//! Documents are written id-ascending and terms lexicographically, so the
//! same engine state always produces the same bytes.
//!
//! The codec never touches engine internals: it consumes a borrowed
//! [`SnapshotView`] on the way out and produces an owned [`SnapshotData`]
//! on the way in, which the engine applies under its write lock. Decode
//! failures surface as `io::Error` before any engine state changes.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::index::{InvertedIndex, Posting};
use crate::types::Document;

/// "SEAR" in ASCII.
pub const SNAPSHOT_MAGIC: u32 = 0x5345_4152;
pub const SNAPSHOT_VERSION: u32 = 1;

// Sanity limits against malformed files asking for absurd allocations.
const MAX_COUNT: u64 = 100_000_000;
const MAX_STRING_LEN: u64 = 64 * 1024 * 1024;

/// Borrowed read-side view of the engine state the codec serializes.
pub struct SnapshotView<'a> {
    pub next_doc_id: u64,
    pub documents: &'a HashMap<u64, Document>,
    pub index: &'a InvertedIndex,
}

/// One term's postings as decoded from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPostings {
    pub term: String,
    pub postings: Vec<Posting>,
}

/// Owned decode result; the engine applies it under the write lock.
#[derive(Debug, Clone, Default)]
pub struct SnapshotData {
    pub next_doc_id: u64,
    pub documents: Vec<Document>,
    pub terms: Vec<TermPostings>,
}

/// Serialize `view` to `w` in the layout above.
pub fn write_snapshot<W: Write>(view: &SnapshotView<'_>, w: &mut W) -> io::Result<()> {
    w.write_all(&SNAPSHOT_MAGIC.to_le_bytes())?;
    w.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
    w.write_all(&(view.documents.len() as u64).to_le_bytes())?;
    w.write_all(&(view.index.term_count() as u64).to_le_bytes())?;
    w.write_all(&view.next_doc_id.to_le_bytes())?;

    let mut doc_ids: Vec<u64> = view.documents.keys().copied().collect();
    doc_ids.sort_unstable();
    for doc_id in doc_ids {
        let Some(doc) = view.documents.get(&doc_id) else {
            continue;
        };
        w.write_all(&doc_id.to_le_bytes())?;
        w.write_all(&doc.term_count.to_le_bytes())?;
        w.write_all(&(doc.fields.len() as u64).to_le_bytes())?;
        for (key, value) in &doc.fields {
            write_str(w, key)?;
            write_str(w, value)?;
        }
    }

    let mut terms: Vec<&str> = view.index.terms().collect();
    terms.sort_unstable();
    w.write_all(&(terms.len() as u64).to_le_bytes())?;
    for term in terms {
        write_str(w, term)?;
        let postings = view.index.get_postings(term);
        w.write_all(&(postings.len() as u64).to_le_bytes())?;
        for posting in &postings {
            w.write_all(&posting.doc_id.to_le_bytes())?;
            w.write_all(&posting.term_frequency.to_le_bytes())?;
            w.write_all(&(posting.positions.len() as u64).to_le_bytes())?;
            for &pos in &posting.positions {
                w.write_all(&pos.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Decode a snapshot from `r`, validating magic and version first.
pub fn read_snapshot<R: Read>(r: &mut R) -> io::Result<SnapshotData> {
    let magic = read_u32(r)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(invalid(format!(
            "bad snapshot magic: {magic:#010x}, expected {SNAPSHOT_MAGIC:#010x}"
        )));
    }
    let version = read_u32(r)?;
    if version != SNAPSHOT_VERSION {
        return Err(invalid(format!(
            "unsupported snapshot version {version}, expected {SNAPSHOT_VERSION}"
        )));
    }

    let num_documents = read_count(r, "document count")?;
    let _num_terms = read_count(r, "term count")?;
    let next_doc_id = read_u64(r)?;

    let mut documents = Vec::with_capacity(num_documents as usize);
    for _ in 0..num_documents {
        let doc_id = read_u64(r)?;
        let term_count = read_u64(r)?;
        let num_fields = read_count(r, "field count")?;
        let mut doc = Document::new(doc_id);
        doc.term_count = term_count;
        for _ in 0..num_fields {
            let key = read_str(r)?;
            let value = read_str(r)?;
            doc.fields.insert(key, value);
        }
        documents.push(doc);
    }

    let num_index_terms = read_count(r, "index term count")?;
    let mut terms = Vec::with_capacity(num_index_terms as usize);
    for _ in 0..num_index_terms {
        let term = read_str(r)?;
        let num_postings = read_count(r, "posting count")?;
        let mut postings = Vec::with_capacity(num_postings as usize);
        for _ in 0..num_postings {
            let doc_id = read_u64(r)?;
            let term_frequency = read_u32(r)?;
            let num_positions = read_count(r, "position count")?;
            let mut posting = Posting::new(doc_id, term_frequency);
            posting.positions.reserve(num_positions as usize);
            for _ in 0..num_positions {
                posting.positions.push(read_u32(r)?);
            }
            postings.push(posting);
        }
        terms.push(TermPostings { term, postings });
    }

    Ok(SnapshotData {
        next_doc_id,
        documents,
        terms,
    })
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u64).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_count<R: Read>(r: &mut R, what: &str) -> io::Result<u64> {
    let n = read_u64(r)?;
    if n > MAX_COUNT {
        return Err(invalid(format!("unreasonable {what}: {n}")));
    }
    Ok(n)
}

fn read_str<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u64(r)?;
    if len > MAX_STRING_LEN {
        return Err(invalid(format!("unreasonable string length: {len}")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| invalid(format!("snapshot string is not UTF-8: {e}")))
}
