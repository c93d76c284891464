// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Term Page Codec
// ─────────────────────────────────────────────────────────────────────
//! Fixed-record binary layout for paged terms. Scratch format only:
//! pages are written and read by the same process and deleted on close.
//!
//! ```text
//! page   := terms_size:u32 num_terms:u32 record*
//! record := squared:u8 hinge:u8 rule:u32 constant:f32 size:u16
//!           (coefficient:f32 index:u32){size}
//! ```
//!
//! All integers and floats are little-endian. `terms_size` is the byte
//! length of the records that follow the header.

use std::fs;
use std::path::Path;

use hlmrf_types::{HlmrfError, HlmrfResult, RuleId};

use crate::term::{Term, TermKind, MAX_TERM_SIZE};

pub const HEADER_BYTES: usize = 8;

const RECORD_FIXED_BYTES: usize = 1 + 1 + 4 + 4 + 2;
const ENTRY_BYTES: usize = 4 + 4;

/// Encoded length of a record holding `size` variables.
pub fn record_size(size: usize) -> usize {
    RECORD_FIXED_BYTES + ENTRY_BYTES * size
}

/// Append one record. Constraint terms have no representation.
pub fn encode_term(term: &Term, buf: &mut Vec<u8>) -> HlmrfResult<()> {
    if term.kind.is_constraint() {
        return Err(HlmrfError::Validation(format!(
            "constraint term for {} cannot be paged",
            term.rule
        )));
    }
    let size = u16::try_from(term.size()).map_err(|_| {
        HlmrfError::Validation(format!(
            "term for {} has {} variables (max {MAX_TERM_SIZE})",
            term.rule,
            term.size()
        ))
    })?;

    buf.reserve(record_size(term.size()));
    buf.push(term.kind.is_squared() as u8);
    buf.push(term.kind.is_hinge() as u8);
    buf.extend_from_slice(&term.rule.0.to_le_bytes());
    buf.extend_from_slice(&term.constant.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    for (coeff, index) in term.coefficients.iter().zip(&term.indices) {
        buf.extend_from_slice(&coeff.to_le_bytes());
        buf.extend_from_slice(&index.to_le_bytes());
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> HlmrfResult<[u8; N]> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            HlmrfError::PageFormat(format!(
                "record truncated at byte {} (need {N}, have {})",
                self.pos,
                self.bytes.len().saturating_sub(self.pos)
            ))
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn flag(&mut self) -> HlmrfResult<bool> {
        match self.take::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(HlmrfError::PageFormat(format!(
                "invalid flag byte {other} at {}",
                self.pos - 1
            ))),
        }
    }

    fn u16(&mut self) -> HlmrfResult<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> HlmrfResult<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn f32(&mut self) -> HlmrfResult<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }
}

fn decode_record(reader: &mut Reader<'_>) -> HlmrfResult<Term> {
    let squared = reader.flag()?;
    let hinge = reader.flag()?;
    let rule = RuleId(reader.u32()?);
    let constant = reader.f32()?;
    let size = reader.u16()? as usize;
    if size == 0 {
        return Err(HlmrfError::PageFormat(format!("empty record for {rule}")));
    }

    let mut coefficients = Vec::with_capacity(size);
    let mut indices = Vec::with_capacity(size);
    for _ in 0..size {
        coefficients.push(reader.f32()?);
        indices.push(reader.u32()?);
    }
    Ok(Term {
        rule,
        kind: TermKind::loss(squared, hinge),
        coefficients,
        indices,
        constant,
    })
}

/// Serialize a whole page (header plus records).
pub fn encode_page(terms: &[Term]) -> HlmrfResult<Vec<u8>> {
    let body_len: usize = terms.iter().map(|t| record_size(t.size())).sum();
    let mut buf = Vec::with_capacity(HEADER_BYTES + body_len);
    buf.extend_from_slice(&[0u8; HEADER_BYTES]);
    for term in terms {
        encode_term(term, &mut buf)?;
    }

    let terms_size = u32::try_from(buf.len() - HEADER_BYTES)
        .map_err(|_| HlmrfError::Validation("page exceeds 4 GiB".to_string()))?;
    let num_terms = u32::try_from(terms.len())
        .map_err(|_| HlmrfError::Validation("too many terms in page".to_string()))?;
    buf[0..4].copy_from_slice(&terms_size.to_le_bytes());
    buf[4..8].copy_from_slice(&num_terms.to_le_bytes());
    Ok(buf)
}

pub fn decode_page(bytes: &[u8]) -> HlmrfResult<Vec<Term>> {
    let mut reader = Reader { bytes, pos: 0 };
    let terms_size = reader.u32()? as usize;
    let num_terms = reader.u32()? as usize;
    if bytes.len() != HEADER_BYTES + terms_size {
        return Err(HlmrfError::PageFormat(format!(
            "header declares {terms_size} record bytes, page holds {}",
            bytes.len().saturating_sub(HEADER_BYTES)
        )));
    }

    let mut terms = Vec::with_capacity(num_terms);
    for _ in 0..num_terms {
        terms.push(decode_record(&mut reader)?);
    }
    if reader.pos != bytes.len() {
        return Err(HlmrfError::PageFormat(format!(
            "{} trailing bytes after {num_terms} records",
            bytes.len() - reader.pos
        )));
    }
    Ok(terms)
}

pub fn write_page(path: &Path, terms: &[Term]) -> HlmrfResult<()> {
    let bytes = encode_page(terms)?;
    fs::write(path, bytes).map_err(|e| HlmrfError::io(path, e))
}

pub fn read_page(path: &Path) -> HlmrfResult<Vec<Term>> {
    let bytes = fs::read(path).map_err(|e| HlmrfError::io(path, e))?;
    decode_page(&bytes)
}
