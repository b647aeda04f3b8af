//! Fixed-size page buffer: header (`ntuples`, `freespace`, `ovflow`) plus a
//! packed sequence of null-terminated tuple records (spec §4.2).
//!
//! Operates directly on raw `&[u8]`/`&mut [u8]` page buffers, the way the
//! teacher's page-layout helpers (`rh_header_read`/`rh_header_write`, and
//! friends) work over a borrowed buffer rather than an owned `Page` type.

use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{NO_PAGE_RAW, PAGE_HDR_SIZE};

const OFF_NTUPLES: usize = 0;
const OFF_FREESPACE: usize = 4;
const OFF_OVFLOW: usize = 8;

/// A freshly zeroed page of exactly `page_size` bytes: `ntuples=0`,
/// `freespace=page_size-PAGE_HDR_SIZE`, `ovflow=NO_PAGE`.
pub fn new_page(page_size: usize) -> Vec<u8> {
    debug_assert!(page_size > PAGE_HDR_SIZE);
    let mut buf = vec![0u8; page_size];
    LittleEndian::write_u32(&mut buf[OFF_NTUPLES..OFF_NTUPLES + 4], 0);
    LittleEndian::write_u32(
        &mut buf[OFF_FREESPACE..OFF_FREESPACE + 4],
        (page_size - PAGE_HDR_SIZE) as u32,
    );
    LittleEndian::write_i32(&mut buf[OFF_OVFLOW..OFF_OVFLOW + 4], NO_PAGE_RAW);
    buf
}

pub fn page_ntuples(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[OFF_NTUPLES..OFF_NTUPLES + 4])
}

fn set_ntuples(buf: &mut [u8], n: u32) {
    LittleEndian::write_u32(&mut buf[OFF_NTUPLES..OFF_NTUPLES + 4], n);
}

pub fn page_freespace(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[OFF_FREESPACE..OFF_FREESPACE + 4])
}

fn set_freespace(buf: &mut [u8], n: u32) {
    LittleEndian::write_u32(&mut buf[OFF_FREESPACE..OFF_FREESPACE + 4], n);
}

/// Next page in this bucket's overflow chain, or `None` at the tail.
pub fn page_ovflow(buf: &[u8]) -> Option<u64> {
    let raw = LittleEndian::read_i32(&buf[OFF_OVFLOW..OFF_OVFLOW + 4]);
    if raw == NO_PAGE_RAW {
        None
    } else {
        Some(raw as u64)
    }
}

pub fn page_set_ovflow(buf: &mut [u8], id: Option<u64>) {
    let raw = match id {
        None => NO_PAGE_RAW,
        Some(id) => {
            debug_assert!(id <= i32::MAX as u64, "page id does not fit an i32 slot");
            id as i32
        }
    };
    LittleEndian::write_i32(&mut buf[OFF_OVFLOW..OFF_OVFLOW + 4], raw);
}

/// Append `tuple` (null-terminated) to the page if it fits. Returns
/// `true` on success, `false` if the page is full — `PageFull` is purely a
/// local signal here, never an error (spec §7).
pub fn add_to_page(buf: &mut [u8], tuple: &str) -> Result<bool> {
    if tuple.as_bytes().contains(&0) {
        return Err(anyhow!("tuple text may not contain a NUL byte"));
    }
    let needed = tuple.len() + 1;
    let free = page_freespace(buf) as usize;
    if needed > free {
        return Ok(false);
    }

    let used = buf.len() - PAGE_HDR_SIZE - free;
    let start = PAGE_HDR_SIZE + used;
    buf[start..start + tuple.len()].copy_from_slice(tuple.as_bytes());
    buf[start + tuple.len()] = 0;

    set_ntuples(buf, page_ntuples(buf) + 1);
    set_freespace(buf, (free - needed) as u32);
    Ok(true)
}

/// Read the null-terminated tuple string starting at local offset
/// `offset` within the tuple region, returning the decoded string and the
/// number of bytes consumed (string length + 1 for the terminator).
pub fn next_tuple(buf: &[u8], offset: u32) -> Result<(String, u32)> {
    let start = PAGE_HDR_SIZE + offset as usize;
    let end = buf[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| anyhow!("page tuple region missing NUL terminator at offset {offset}"))?;
    let s = std::str::from_utf8(&buf[start..start + end])
        .map_err(|e| anyhow!("tuple bytes are not valid UTF-8: {e}"))?
        .to_string();
    Ok((s, (end + 1) as u32))
}

/// Collect every tuple currently packed into the page, in storage order.
pub fn page_tuples(buf: &[u8]) -> Result<Vec<String>> {
    let n = page_ntuples(buf);
    let mut out = Vec::with_capacity(n as usize);
    let mut off = 0u32;
    for _ in 0..n {
        let (t, consumed) = next_tuple(buf, off)?;
        out.push(t);
        off += consumed;
    }
    Ok(out)
}
