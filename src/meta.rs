//! Relation metadata: the `.info` file recording the linear-hashing state
//! (`nattrs`, `depth`, `sp`, `npages`, `ntups`) and choice vector (spec
//! §4.1/§4.9).
//!
//! Format (LE): 8-byte magic, u32 version, then the header fields, then
//! exactly `MAXBITS` choice-vector items (`u32 att`, `u32 bit` each), then
//! a trailing `crc32fast` checksum over everything before it. Grounded in
//! the teacher's meta v4 codec: same tmp-file-then-rename write with a
//! best-effort parent-directory fsync, same magic+version+fields+checksum
//! shape, narrowed to the fields this relation actually needs.

use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::consts::{INFO_MAGIC, MAXBITS};
use crate::cv::{ChVecItem, ChoiceVector};
use crate::util::fsync_parent_dir;

const INFO_VERSION: u32 = 1;

/// Everything needed to reopen a relation: its shape plus linear-hashing
/// progress.
#[derive(Debug, Clone)]
pub struct RelationHeader {
    pub nattrs: u32,
    pub depth: u32,
    pub sp: u32,
    pub npages: u64,
    pub ntups: u64,
    pub cv: ChoiceVector,
}

/// Write a brand new `.info` file. Errors if one already exists.
pub fn write_info_new(path: &Path, h: &RelationHeader) -> Result<()> {
    if path.exists() {
        return Err(anyhow!("info file already exists at {}", path.display()));
    }
    write_info_atomic(path, h)
}

/// Overwrite an existing `.info` file via the same tmp+rename sequence.
pub fn write_info_overwrite(path: &Path, h: &RelationHeader) -> Result<()> {
    write_info_atomic(path, h)
}

fn write_info_atomic(path: &Path, h: &RelationHeader) -> Result<()> {
    let tmp = path.with_extension("info.tmp");
    let _ = fs::remove_file(&tmp);

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("open info tmp {}", tmp.display()))?;

    let bytes = encode_info(h);
    f.write_all(&bytes)
        .with_context(|| format!("write info tmp {}", tmp.display()))?;
    f.sync_all()
        .with_context(|| format!("fsync info tmp {}", tmp.display()))?;

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    let _ = fsync_parent_dir(path);
    Ok(())
}

fn encode_info(h: &RelationHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 4 + 4 * 4 + 8 * 2 + MAXBITS * 8 + 4);
    buf.extend_from_slice(INFO_MAGIC);
    buf.write_u32::<LittleEndian>(INFO_VERSION).unwrap();
    buf.write_u32::<LittleEndian>(h.nattrs).unwrap();
    buf.write_u32::<LittleEndian>(h.depth).unwrap();
    buf.write_u32::<LittleEndian>(h.sp).unwrap();
    buf.write_u64::<LittleEndian>(h.npages).unwrap();
    buf.write_u64::<LittleEndian>(h.ntups).unwrap();
    for item in h.cv.items() {
        buf.write_u32::<LittleEndian>(item.att).unwrap();
        buf.write_u32::<LittleEndian>(item.bit).unwrap();
    }
    let crc = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(crc).unwrap();
    buf
}

/// Read and checksum-validate a relation's `.info` file.
pub fn read_info(path: &Path) -> Result<RelationHeader> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open info file {}", path.display()))?;

    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes)
        .with_context(|| format!("read info file {}", path.display()))?;

    if bytes.len() < 4 {
        return Err(anyhow!("info file {} truncated", path.display()));
    }
    let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let want_crc = LittleEndian::read_u32(crc_bytes);
    let got_crc = crc32fast::hash(body);
    if want_crc != got_crc {
        return Err(anyhow!(
            "info file {} failed checksum (expected {:08x}, computed {:08x})",
            path.display(),
            want_crc,
            got_crc
        ));
    }

    let mut cur = std::io::Cursor::new(body);
    let mut magic = [0u8; 8];
    cur.read_exact(&mut magic)?;
    if &magic != INFO_MAGIC {
        return Err(anyhow!(
            "bad info magic at {} (expected {:?}, got {:?})",
            path.display(),
            INFO_MAGIC,
            magic
        ));
    }

    let version = cur.read_u32::<LittleEndian>()?;
    if version != INFO_VERSION {
        return Err(anyhow!(
            "unsupported info version {} at {} (expected {})",
            version,
            path.display(),
            INFO_VERSION
        ));
    }

    let nattrs = cur.read_u32::<LittleEndian>()?;
    let depth = cur.read_u32::<LittleEndian>()?;
    let sp = cur.read_u32::<LittleEndian>()?;
    let npages = cur.read_u64::<LittleEndian>()?;
    let ntups = cur.read_u64::<LittleEndian>()?;

    let mut items = [ChVecItem { att: 0, bit: 0 }; MAXBITS];
    for slot in items.iter_mut() {
        let att = cur.read_u32::<LittleEndian>()?;
        let bit = cur.read_u32::<LittleEndian>()?;
        *slot = ChVecItem { att, bit };
    }

    Ok(RelationHeader {
        nattrs,
        depth,
        sp,
        npages,
        ntups,
        cv: ChoiceVector::from_items(items),
    })
}
