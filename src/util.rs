use anyhow::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

pub fn read_at(f: &mut File, offset: u64, buf: &mut [u8]) -> Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    f.read_exact(buf)?;
    Ok(())
}

pub fn write_at(f: &mut File, offset: u64, buf: &[u8]) -> Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(buf)?;
    Ok(())
}

/// Best-effort fsync of a path's parent directory after a rename, so the
/// rename itself is durable on crash (Unix only; no-op elsewhere).
#[cfg(unix)]
pub fn fsync_parent_dir(p: &std::path::Path) -> std::io::Result<()> {
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn fsync_parent_dir(_p: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
