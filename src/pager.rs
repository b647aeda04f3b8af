//! Page file: an append-only array of fixed-size pages backed by a single
//! flat file (spec §4.3). One `PageFile` backs a relation's `.data` file,
//! another backs its `.ovflow` file.
//!
//! Grounded in the teacher's pager (`read_at`/`write_at` over a borrowed
//! `File`, grow-by-`set_len`), stripped of segmenting, the WAL-integrated
//! commit path, and the read cache — all exist there to support crash
//! recovery, which is an explicit non-goal here.

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::config::validate_page_size;
use crate::page::new_page;
use crate::util::{read_at, write_at};

pub struct PageFile {
    path: PathBuf,
    file: File,
    page_size: usize,
    npages: u64,
}

impl PageFile {
    /// Create a new, empty page file. Errors if one already exists.
    pub fn create(path: &Path, page_size: usize) -> Result<Self> {
        validate_page_size(page_size)
            .with_context(|| format!("page_size for page file {}", path.display()))?;
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("create page file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_size,
            npages: 0,
        })
    }

    /// Open an existing page file, deriving `npages` from its length.
    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        validate_page_size(page_size)
            .with_context(|| format!("page_size for page file {}", path.display()))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open page file {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat page file {}", path.display()))?
            .len();
        if len % page_size as u64 != 0 {
            return Err(anyhow!(
                "page file {} has length {} not a multiple of page_size {}",
                path.display(),
                len,
                page_size
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_size,
            npages: len / page_size as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn npages(&self) -> u64 {
        self.npages
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Append one zero-initialized page and return its id.
    pub fn add_page(&mut self) -> Result<u64> {
        let id = self.npages;
        let buf = new_page(self.page_size);
        let off = id * self.page_size as u64;
        self.file
            .set_len(off + self.page_size as u64)
            .with_context(|| format!("grow page file {}", self.path.display()))?;
        write_at(&mut self.file, off, &buf)
            .with_context(|| format!("init page {id} in {}", self.path.display()))?;
        self.npages += 1;
        Ok(id)
    }

    pub fn get_page(&mut self, id: u64) -> Result<Vec<u8>> {
        if id >= self.npages {
            return Err(anyhow!(
                "page {id} not allocated in {} (npages={})",
                self.path.display(),
                self.npages
            ));
        }
        let mut buf = vec![0u8; self.page_size];
        read_at(&mut self.file, id * self.page_size as u64, &mut buf)
            .with_context(|| format!("read page {id} from {}", self.path.display()))?;
        Ok(buf)
    }

    pub fn put_page(&mut self, id: u64, buf: &[u8]) -> Result<()> {
        if buf.len() != self.page_size {
            return Err(anyhow!(
                "page buffer size {} != page_size {}",
                buf.len(),
                self.page_size
            ));
        }
        if id >= self.npages {
            return Err(anyhow!(
                "page {id} not allocated in {} (npages={})",
                self.path.display(),
                self.npages
            ));
        }
        write_at(&mut self.file, id * self.page_size as u64, buf)
            .with_context(|| format!("write page {id} to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "malh-pager-test-{tag}-{}-{}",
            std::process::id(),
            tag.len()
        ))
    }

    #[test]
    fn add_get_put_roundtrip() {
        let path = tmp_path("roundtrip");
        let _ = std::fs::remove_file(&path);
        let mut pf = PageFile::create(&path, 64).unwrap();
        let id0 = pf.add_page().unwrap();
        let id1 = pf.add_page().unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert_eq!(pf.npages(), 2);

        let mut buf = pf.get_page(0).unwrap();
        buf[20] = 0xAB;
        pf.put_page(0, &buf).unwrap();
        let back = pf.get_page(0).unwrap();
        assert_eq!(back[20], 0xAB);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_recovers_npages_from_length() {
        let path = tmp_path("reopen");
        let _ = std::fs::remove_file(&path);
        {
            let mut pf = PageFile::create(&path, 64).unwrap();
            pf.add_page().unwrap();
            pf.add_page().unwrap();
            pf.add_page().unwrap();
        }
        let pf = PageFile::open(&path, 64).unwrap();
        assert_eq!(pf.npages(), 3);
        let _ = std::fs::remove_file(&path);
    }
}
