//! The relation: top-level linear-hashed state (`nattrs`, `depth`, `sp`,
//! page counts, choice vector), insert with load-factor-driven splitting,
//! and bucket-address arithmetic (spec §4.6).
//!
//! Grounded in the teacher's `Db` (open/create/close lifecycle owning a
//! pager and a lock guard), narrowed to the one data structure this store
//! needs instead of a general KV engine.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

use crate::bits::lo_bits;
use crate::config::RelationConfig;
use crate::consts::{DATA_FILE_EXT, INFO_FILE_EXT, LOCK_FILE_EXT, OVFLOW_FILE_EXT};
use crate::cv::ChoiceVector;
use crate::hash::tuple_hash;
use crate::lock::{acquire_exclusive_lock, LockGuard};
use crate::meta::{read_info, write_info_new, write_info_overwrite, RelationHeader};
use crate::page::{add_to_page, new_page, page_freespace, page_ntuples, page_ovflow, page_set_ovflow, page_tuples};
use crate::pager::PageFile;
use crate::query::Query;
use crate::tuple::{tuple_vals, validate_stored_tuple};

/// How a relation is opened: `Write` takes the exclusive lock and flushes
/// the info header on close; `Read` never locks or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

fn info_path(name: &Path) -> PathBuf {
    name.with_extension(INFO_FILE_EXT)
}
fn data_path(name: &Path) -> PathBuf {
    name.with_extension(DATA_FILE_EXT)
}
fn ovflow_path(name: &Path) -> PathBuf {
    name.with_extension(OVFLOW_FILE_EXT)
}
fn lock_path(name: &Path) -> PathBuf {
    name.with_extension(LOCK_FILE_EXT)
}

pub struct Relation {
    name: PathBuf,
    nattrs: u32,
    depth: u32,
    sp: u32,
    ntups: u64,
    cv: ChoiceVector,
    data: PageFile,
    ovflow: PageFile,
    mode: Mode,
    /// Fixed for the lifetime of this `Relation`, set from `RelationConfig`
    /// at `open` time — the split-trigger threshold `C` must not drift
    /// between `insert` calls on the same relation (see `capacity`).
    capacity_divisor: usize,
    _lock: Option<LockGuard>,
}

impl Relation {
    pub fn name(&self) -> &Path {
        &self.name
    }
    pub fn nattrs(&self) -> u32 {
        self.nattrs
    }
    pub fn depth(&self) -> u32 {
        self.depth
    }
    pub fn sp(&self) -> u32 {
        self.sp
    }
    pub fn npages(&self) -> u64 {
        self.data.npages()
    }
    pub fn ntups(&self) -> u64 {
        self.ntups
    }
    pub fn cv(&self) -> &ChoiceVector {
        &self.cv
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Nominal primary-page capacity `C = page_size / (capacity_divisor * nattrs)`
    /// (spec §4.6, divisor configurable per §4.11).
    fn capacity(&self) -> u64 {
        let c = self.data.page_size() / (self.capacity_divisor * self.nattrs as usize).max(1);
        c.max(1) as u64
    }

    pub fn exists(name: &Path) -> bool {
        info_path(name).exists() && data_path(name).exists() && ovflow_path(name).exists()
    }

    /// Create a brand new relation: `npages0` primary pages at depth `d0`
    /// (so `npages0` should equal `2^d0`), an empty overflow file, and a
    /// choice vector parsed from `cv_spec`.
    pub fn create(
        name: &Path,
        nattrs: u32,
        npages0: u64,
        d0: u32,
        cv_spec: &str,
        cfg: &RelationConfig,
    ) -> Result<()> {
        if nattrs == 0 {
            return Err(anyhow!("nattrs must be > 0"));
        }
        cfg.validate()
            .with_context(|| format!("config for relation {}", name.display()))?;
        if Self::exists(name) {
            return Err(anyhow!("relation {} already exists", name.display()));
        }

        let cv = ChoiceVector::parse(cv_spec, nattrs)
            .with_context(|| format!("parsing choice vector {cv_spec:?}"))?;

        let mut data = PageFile::create(&data_path(name), cfg.page_size)
            .with_context(|| format!("creating data file for relation {}", name.display()))?;
        for _ in 0..npages0 {
            data.add_page()?;
        }
        let ovflow = PageFile::create(&ovflow_path(name), cfg.page_size)
            .with_context(|| format!("creating ovflow file for relation {}", name.display()))?;
        drop(ovflow);

        let header = RelationHeader {
            nattrs,
            depth: d0,
            sp: 0,
            npages: data.npages(),
            ntups: 0,
            cv,
        };
        write_info_new(&info_path(name), &header)
            .with_context(|| format!("writing info file for relation {}", name.display()))?;

        debug!(
            "created relation {} (nattrs={nattrs}, npages0={npages0}, d0={d0})",
            name.display()
        );
        Ok(())
    }

    /// Open an existing relation. `Mode::Write` acquires the exclusive lock.
    pub fn open(name: &Path, mode: Mode, cfg: &RelationConfig) -> Result<Self> {
        let header = read_info(&info_path(name))
            .with_context(|| format!("reading info file for relation {}", name.display()))?;

        let lock = match mode {
            Mode::Write => Some(
                acquire_exclusive_lock(&lock_path(name))
                    .with_context(|| format!("locking relation {}", name.display()))?,
            ),
            Mode::Read => None,
        };

        let data = PageFile::open(&data_path(name), cfg.page_size)
            .with_context(|| format!("opening data file for relation {}", name.display()))?;
        let ovflow = PageFile::open(&ovflow_path(name), cfg.page_size)
            .with_context(|| format!("opening ovflow file for relation {}", name.display()))?;

        if data.npages() != header.npages {
            return Err(anyhow!(
                "relation {} info says npages={} but data file has {}",
                name.display(),
                header.npages,
                data.npages()
            ));
        }

        Ok(Self {
            name: name.to_path_buf(),
            nattrs: header.nattrs,
            depth: header.depth,
            sp: header.sp,
            ntups: header.ntups,
            cv: header.cv,
            data,
            ovflow,
            mode,
            capacity_divisor: cfg.capacity_divisor,
            _lock: lock,
        })
    }

    /// Flush the info header (if opened for writing) and release the lock.
    pub fn close(mut self) -> Result<()> {
        self.flush_header()?;
        Ok(())
    }

    fn flush_header(&mut self) -> Result<()> {
        if self.mode != Mode::Write {
            return Ok(());
        }
        let header = RelationHeader {
            nattrs: self.nattrs,
            depth: self.depth,
            sp: self.sp,
            npages: self.data.npages(),
            ntups: self.ntups,
            cv: self.cv.clone(),
        };
        write_info_overwrite(&info_path(&self.name), &header)
            .with_context(|| format!("flushing info file for relation {}", self.name.display()))
    }

    /// Bucket id of a fully-specified tuple: `loBits(H*,d)` unless that's
    /// `< sp`, in which case `loBits(H*,d+1)` (spec §4.6).
    fn bucket_of_hash(&self, h: u32) -> u64 {
        let b = lo_bits(h, self.depth) as u64;
        if b < self.sp as u64 {
            lo_bits(h, self.depth + 1) as u64
        } else {
            b
        }
    }

    /// Insert one tuple, splitting first if the load factor demands it.
    /// Returns the bucket id the tuple landed in.
    pub fn insert(&mut self, tuple: &str) -> Result<u64> {
        if self.mode != Mode::Write {
            return Err(anyhow!("relation {} opened read-only", self.name.display()));
        }
        let fields = tuple_vals(tuple, self.nattrs as usize)?;
        validate_stored_tuple(&fields)?;

        let c = self.capacity();
        if (self.ntups + 1) % c == 0 {
            self.split()?;
        }

        let h = tuple_hash(&self.cv, &fields);
        let bucket = self.bucket_of_hash(h);
        self.insert_into_bucket(bucket, tuple)?;
        self.ntups += 1;
        Ok(bucket)
    }

    /// Overflow-aware insert into an already-known bucket id: try the
    /// primary page, then walk/extend the overflow chain (spec §4.6).
    fn insert_into_bucket(&mut self, bucket: u64, tuple: &str) -> Result<()> {
        let mut page = self.data.get_page(bucket)?;
        if add_to_page(&mut page, tuple)? {
            self.data.put_page(bucket, &page)?;
            return Ok(());
        }

        let mut prev_is_primary = true;
        let mut prev_id = bucket;
        let mut next = page_ovflow(&page);

        loop {
            match next {
                None => {
                    let new_id = self.ovflow.add_page()?;
                    let mut new_page_buf = self.ovflow.get_page(new_id)?;
                    let ok = add_to_page(&mut new_page_buf, tuple)?;
                    debug_assert!(ok, "a freshly allocated overflow page must have room");
                    self.ovflow.put_page(new_id, &new_page_buf)?;

                    if prev_is_primary {
                        page_set_ovflow(&mut page, Some(new_id));
                        self.data.put_page(prev_id, &page)?;
                    } else {
                        let mut prev_page = self.ovflow.get_page(prev_id)?;
                        page_set_ovflow(&mut prev_page, Some(new_id));
                        self.ovflow.put_page(prev_id, &prev_page)?;
                    }
                    warn!("bucket {bucket} overflowed; allocated overflow page {new_id}");
                    return Ok(());
                }
                Some(id) => {
                    let mut ov_page = self.ovflow.get_page(id)?;
                    if add_to_page(&mut ov_page, tuple)? {
                        self.ovflow.put_page(id, &ov_page)?;
                        return Ok(());
                    }
                    prev_is_primary = false;
                    prev_id = id;
                    next = page_ovflow(&ov_page);
                    page = ov_page;
                }
            }
        }
    }

    /// Collect every tuple in bucket `bucket`'s primary page and overflow
    /// chain, zeroing the visited pages as we go (spec §4.6 step 2-3).
    fn drain_bucket(&mut self, bucket: u64) -> Result<Vec<String>> {
        let mut out = Vec::new();

        let primary = self.data.get_page(bucket)?;
        out.extend(page_tuples(&primary)?);
        let mut next = page_ovflow(&primary);

        let mut fresh = new_page(self.data.page_size());
        page_set_ovflow(&mut fresh, None);
        self.data.put_page(bucket, &fresh)?;

        while let Some(id) = next {
            let ov = self.ovflow.get_page(id)?;
            out.extend(page_tuples(&ov)?);
            next = page_ovflow(&ov);
        }
        Ok(out)
    }

    /// Split the bucket currently pointed to by `sp` (spec §4.6).
    fn split(&mut self) -> Result<()> {
        let old_sp = self.sp as u64;
        let d = self.depth;

        let new_bucket = self.data.add_page()?;
        debug_assert_eq!(new_bucket, (1u64 << d) + old_sp);

        let drained = self.drain_bucket(old_sp)?;

        let mut keep = Vec::new();
        for t in drained {
            let fields = tuple_vals(&t, self.nattrs as usize)?;
            let h = tuple_hash(&self.cv, &fields);
            if lo_bits(h, d + 1) as u64 == old_sp {
                keep.push(t);
            } else {
                self.insert_into_bucket(new_bucket, &t)?;
            }
        }
        for t in keep {
            self.insert_into_bucket(old_sp, &t)?;
        }

        if lo_bits(self.sp + 1, d) != 0 {
            self.sp += 1;
        } else {
            self.depth += 1;
            self.sp = 0;
        }

        debug!(
            "split bucket {old_sp} -> new bucket {new_bucket} (d={}, sp={})",
            self.depth, self.sp
        );
        Ok(())
    }

    /// Human-readable diagnostic dump, with per-bucket overflow-chain
    /// lengths (spec §6 `relationStats`).
    pub fn print_stats(&mut self) -> Result<()> {
        println!(
            "relation {}: nattrs={} depth={} sp={} npages={} ntups={}",
            self.name.display(),
            self.nattrs,
            self.depth,
            self.sp,
            self.npages(),
            self.ntups
        );
        for b in 0..self.npages() {
            let page = self.data.get_page(b)?;
            let mut chain_len = 0usize;
            let mut next = page_ovflow(&page);
            let mut total_tuples = page_ntuples(&page) as u64;
            while let Some(id) = next {
                chain_len += 1;
                let ov = self.ovflow.get_page(id)?;
                total_tuples += page_ntuples(&ov) as u64;
                next = page_ovflow(&ov);
            }
            println!(
                "  bucket {b}: {} tuples in primary, {chain_len} overflow page(s), {total_tuples} total, freespace={}",
                page_ntuples(&page),
                page_freespace(&page)
            );
        }
        Ok(())
    }

    pub fn start_query<'a>(&'a mut self, template: &str) -> Result<Query<'a>> {
        Query::start(self, template)
    }

    pub(crate) fn get_data_page(&mut self, id: u64) -> Result<Vec<u8>> {
        self.data.get_page(id)
    }

    pub(crate) fn get_ovflow_page(&mut self, id: u64) -> Result<Vec<u8>> {
        self.ovflow.get_page(id)
    }
}

impl Drop for Relation {
    fn drop(&mut self) {
        let _ = self.flush_header();
    }
}
