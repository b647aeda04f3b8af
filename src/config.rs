//! Centralized, env-overridable configuration, in the shape of the
//! teacher's `QuiverConfig`/`DbBuilder`: a single place to collect
//! tunables instead of scattering env lookups through the relation code.

use anyhow::{anyhow, Result};
use std::fmt;

use crate::consts::{DEFAULT_PAGESIZE, PAGE_HDR_SIZE};

/// Top-level configuration for opening or creating a relation.
#[derive(Clone, Debug)]
pub struct RelationConfig {
    /// Page size in bytes, used only at relation-creation time.
    /// Env: `MALH_PAGE_SIZE` (default 4096).
    pub page_size: usize,

    /// Divisor in the nominal primary-page capacity formula
    /// `C = page_size / (capacity_divisor * nattrs)` (spec §4.6).
    /// Env: `MALH_CAPACITY_DIVISOR` (default 10).
    pub capacity_divisor: usize,
}

/// Reject a page size that cannot hold even the fixed page header, the way
/// the teacher's own meta layer rejects an unusable page size up front
/// rather than letting it surface later as an out-of-bounds panic.
pub fn validate_page_size(page_size: usize) -> Result<()> {
    if page_size <= PAGE_HDR_SIZE {
        return Err(anyhow!(
            "page_size {page_size} must be greater than the page header size ({PAGE_HDR_SIZE})"
        ));
    }
    Ok(())
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGESIZE,
            capacity_divisor: 10,
        }
    }
}

impl RelationConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("MALH_PAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.page_size = n;
            }
        }
        if let Ok(v) = std::env::var("MALH_CAPACITY_DIVISOR") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.capacity_divisor = n;
            }
        }

        cfg
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_capacity_divisor(mut self, divisor: usize) -> Self {
        self.capacity_divisor = divisor;
        self
    }

    /// Reject configuration values that would make the page layout
    /// unusable before they're threaded into a `PageFile`/page buffer.
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.page_size)?;
        if self.capacity_divisor == 0 {
            return Err(anyhow!("capacity_divisor must be > 0"));
        }
        Ok(())
    }
}

impl fmt::Display for RelationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelationConfig {{ page_size: {}, capacity_divisor: {} }}",
            self.page_size, self.capacity_divisor
        )
    }
}
