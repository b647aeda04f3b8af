// Core sizing constants for the MALH format.

/// Width, in bits, of a composite hash and of a choice vector.
pub const MAXBITS: usize = 32;

/// Alias kept for call sites that talk about the choice vector specifically.
pub const MAXCHVEC: usize = MAXBITS;

/// Default page size for newly created relations. Overridable via
/// `RelationConfig`/`MALH_PAGE_SIZE`.
pub const DEFAULT_PAGESIZE: usize = 4096;

/// Size of the fixed page header: `ntuples: u32`, `freespace: u32`, `ovflow: i32`.
pub const PAGE_HDR_SIZE: usize = 12;

/// On-disk sentinel for "no page" in the page header's overflow field.
pub const NO_PAGE_RAW: i32 = -1;

pub const INFO_FILE_EXT: &str = "info";
pub const DATA_FILE_EXT: &str = "data";
pub const OVFLOW_FILE_EXT: &str = "ovflow";
pub const LOCK_FILE_EXT: &str = "lock";

pub const INFO_MAGIC: &[u8; 8] = b"MALHINF1";
