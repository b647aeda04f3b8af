//! The per-attribute byte hash and the choice-vector bit interleave that
//! together form a tuple's composite hash (spec §4.5).
//!
//! Goals, in the same spirit as a stable bucket hash: deterministic,
//! avalanche-like, invariant across toolchains/platforms. We use
//! `twox_hash`'s 32-bit xxHash variant as the byte-hash oracle — the spec
//! only demands such an oracle exist, not which algorithm backs it.

use twox_hash::XxHash32;

use crate::consts::MAXBITS;
use crate::cv::ChoiceVector;

/// Seed shared by every attribute hash. A fixed seed keeps the mapping
/// reproducible across runs and hosts, which the round-trip and
/// choice-vector-partitioning invariants both depend on.
const HASH_SEED: u32 = 0;

/// 32-bit hash of one attribute's text value. Deterministic, avalanche-like.
#[inline]
pub fn attr_hash(field: &str) -> u32 {
    XxHash32::oneshot(HASH_SEED, field.as_bytes())
}

/// Compose `H*(t)` bit-by-bit from per-attribute hashes and the relation's
/// choice vector: `bit i of H* = (h_{cv[i].att} >> cv[i].bit) & 1`.
pub fn composite_hash(cv: &ChoiceVector, attr_hashes: &[u32]) -> u32 {
    let mut out = 0u32;
    for i in 0..MAXBITS {
        let item = cv.item(i);
        let h = attr_hashes[item.att as usize];
        if (h >> item.bit) & 1 == 1 {
            out |= 1 << i;
        }
    }
    out
}

/// Composite hash of a fully-specified stored tuple: every field contributes
/// its real hash.
pub fn tuple_hash(cv: &ChoiceVector, fields: &[String]) -> u32 {
    let hashes: Vec<u32> = fields.iter().map(|f| attr_hash(f)).collect();
    composite_hash(cv, &hashes)
}

/// The known/unknown bit masks of a query template (spec §4.5). A field
/// starting with `?` contributes hash 0 and marks every composite-hash bit
/// position sourced from that attribute as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFingerprint {
    pub known: u32,
    pub unknown: u32,
}

pub fn query_fingerprint(cv: &ChoiceVector, template_fields: &[String]) -> QueryFingerprint {
    let wildcard: Vec<bool> = template_fields
        .iter()
        .map(|f| f.starts_with(crate::tuple::WILDCARD))
        .collect();
    let hashes: Vec<u32> = template_fields
        .iter()
        .zip(wildcard.iter())
        .map(|(f, &w)| if w { 0 } else { attr_hash(f) })
        .collect();

    let mut known = 0u32;
    let mut unknown = 0u32;
    for i in 0..MAXBITS {
        let item = cv.item(i);
        if wildcard[item.att as usize] {
            unknown |= 1 << i;
        } else if (hashes[item.att as usize] >> item.bit) & 1 == 1 {
            known |= 1 << i;
        }
    }
    QueryFingerprint { known, unknown }
}
