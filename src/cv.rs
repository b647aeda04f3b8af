//! The choice vector: the static mapping from composite-hash bit position
//! to (attribute, per-attribute-hash-bit), parsed from the `A:B,A:B,...`
//! spec syntax (spec §6) and cyclically extended to exactly `MAXBITS` items.

use anyhow::{anyhow, Result};

use crate::consts::MAXBITS;

/// One item of the choice vector: composite bit `i` is sourced from bit
/// `bit` of attribute `att`'s hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChVecItem {
    pub att: u32,
    pub bit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceVector {
    items: [ChVecItem; MAXBITS],
}

impl ChoiceVector {
    /// Parse a comma-separated `A:B` spec, validating each item against
    /// `nattrs`, then cyclically repeat it until exactly `MAXBITS` items
    /// are recorded.
    pub fn parse(spec: &str, nattrs: u32) -> Result<Self> {
        if nattrs == 0 {
            return Err(anyhow!("nattrs must be > 0"));
        }

        let mut parsed = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (a, b) = part
                .split_once(':')
                .ok_or_else(|| anyhow!("bad choice-vector item {part:?}, expected A:B"))?;
            let att: u32 = a
                .trim()
                .parse()
                .map_err(|_| anyhow!("bad attribute index in choice-vector item {part:?}"))?;
            let bit: u32 = b
                .trim()
                .parse()
                .map_err(|_| anyhow!("bad bit position in choice-vector item {part:?}"))?;
            if att >= nattrs {
                return Err(anyhow!(
                    "choice-vector item {part:?} references attribute {att}, but nattrs={nattrs}"
                ));
            }
            if bit as usize >= MAXBITS {
                return Err(anyhow!(
                    "choice-vector item {part:?} references bit {bit}, must be < {MAXBITS}"
                ));
            }
            parsed.push(ChVecItem { att, bit });
        }

        if parsed.is_empty() {
            return Err(anyhow!("choice-vector spec has no items"));
        }

        let mut items = [ChVecItem { att: 0, bit: 0 }; MAXBITS];
        for (i, slot) in items.iter_mut().enumerate() {
            *slot = parsed[i % parsed.len()];
        }
        Ok(Self { items })
    }

    /// Build directly from exactly `MAXBITS` already-validated items
    /// (used when reading a relation's info file back).
    pub fn from_items(items: [ChVecItem; MAXBITS]) -> Self {
        Self { items }
    }

    #[inline]
    pub fn item(&self, i: usize) -> ChVecItem {
        self.items[i]
    }

    pub fn items(&self) -> &[ChVecItem; MAXBITS] {
        &self.items
    }

    /// Render as `A:B,A:B,...` — the inverse of `parse`, used for diagnostics.
    pub fn to_spec_string(&self) -> String {
        self.items
            .iter()
            .map(|it| format!("{}:{}", it.att, it.bit))
            .collect::<Vec<_>>()
            .join(",")
    }
}
