//! The partial-match query scanner: computes a query's known/unknown bit
//! fingerprint, enumerates the candidate buckets it implies, and walks
//! each bucket's primary page and overflow chain in turn (spec §4.7).
//!
//! A `Query` is a coroutine-style iterator — all scan state lives in the
//! struct, resumed one call to `next` at a time, the way the teacher's
//! own scan cursors (`db::scan`) hold their position between calls rather
//! than returning a closure or generator.

use anyhow::Result;

use crate::bits::lo_bits;
use crate::consts::MAXBITS;
use crate::hash::query_fingerprint;
use crate::page::{next_tuple, page_ntuples, page_ovflow};
use crate::relation::Relation;
use crate::tuple::{tuple_match, tuple_vals};

pub struct Query<'a> {
    relation: &'a mut Relation,
    template: Vec<String>,

    /// Bit positions (LSB-first) within `[0, d_used)` where `unknown` is
    /// set; enumerated by `option`'s bits in the same order.
    positions: Vec<u32>,
    start: u64,
    total_options: u64,
    option: u64,

    curpage: Option<Vec<u8>>,
    is_ovflow: bool,
    curtup: u32,
    ctuple: u32,
}

impl<'a> Query<'a> {
    pub(crate) fn start(relation: &'a mut Relation, template: &str) -> Result<Self> {
        let fields = tuple_vals(template, relation.nattrs() as usize)?;
        let fp = query_fingerprint(relation.cv(), &fields);

        let d = relation.depth();
        let sp = relation.sp() as u64;

        let candidate0 = lo_bits(fp.known, d) as u64;
        let (start, d_used) = if candidate0 < sp {
            (lo_bits(fp.known, d + 1) as u64, d + 1)
        } else {
            (candidate0, d)
        };

        let unknown_restricted = lo_bits(fp.unknown, d_used);
        let mut positions = Vec::new();
        for i in 0..MAXBITS as u32 {
            if (unknown_restricted >> i) & 1 == 1 {
                positions.push(i);
            }
        }
        let unnum = positions.len() as u32;
        let total_options = 1u64 << unnum;

        Ok(Self {
            relation,
            template: fields,
            positions,
            start,
            total_options,
            option: 0,
            curpage: None,
            is_ovflow: false,
            curtup: 0,
            ctuple: 0,
        })
    }

    fn candidate_for(&self, option: u64) -> u64 {
        let mut candidate = self.start;
        for (i, &p) in self.positions.iter().enumerate() {
            if (option >> i) & 1 == 1 {
                candidate |= 1u64 << p;
            }
        }
        candidate
    }

    /// Advance to the next matching tuple, or `Ok(None)` once every
    /// in-range candidate bucket has been exhausted.
    pub fn next(&mut self) -> Result<Option<String>> {
        loop {
            if self.curpage.is_none() {
                loop {
                    if self.option >= self.total_options {
                        return Ok(None);
                    }
                    let candidate = self.candidate_for(self.option);
                    self.option += 1;
                    if candidate >= self.relation.npages() {
                        // Skip out-of-range candidates; never break early,
                        // since the bit-scatter enumeration order isn't
                        // guaranteed monotone in general.
                        continue;
                    }
                    self.is_ovflow = false;
                    self.curtup = 0;
                    self.ctuple = 0;
                    self.curpage = Some(self.relation.get_data_page(candidate)?);
                    break;
                }
            }

            let page_ref = self.curpage.as_ref().unwrap();
            let ntuples = page_ntuples(page_ref);

            if self.ctuple == ntuples {
                let ov = page_ovflow(page_ref);
                match ov {
                    Some(id) => {
                        let ovpage = self.relation.get_ovflow_page(id)?;
                        self.is_ovflow = true;
                        self.curtup = 0;
                        self.ctuple = 0;
                        self.curpage = Some(ovpage);
                    }
                    None => {
                        self.curpage = None;
                    }
                }
                continue;
            }

            let (text, consumed) = next_tuple(page_ref, self.curtup)?;
            self.curtup += consumed;
            self.ctuple += 1;

            let fields = tuple_vals(&text, self.template.len())?;
            if tuple_match(&self.template, &fields) {
                return Ok(Some(text));
            }
        }
    }
}
