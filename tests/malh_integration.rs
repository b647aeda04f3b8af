use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use malhdb::{Mode, Relation, RelationConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_name(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("malhtest-{prefix}-{pid}-{t}-{id}"))
}

const CV4: &str = "0:0,1:0,2:0,3:0,0:1,1:1,2:1,3:1";

fn select_all(name: &PathBuf, template: &str, cfg: &RelationConfig) -> Vec<String> {
    let mut rel = Relation::open(name, Mode::Read, cfg).expect("open for select");
    let mut query = rel.start_query(template).expect("start_query");
    let mut out = Vec::new();
    while let Some(t) = query.next().expect("query.next") {
        out.push(t);
    }
    drop(query);
    rel.close().expect("close after select");
    out
}

// S1 + S3: basic insert and both a specific and fully-wildcard query.
#[test]
fn s1_s3_insert_and_select() {
    let name = unique_name("s1s3");
    let cfg = RelationConfig::default().with_page_size(1024);
    Relation::create(&name, 4, 1, 0, CV4, &cfg).unwrap();

    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        for t in ["1,a,x,10", "2,b,y,20", "3,c,z,30"] {
            rel.insert(t).unwrap();
        }
        rel.close().unwrap();
    }

    let specific = select_all(&name, "?,b,?,?", &cfg);
    assert_eq!(specific, vec!["2,b,y,20".to_string()]);

    let mut everything = select_all(&name, "?,?,?,?", &cfg);
    everything.sort();
    let mut expected = vec![
        "1,a,x,10".to_string(),
        "2,b,y,20".to_string(),
        "3,c,z,30".to_string(),
    ];
    expected.sort();
    assert_eq!(everything, expected);
}

// Invariant 2 (round-trip): every inserted tuple is returned exactly once
// by a wildcard-free query matching it.
#[test]
fn round_trip_every_tuple_exact_match() {
    let name = unique_name("roundtrip");
    let cfg = RelationConfig::default().with_page_size(1024);
    Relation::create(&name, 4, 1, 0, CV4, &cfg).unwrap();

    let tuples = ["1,a,x,10", "2,b,y,20", "3,c,z,30", "4,d,w,40"];
    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        for t in tuples {
            rel.insert(t).unwrap();
        }
        rel.close().unwrap();
    }

    for t in tuples {
        let got = select_all(&name, t, &cfg);
        assert_eq!(got, vec![t.to_string()], "round-trip failed for {t}");
    }
}

// S2: bulk synthetic load large enough to force at least one split.
#[test]
fn s2_bulk_load_forces_split_and_round_trips() {
    let name = unique_name("s2-bulk");
    let cfg = RelationConfig::default()
        .with_page_size(4096)
        .with_capacity_divisor(20); // C = 4096/(20*2) = 102, close enough to "~50" in spirit
    Relation::create(&name, 2, 1, 0, "0:0,1:0,0:1,1:1", &cfg).unwrap();

    let mut rng = oorandom::Rand64::new(0xC0FFEE);
    let mut seen = std::collections::HashSet::new();
    let mut tuples = Vec::new();
    while tuples.len() < 1000 {
        let a = rng.rand_u64() % 1_000_000;
        let b = rng.rand_u64() % 1_000_000;
        let t = format!("{a},{b}");
        if seen.insert(t.clone()) {
            tuples.push(t);
        }
    }

    let depth_before;
    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        depth_before = rel.depth();
        for t in &tuples {
            rel.insert(t).unwrap();
        }
        rel.close().unwrap();
    }

    let rel = Relation::open(&name, Mode::Read, &cfg).unwrap();
    assert!(
        rel.depth() > depth_before,
        "expected at least one split to have advanced depth"
    );
    rel.close().unwrap();

    for t in &tuples {
        let got = select_all(&name, t, &cfg);
        assert_eq!(got, vec![t.clone()], "round-trip failed for {t}");
    }
}

// S4: force an overflow chain via a tiny page size and two colliding tuples.
#[test]
fn s4_overflow_chain_round_trips() {
    let name = unique_name("s4-overflow");
    // Small page: header(12) + a handful of short tuples only. Splits may
    // also trigger along the way; that's fine, round-trip must hold either way.
    let cfg = RelationConfig::default().with_page_size(64);
    Relation::create(&name, 2, 1, 0, "0:0,1:0", &cfg).unwrap();

    let tuples: Vec<String> = (0..10).map(|i| format!("same,{i}")).collect();
    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        for t in &tuples {
            rel.insert(t).unwrap();
        }
        rel.close().unwrap();
    }

    for t in &tuples {
        let got = select_all(&name, t, &cfg);
        assert_eq!(got, vec![t.clone()]);
    }

    // relationStats should not panic and should reflect an overflow chain;
    // we can't capture stdout here, so just exercise the call.
    let mut rel = Relation::open(&name, Mode::Read, &cfg).unwrap();
    rel.print_stats().unwrap();
    rel.close().unwrap();
}

// Invariant 1 + S5: address-space consistency and split conservation.
#[test]
fn invariant_address_space_and_split_conservation() {
    let name = unique_name("split-conservation");
    let cfg = RelationConfig::default()
        .with_page_size(4096)
        .with_capacity_divisor(40); // small C to force a split quickly
    Relation::create(&name, 2, 1, 0, "0:0,1:0,0:1,1:1", &cfg).unwrap();

    let tuples: Vec<String> = (0..200).map(|i| format!("t{i},v{i}")).collect();
    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        for t in &tuples {
            rel.insert(t).unwrap();
            let npages = rel.npages();
            let d = rel.depth();
            let sp = rel.sp() as u64;
            assert_eq!(npages, (1u64 << d) + sp, "npages == 2^d + sp must always hold");
            assert!(sp < (1u64 << d), "sp must stay below 2^d");
        }
        rel.close().unwrap();
    }

    // Every inserted tuple must still be found post-split.
    for t in &tuples {
        let got = select_all(&name, t, &cfg);
        assert_eq!(got, vec![t.clone()]);
    }
}

// Invariant 4: no spurious duplicates for a non-trivial wildcard query.
#[test]
fn invariant_no_spurious_duplicates() {
    let name = unique_name("no-dupes");
    let cfg = RelationConfig::default().with_page_size(1024);
    Relation::create(&name, 3, 1, 0, "0:0,1:0,2:0,0:1,1:1,2:1", &cfg).unwrap();

    let tuples = [
        "x,1,red", "x,2,red", "x,3,blue", "y,1,red", "y,2,blue",
    ];
    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        for t in tuples {
            rel.insert(t).unwrap();
        }
        rel.close().unwrap();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tuples {
        *counts.entry(t).or_insert(0) += 1;
    }

    let matches = select_all(&name, "x,?,red", &cfg);
    let mut got_counts: HashMap<&str, usize> = HashMap::new();
    for m in &matches {
        *got_counts.entry(m.as_str()).or_insert(0) += 1;
    }
    let expected: HashMap<&str, usize> = [("x,1,red", 1), ("x,2,red", 1)].into_iter().collect();
    assert_eq!(got_counts, expected);
    let _ = counts;
}

// Invariant 6: two tuples agreeing on an attribute agree on every composite
// bit sourced from that attribute.
#[test]
fn invariant_choice_vector_partitioning() {
    use malhdb::cv::ChoiceVector;
    use malhdb::hash::tuple_hash;

    let cv = ChoiceVector::parse("0:0,1:0,0:1,1:1", 2).unwrap();
    let a = vec!["shared".to_string(), "left".to_string()];
    let b = vec!["shared".to_string(), "right".to_string()];

    let ha = tuple_hash(&cv, &a);
    let hb = tuple_hash(&cv, &b);

    for i in 0..malhdb::consts::MAXBITS {
        if cv.item(i).att == 0 {
            assert_eq!(
                (ha >> i) & 1,
                (hb >> i) & 1,
                "bit {i} sourced from attribute 0 must agree for tuples sharing that field"
            );
        }
    }
}

#[test]
fn exists_and_reopen_preserve_state() {
    let name = unique_name("reopen");
    let cfg = RelationConfig::default();
    assert!(!Relation::exists(&name));
    Relation::create(&name, 2, 1, 0, "0:0,1:0", &cfg).unwrap();
    assert!(Relation::exists(&name));

    {
        let mut rel = Relation::open(&name, Mode::Write, &cfg).unwrap();
        rel.insert("alpha,beta").unwrap();
        rel.close().unwrap();
    }

    let rel = Relation::open(&name, Mode::Read, &cfg).unwrap();
    assert_eq!(rel.ntups(), 1);
    rel.close().unwrap();
}
