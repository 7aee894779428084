#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;

use blake3::hash;
use common::{call, Fixture};
use strandline::genomics::render_consensus;
use strandline::{ConsensusEngine, Strand};

#[test]
fn repeated_passes_are_identical() {
    let sequence: String = "GATTACACCGTA".chars().cycle().take(250).collect();
    let fixture = Fixture::new(
        &[("chrD", &sequence)],
        60,
        &[
            call("chrD", 6, "C", "T", 40.0, "PASS", "0/1"),
            call("chrD", 42, "C", "CGG", 55.0, "PASS", "1/1"),
            call("chrD", 42, "C", "A", 20.0, "PASS", "0/1"),
            call("chrD", 102, "CA", "C", 35.0, "PASS", "0/1"),
            call("chrD", 190, "G", "A", 12.0, "LowQual", "1/1"),
        ],
    );
    let engine = ConsensusEngine::open(fixture.config.clone()).expect("engine opens");

    let mut fingerprints = HashSet::new();
    let mut stats = HashSet::new();
    for _ in 0..5 {
        let mut walker = engine.consensus("chrD", 1).expect("pass starts");
        let loci = walker
            .by_ref()
            .collect::<Result<Vec<_>, _>>()
            .expect("pass succeeds");
        let rendered = format!(
            "{}{}",
            render_consensus(&loci, Strand::First, false),
            render_consensus(&loci, Strand::Second, true)
        );
        fingerprints.insert(hash(rendered.as_bytes()));
        stats.insert(format!("{:?}", walker.stats()));
    }

    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
    assert_eq!(stats.len(), 1, "counters diverged across runs");
}

#[test]
fn later_start_yields_a_suffix_of_the_full_pass() {
    let sequence: String = "TTGACCA".chars().cycle().take(120).collect();
    let fixture = Fixture::new(
        &[("chrD", &sequence)],
        50,
        &[
            call("chrD", 10, "G", "C", 40.0, "PASS", "1/1"),
            call("chrD", 80, "G", "T", 40.0, "PASS", "0/1"),
        ],
    );
    let engine = ConsensusEngine::open(fixture.config.clone()).expect("engine opens");
    let full = engine
        .consensus("chrD", 1)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let tail = engine
        .consensus("chrD", 61)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(tail.len(), 60);
    assert_eq!(&full[full.len() - tail.len()..], tail.as_slice());
}
