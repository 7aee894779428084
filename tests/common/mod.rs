#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use strandline::ConsensusConfig;
use tempfile::TempDir;

const VCF_HEADER: &str = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE\n";

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("STRANDLINE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set STRANDLINE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// One variant line with a `GT:PL` sample column.
pub fn call(contig: &str, pos: u64, reference: &str, alt: &str, quality: f32, filter: &str, gt: &str) -> String {
    format!("{contig}\t{pos}\t.\t{reference}\t{alt}\t{quality}\t{filter}\tDP=20\tGT:PL\t{gt}:0,30,300\n")
}

/// Reference, index and per-contig variant files in a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub config: ConsensusConfig,
}

impl Fixture {
    /// Write a FASTA with `width` bases per line, its index, and one variant
    /// file per contig holding the calls whose first column names it.
    pub fn new(contigs: &[(&str, &str)], width: usize, calls: &[String]) -> Self {
        let dir = tempfile::tempdir().expect("create fixture directory");
        let mut fasta = String::new();
        let mut index = String::new();

        for (name, sequence) in contigs {
            fasta.push_str(&format!(">{name} test contig\n"));
            let offset = fasta.len();
            for chunk in sequence.as_bytes().chunks(width) {
                fasta.push_str(std::str::from_utf8(chunk).unwrap());
                fasta.push('\n');
            }
            index.push_str(&format!(
                "{name}\t{}\t{offset}\t{width}\t{}\n",
                sequence.len(),
                width + 1
            ));

            let mut vcf = String::from(VCF_HEADER);
            let prefix = format!("{name}\t");
            for line in calls.iter().filter(|line| line.starts_with(&prefix)) {
                vcf.push_str(line);
            }
            fs::write(dir.path().join(format!("calls_{name}.vcf")), vcf).unwrap();
        }

        let reference = dir.path().join("ref.fa");
        let fai = dir.path().join("ref.fa.fai");
        fs::write(&reference, fasta).unwrap();
        fs::write(&fai, index).unwrap();

        let pattern = dir.path().join("calls_{contig}.vcf");
        let config = ConsensusConfig::new(reference, fai, pattern.to_string_lossy().into_owned())
            .with_contigs(contigs.iter().map(|(name, _)| name.to_string()));

        Self { dir, config }
    }
}
