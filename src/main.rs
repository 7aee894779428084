use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use strandline::genomics::{find_first_at_or_after, locus_char, VariantStream};
use strandline::{ConsensusConfig, ConsensusEngine, ReferenceIndex, Strand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strandline", about = "Personal consensus sequence from a reference and variant calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List contig layouts from a sequence index.
    Index {
        /// Sequence index (`.fai`).
        index: PathBuf,
        /// Only show these contigs.
        #[arg(long = "contig")]
        contigs: Vec<String>,
    },
    /// Locate the first variant call at or after a position.
    Locate {
        /// Variant file, `{contig}` is replaced by the contig name.
        #[arg(long)]
        variants: String,
        /// Contig name.
        #[arg(long)]
        contig: String,
        /// 1-based target position.
        #[arg(long)]
        position: u64,
    },
    /// Print the consensus sequence of a contig.
    Consensus {
        /// Reference sequence (FASTA).
        #[arg(long)]
        reference: PathBuf,
        /// Sequence index (`.fai`).
        #[arg(long)]
        index: PathBuf,
        /// Variant file, `{contig}` is replaced by the contig name.
        #[arg(long)]
        variants: String,
        /// Contig name.
        #[arg(long, default_value = "chr1")]
        contig: String,
        /// 1-based first position.
        #[arg(long, default_value_t = 1)]
        start: u64,
        /// Stop after this many loci.
        #[arg(long)]
        limit: Option<usize>,
        /// Strand to print.
        #[arg(long, value_enum, default_value_t = StrandArg::Second)]
        strand: StrandArg,
        /// Print the complementary bases.
        #[arg(long)]
        complement: bool,
        /// Use calls regardless of their filter status.
        #[arg(long)]
        all_filters: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrandArg {
    First,
    Second,
}

impl From<StrandArg> for Strand {
    fn from(arg: StrandArg) -> Self {
        match arg {
            StrandArg::First => Strand::First,
            StrandArg::Second => Strand::Second,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { index, contigs } => run_index(index, contigs)?,
        Commands::Locate {
            variants,
            contig,
            position,
        } => run_locate(variants, contig, position)?,
        Commands::Consensus {
            reference,
            index,
            variants,
            contig,
            start,
            limit,
            strand,
            complement,
            all_filters,
        } => {
            let config = ConsensusConfig::new(reference, index, variants)
                .with_contigs([contig.clone()])
                .with_require_pass(!all_filters);
            run_consensus(config, &contig, start, limit, strand.into(), complement)?
        }
    }

    Ok(())
}

fn run_index(index_path: PathBuf, contigs: Vec<String>) -> Result<()> {
    let index = if contigs.is_empty() {
        ReferenceIndex::load_all(&index_path)
    } else {
        ReferenceIndex::load(&index_path, contigs.as_slice())
    }
    .with_context(|| format!("failed to load index {}", index_path.display()))?;

    for layout in index.layouts() {
        println!(
            "{}\tlength={}\toffset={}\tbases/line={}\tbytes/line={}",
            layout.name, layout.length, layout.offset, layout.bases_per_line, layout.bytes_per_line
        );
    }
    Ok(())
}

fn run_locate(pattern: String, contig: String, position: u64) -> Result<()> {
    let config = ConsensusConfig::new("", "", pattern);
    let path = config.variant_path(&contig);
    let offset = find_first_at_or_after(&path, &contig, position)
        .with_context(|| format!("failed to search {}", path.display()))?;
    println!("offset={offset}");

    let mut stream = VariantStream::open(&path, contig.as_str(), offset, false)
        .with_context(|| format!("failed to open {}", path.display()))?;
    match stream.next().transpose()? {
        Some(record) => println!(
            "{}\t{}\tquality={:.2}\tfilter={}\tgenotype={}\t{:?}",
            record.contig, record.position, record.quality, record.filter, record.genotype, record.kind
        ),
        None => println!("No call at or after {contig}:{position}."),
    }
    Ok(())
}

fn run_consensus(
    config: ConsensusConfig,
    contig: &str,
    start: u64,
    limit: Option<usize>,
    strand: Strand,
    complement: bool,
) -> Result<()> {
    let engine = ConsensusEngine::open(config).context("failed to open consensus inputs")?;
    let mut walker = engine
        .consensus(contig, start)
        .with_context(|| format!("failed to start consensus pass on {contig}"))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut buffer = [0u8; 4];
    for locus in walker.by_ref().take(limit.unwrap_or(usize::MAX)) {
        let locus = locus.context("consensus pass failed")?;
        let symbol = locus_char(&locus, strand, complement);
        out.write_all(symbol.encode_utf8(&mut buffer).as_bytes())?;
    }
    out.write_all(b"\n")?;
    out.flush()?;

    let stats = walker.stats();
    eprintln!(
        "positions={} variant_sites={} loci={} skipped={} nested_dropped={} inconsistent={} unsupported={} malformed={}",
        stats.reference_positions,
        stats.variant_sites,
        stats.loci_emitted,
        stats.reference_bases_skipped,
        stats.nested_variants_dropped,
        stats.reference_inconsistencies,
        stats.unsupported_genotypes,
        stats.malformed_variant_lines
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_consensus_arguments() {
        let cli = Cli::parse_from([
            "strandline",
            "consensus",
            "--reference",
            "ref.fa",
            "--index",
            "ref.fa.fai",
            "--variants",
            "calls_{contig}.vcf",
            "--contig",
            "chr3",
            "--limit",
            "20",
            "--strand",
            "first",
        ]);
        match cli.command {
            Commands::Consensus {
                contig,
                start,
                limit,
                strand,
                ..
            } => {
                assert_eq!(contig, "chr3");
                assert_eq!(start, 1);
                assert_eq!(limit, Some(20));
                assert_eq!(Strand::from(strand), Strand::First);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
