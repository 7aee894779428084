//! # Personal consensus sequences
//!
//! Reconstructs, for every position of a chromosome, the two bases an
//! individual carries by merging a flat reference sequence with called
//! variants.
//!
//! ## Pipeline
//!
//! 1. **Sequence index**: per-contig byte layout of the reference file
//! 2. **Reference reader**: seeks straight to a start position and streams bases
//! 3. **Variant locator**: binary search into the position-sorted call file,
//!    then a forward stream of parsed calls
//! 4. **Resolver**: reduces colocated calls to at most two
//! 5. **Merge walker**: interleaves both streams into a gapless locus stream
//!
//! ## Usage Example
//!
//! ```ignore
//! use strandline::{ConsensusConfig, ConsensusEngine};
//!
//! let config = ConsensusConfig::new("ref.fa", "ref.fa.fai", "calls_{contig}.vcf")
//!     .with_contigs(["chr3"]);
//! let engine = ConsensusEngine::open(config)?;
//! for locus in engine.consensus("chr3", 1)?.take(100) {
//!     println!("{:?}", locus?);
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics;

pub use genomics::{
    Base, ConsensusStats, ConsensusWalker, ContigLayout, Locus, RefRelation, ReferenceIndex,
    Strand, VariantRecord,
};

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Placeholder replaced by the contig name in variant path patterns.
pub const CONTIG_PLACEHOLDER: &str = "{contig}";

/// Walker over files on disk.
pub type FileWalker = ConsensusWalker<BufReader<File>, BufReader<File>>;

/// Contigs of a human assembly: autosomes, sex chromosomes and mitochondria.
pub fn default_contigs() -> Vec<String> {
    (1..=22)
        .map(|n| format!("chr{n}"))
        .chain(["chrX", "chrY", "chrM"].map(String::from))
        .collect()
}

/// Input files and options for consensus passes.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Flat reference sequence file.
    pub reference_path: PathBuf,

    /// Sequence index describing the reference layout.
    pub index_path: PathBuf,

    /// Variant file path, with `{contig}` replaced per contig.
    pub variant_path_pattern: String,

    /// Contigs to load from the index.
    pub contigs: Vec<String>,

    /// Only use calls whose filter status is `PASS`.
    pub require_pass: bool,
}

impl ConsensusConfig {
    /// Configuration with the default contig set, keeping only `PASS` calls.
    pub fn new(
        reference_path: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
        variant_path_pattern: impl Into<String>,
    ) -> Self {
        Self {
            reference_path: reference_path.into(),
            index_path: index_path.into(),
            variant_path_pattern: variant_path_pattern.into(),
            contigs: default_contigs(),
            require_pass: true,
        }
    }

    /// Restrict the loaded contigs.
    pub fn with_contigs<I, S>(mut self, contigs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contigs = contigs.into_iter().map(Into::into).collect();
        self
    }

    /// Choose whether non-`PASS` calls are skipped.
    pub fn with_require_pass(mut self, require_pass: bool) -> Self {
        self.require_pass = require_pass;
        self
    }

    /// Variant file for `contig`.
    pub fn variant_path(&self, contig: &str) -> PathBuf {
        PathBuf::from(self.variant_path_pattern.replace(CONTIG_PLACEHOLDER, contig))
    }
}

/// Errors that stop a consensus pass from starting or continuing.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// The sequence index could not be loaded or does not fit the reference.
    #[error(transparent)]
    Index(#[from] genomics::IndexError),

    /// The contig was not loaded from the index.
    #[error("contig {0} is not in the loaded index")]
    UnknownContig(String),

    /// Start position outside the contig.
    #[error("start position {start} is outside {contig} (1..={length})")]
    StartOutOfRange {
        /// Requested contig.
        contig: String,
        /// Requested start.
        start: u64,
        /// Contig length.
        length: u64,
    },

    /// A configured file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading failed part-way through a pass.
    #[error(transparent)]
    Merge(#[from] genomics::MergeError),
}

fn open_error(path: &Path) -> impl FnOnce(io::Error) -> ConsensusError + '_ {
    move |source| ConsensusError::Open {
        path: path.to_path_buf(),
        source,
    }
}

/// Entry point: holds the loaded index and starts independent passes.
#[derive(Debug)]
pub struct ConsensusEngine {
    config: ConsensusConfig,
    index: ReferenceIndex,
}

impl ConsensusEngine {
    /// Load the index for the configured contigs and check it against the
    /// reference file.
    pub fn open(config: ConsensusConfig) -> Result<Self, ConsensusError> {
        let index = ReferenceIndex::load(&config.index_path, config.contigs.as_slice())?;
        let file_size = std::fs::metadata(&config.reference_path)
            .map_err(open_error(&config.reference_path))?
            .len();
        index.validate(file_size)?;

        info!(
            contigs = index.len(),
            reference = %config.reference_path.display(),
            "loaded sequence index"
        );
        Ok(Self { config, index })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Loaded sequence index.
    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Layout of a loaded contig.
    pub fn layout(&self, contig: &str) -> Result<&ContigLayout, ConsensusError> {
        self.index
            .get(contig)
            .ok_or_else(|| ConsensusError::UnknownContig(contig.to_string()))
    }

    /// Start a pass over `contig` from the 1-based position `start`.
    ///
    /// Each call opens its own file handles, released when the walker is
    /// dropped.
    pub fn consensus(&self, contig: &str, start: u64) -> Result<FileWalker, ConsensusError> {
        let layout = self.layout(contig)?;
        if start == 0 || start > layout.length {
            return Err(ConsensusError::StartOutOfRange {
                contig: contig.to_string(),
                start,
                length: layout.length,
            });
        }

        let reference = genomics::ReferenceReader::open(&self.config.reference_path, layout, start)
            .map_err(open_error(&self.config.reference_path))?;

        let variant_path = self.config.variant_path(contig);
        let variants = genomics::VariantStream::from_position(
            &variant_path,
            contig,
            start,
            self.config.require_pass,
        )
        .map_err(open_error(&variant_path))?;

        info!(contig, start, "starting consensus pass");
        Ok(ConsensusWalker::new(reference, variants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_path_substitutes_contig() {
        let config = ConsensusConfig::new("ref.fa", "ref.fa.fai", "calls_{contig}.vcf");
        assert_eq!(config.variant_path("chr3"), PathBuf::from("calls_chr3.vcf"));

        let fixed = ConsensusConfig::new("ref.fa", "ref.fa.fai", "calls.vcf");
        assert_eq!(fixed.variant_path("chr3"), PathBuf::from("calls.vcf"));
    }

    #[test]
    fn default_contigs_cover_assembly() {
        let contigs = default_contigs();
        assert_eq!(contigs.len(), 25);
        assert_eq!(contigs[0], "chr1");
        assert_eq!(contigs[24], "chrM");
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ConsensusConfig::new("a", "b", "c")
            .with_contigs(["chr2"])
            .with_require_pass(false);
        assert_eq!(config.contigs, vec!["chr2".to_string()]);
        assert!(!config.require_pass);
    }
}
