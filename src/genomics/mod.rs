//! Components of the consensus engine.
//!
//! Data flows from the sequence index into two lazy readers (reference bases
//! and variant calls), which the merge walker interleaves into loci.

mod base;
mod consensus;
mod fai;
mod reference;
mod render;
pub mod resolve;
mod types;
mod vcf;

pub use base::Base;
pub use consensus::{ConsensusStats, ConsensusWalker, MergeError};
pub use fai::{ContigLayout, IndexError, ReferenceIndex};
pub use reference::ReferenceReader;
pub use render::{locus_char, render_consensus, write_consensus, Strand};
pub use resolve::{representative, resolve};
pub use types::{
    Genotype, Locus, RefRelation, StructuralType, UnsupportedGenotype, VariantRecord,
};
pub use vcf::{
    find_first_at_or_after, parse_line, search_offset, VariantParseError, VariantStream,
};
