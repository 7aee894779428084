use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::resolve::{representative, resolve};
use super::{Base, Locus, RefRelation, ReferenceReader, VariantRecord, VariantStream};

/// Reference positions between progress events.
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// I/O failures while a pass is running.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Reading the reference sequence failed.
    #[error("failed to read reference sequence: {0}")]
    Reference(#[source] io::Error),
    /// Reading the variant file failed.
    #[error("failed to read variant calls: {0}")]
    Variants(#[source] io::Error),
}

/// Counters collected over one consensus pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsensusStats {
    /// Reference positions visited one at a time.
    pub reference_positions: u64,
    /// Positions where at least one variant call applied.
    pub variant_sites: u64,
    /// Loci handed to the consumer.
    pub loci_emitted: u64,
    /// Reference bases consumed by multi-base events past their first base.
    pub reference_bases_skipped: u64,
    /// Calls dropped because a multi-base event covered them.
    pub nested_variants_dropped: u64,
    /// Calls whose reference base disagreed with the reference sequence.
    pub reference_inconsistencies: u64,
    /// Positions skipped for an unsupported genotype.
    pub unsupported_genotypes: u64,
    /// Variant lines skipped as malformed.
    pub malformed_variant_lines: u64,
}

/// Streams the consensus loci of one contig by interleaving the reference
/// with variant calls.
///
/// Each reference position yields one homozygous-reference locus unless
/// calls start there. A SNP yields a single locus. A multi-base event yields
/// one locus per paired allele base, all at the event's position, then
/// consumes the rest of its reference span and drops every call starting
/// inside that span.
#[derive(Debug)]
pub struct ConsensusWalker<R, V> {
    contig: Arc<str>,
    reference: ReferenceReader<R>,
    variants: VariantStream<V>,
    pending: Option<VariantRecord>,
    queue: VecDeque<Locus>,
    stats: ConsensusStats,
    finished: bool,
}

impl<R: BufRead, V: BufRead> ConsensusWalker<R, V> {
    /// Combine a reference stream and a variant stream positioned at the same
    /// starting position.
    pub fn new(reference: ReferenceReader<R>, variants: VariantStream<V>) -> Self {
        Self {
            contig: Arc::clone(reference.contig()),
            reference,
            variants,
            pending: None,
            queue: VecDeque::new(),
            stats: ConsensusStats::default(),
            finished: false,
        }
    }

    /// Contig being walked.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Counters for the pass so far.
    pub fn stats(&self) -> ConsensusStats {
        ConsensusStats {
            malformed_variant_lines: self.variants.malformed_lines() as u64,
            ..self.stats
        }
    }

    fn peek_variant(&mut self) -> Result<Option<u64>, MergeError> {
        if self.pending.is_none() {
            self.pending = self.variants.next().transpose().map_err(MergeError::Variants)?;
        }
        Ok(self.pending.as_ref().map(|record| record.position))
    }

    /// Drop pending calls that start before `position`.
    fn discard_before(&mut self, position: u64, covered: bool) -> Result<(), MergeError> {
        while let Some(pending) = self.peek_variant()? {
            if pending >= position {
                break;
            }
            self.pending = None;
            if covered {
                self.stats.nested_variants_dropped += 1;
                debug!(
                    contig = %self.contig,
                    position = pending,
                    "dropping call covered by a multi-base event"
                );
            } else {
                debug!(
                    contig = %self.contig,
                    position = pending,
                    "dropping call behind the reference cursor"
                );
            }
        }
        Ok(())
    }

    fn collect_site(&mut self, position: u64) -> Result<Vec<VariantRecord>, MergeError> {
        let mut records = Vec::new();
        while self.peek_variant()? == Some(position) {
            records.extend(self.pending.take());
        }
        Ok(records)
    }

    fn skip_reference(&mut self, count: u64) -> Result<(), MergeError> {
        for _ in 0..count {
            match self.reference.next() {
                Some(Ok(_)) => self.stats.reference_bases_skipped += 1,
                Some(Err(err)) => return Err(MergeError::Reference(err)),
                None => break,
            }
        }
        Ok(())
    }

    /// Advance one reference position. Returns `false` once the reference
    /// is exhausted.
    fn step(&mut self) -> Result<bool, MergeError> {
        let Some((position, base)) = self
            .reference
            .next()
            .transpose()
            .map_err(MergeError::Reference)?
        else {
            return Ok(false);
        };

        self.stats.reference_positions += 1;
        if self.stats.reference_positions % PROGRESS_INTERVAL == 0 {
            info!(
                contig = %self.contig,
                position,
                variant_sites = self.stats.variant_sites,
                "consensus progress"
            );
        }

        self.discard_before(position, false)?;
        if self.peek_variant()? == Some(position) {
            self.variant_site(position, base)?;
        } else {
            self.queue
                .push_back(Locus::reference(Arc::clone(&self.contig), position, base));
        }
        Ok(true)
    }

    fn variant_site(&mut self, position: u64, base: Base) -> Result<(), MergeError> {
        self.stats.variant_sites += 1;
        let records = self.collect_site(position)?;

        for record in &records {
            if record.reference[0] != base {
                self.stats.reference_inconsistencies += 1;
                error!(
                    contig = %self.contig,
                    position,
                    variant_reference = %record.reference[0],
                    reference = %base,
                    "variant reference base disagrees with reference sequence"
                );
            }
        }

        let resolved = resolve(records);
        let Some(variant) = representative(&resolved) else {
            return Ok(());
        };

        let genotype = variant.genotype;
        let alleles = (variant.allele(genotype.0), variant.allele(genotype.1));
        let (relation, first, second) = match (RefRelation::from_genotype(genotype), alleles) {
            (Ok(relation), (Some(first), Some(second))) => (relation, first, second),
            (Err(err), _) => {
                self.stats.unsupported_genotypes += 1;
                warn!(
                    contig = %self.contig,
                    position,
                    error = %err,
                    "skipping position with unsupported genotype"
                );
                return Ok(());
            }
            (Ok(_), _) => {
                self.stats.unsupported_genotypes += 1;
                warn!(
                    contig = %self.contig,
                    position,
                    %genotype,
                    "skipping position whose genotype names a missing allele"
                );
                return Ok(());
            }
        };

        if variant.is_snp() {
            self.queue.push_back(Locus::new(
                Arc::clone(&self.contig),
                position,
                (first[0], second[0]),
                relation,
            ));
            return Ok(());
        }

        let width = first.len().max(second.len());
        for idx in 0..width {
            let pair = (
                first.get(idx).copied().unwrap_or(Base::Missing),
                second.get(idx).copied().unwrap_or(Base::Missing),
            );
            self.queue
                .push_back(Locus::new(Arc::clone(&self.contig), position, pair, relation));
        }

        let span = variant.reference_span();
        self.skip_reference(span - 1)?;
        self.discard_before(position + span, true)
    }
}

impl<R: BufRead, V: BufRead> Iterator for ConsensusWalker<R, V> {
    type Item = Result<Locus, MergeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(locus) = self.queue.pop_front() {
                self.stats.loci_emitted += 1;
                return Some(Ok(locus));
            }
            if self.finished {
                return None;
            }

            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    let stats = self.stats();
                    info!(
                        contig = %self.contig,
                        positions = stats.reference_positions,
                        variant_sites = stats.variant_sites,
                        skipped = stats.reference_bases_skipped,
                        nested_dropped = stats.nested_variants_dropped,
                        "consensus pass finished"
                    );
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
