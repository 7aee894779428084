//! Reduction of colocated variant calls to at most two compatible calls.
//!
//! The policy is a fixed heuristic, not an optimal merge:
//!
//! 1. Order calls by descending quality (ties keep file order).
//! 2. With more than two calls, drop the lowest-quality non-SNP calls until
//!    two remain. If only SNPs are left and there are still more than two,
//!    keep the two best and report the conflict.
//! 3. With exactly two calls where either is not the combined heterozygous
//!    `0/1` call, keep only the SNP call(s) if there is one, otherwise only
//!    the best call.

use std::sync::Arc;

use tracing::{error, warn};

use super::{Genotype, VariantRecord};

/// Apply the reduction policy to every call sharing one position.
///
/// Returns at most two calls, and at least one for non-empty input.
pub fn resolve(mut records: Vec<VariantRecord>) -> Vec<VariantRecord> {
    let Some(first) = records.first() else {
        return records;
    };
    let contig = Arc::clone(&first.contig);
    let position = first.position;

    records.sort_by(|a, b| b.quality.total_cmp(&a.quality));

    if records.len() > 2 {
        warn!(
            contig = %contig,
            position,
            calls = records.len(),
            "more than two colocated calls, dropping lowest quality non-SNP"
        );
        records = drop_lowest_non_snp(records);

        if records.len() > 2 {
            error!(
                contig = %contig,
                position,
                calls = records.len(),
                "more than two SNP calls at one position, keeping the two highest quality"
            );
            records.truncate(2);
        }
    }

    if records.len() == 2 && records.iter().any(|record| record.genotype != Genotype::HET_REF) {
        if records.iter().any(VariantRecord::is_snp) {
            warn!(
                contig = %contig,
                position,
                "one of two calls not heterozygous, dropping indel"
            );
            records.retain(VariantRecord::is_snp);
        } else {
            warn!(
                contig = %contig,
                position,
                "one of two calls not heterozygous, dropping lowest quality"
            );
            records.truncate(1);
        }
    }

    records
}

/// Remove non-SNP calls, lowest quality first, until two calls remain.
/// Expects `records` sorted by descending quality.
fn drop_lowest_non_snp(records: Vec<VariantRecord>) -> Vec<VariantRecord> {
    let mut excess = records.len().saturating_sub(2);
    let mut kept: Vec<VariantRecord> = records
        .into_iter()
        .rev()
        .filter(|record| {
            if excess > 0 && !record.is_snp() {
                excess -= 1;
                false
            } else {
                true
            }
        })
        .collect();
    kept.reverse();
    kept
}

/// The call used to render a resolved position.
///
/// SNP and indel qualities are not comparable, so any SNP wins; otherwise
/// the highest-quality call is used.
pub fn representative(resolved: &[VariantRecord]) -> Option<&VariantRecord> {
    resolved
        .iter()
        .find(|record| record.is_snp())
        .or_else(|| resolved.first())
}
