use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::Base;

/// Structural classification of a variant derived from allele lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StructuralType {
    /// Single-base substitution.
    Snp,
    /// Reference of length one, every alternate longer.
    Insertion,
    /// Reference longer than one, every alternate of length one.
    Deletion,
    /// Mixed-length alternates.
    Other,
}

impl StructuralType {
    /// Classify a call from its reference and alternate alleles.
    pub fn classify(reference: &[Base], alternates: &[Vec<Base>]) -> Self {
        let ref_len = reference.len();
        if ref_len == 1 && alternates.iter().all(|alt| alt.len() == 1) {
            StructuralType::Snp
        } else if ref_len == 1 && alternates.iter().all(|alt| alt.len() > 1) {
            StructuralType::Insertion
        } else if ref_len > 1 && alternates.iter().all(|alt| alt.len() == 1) {
            StructuralType::Deletion
        } else {
            StructuralType::Other
        }
    }
}

/// Pair of allele indices: 0 is the reference allele, `n` the n-th alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Genotype(pub usize, pub usize);

impl Genotype {
    /// The combined heterozygous call `0/1`.
    pub const HET_REF: Genotype = Genotype(0, 1);

    /// Homozygous genotype, used for single-copy contigs that report one index.
    pub fn homozygous(allele: usize) -> Self {
        Genotype(allele, allele)
    }

    /// Largest allele index referenced.
    pub fn max_index(self) -> usize {
        self.0.max(self.1)
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

/// Genotype outside the pairs with a defined relation to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported genotype {0}")]
pub struct UnsupportedGenotype(pub Genotype);

/// How the two alleles at a locus relate to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RefRelation {
    /// Both alleles match the reference.
    HomozygousReference,
    /// One allele matches the reference, the other differs.
    HeterozygousReference,
    /// Both alleles differ from the reference and are identical.
    HomozygousAlternate,
    /// Both alleles differ from the reference and from each other.
    HeterozygousAlternate,
}

impl RefRelation {
    /// Map a genotype onto its relation to the reference.
    pub fn from_genotype(genotype: Genotype) -> Result<Self, UnsupportedGenotype> {
        match (genotype.0, genotype.1) {
            (0, 0) => Ok(RefRelation::HomozygousReference),
            (0, 1) => Ok(RefRelation::HeterozygousReference),
            (1, 1) | (2, 2) => Ok(RefRelation::HomozygousAlternate),
            (1, 2) => Ok(RefRelation::HeterozygousAlternate),
            _ => Err(UnsupportedGenotype(genotype)),
        }
    }
}

/// One called variant (a single line of the variant file).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// Contig name.
    pub contig: Arc<str>,
    /// 1-based position of the first reference base.
    pub position: u64,
    /// Structural type derived from the allele lengths.
    pub kind: StructuralType,
    /// Reference allele (never empty).
    pub reference: Vec<Base>,
    /// Alternate alleles in file order.
    pub alternates: Vec<Vec<Base>>,
    /// Phred-scaled call quality.
    pub quality: f32,
    /// Filter status (`PASS` for confident calls).
    pub filter: String,
    /// Raw INFO column.
    pub info: String,
    /// Genotype, always normalised to a pair.
    pub genotype: Genotype,
    /// Raw per-genotype likelihoods following the genotype in the sample column.
    pub likelihoods: String,
}

impl VariantRecord {
    /// Allele sequence for a genotype index.
    pub fn allele(&self, index: usize) -> Option<&[Base]> {
        match index {
            0 => Some(&self.reference),
            n => self.alternates.get(n - 1).map(Vec::as_slice),
        }
    }

    /// Number of reference positions spanned by the reference allele.
    pub fn reference_span(&self) -> u64 {
        self.reference.len() as u64
    }

    /// Whether the call passed the upstream caller's filters.
    pub fn is_pass(&self) -> bool {
        self.filter == "PASS"
    }

    /// Returns `true` for single-base substitutions.
    pub fn is_snp(&self) -> bool {
        self.kind == StructuralType::Snp
    }
}

/// One emitted position of the consensus sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Locus {
    /// Contig name.
    pub contig: Arc<str>,
    /// 1-based position. Loci produced by one multi-base event share it.
    pub position: u64,
    /// Bases on the first and second strand.
    pub bases: (Base, Base),
    /// Relation to the reference.
    pub relation: RefRelation,
}

impl Locus {
    /// Construct a new locus.
    pub fn new(
        contig: impl Into<Arc<str>>,
        position: u64,
        bases: (Base, Base),
        relation: RefRelation,
    ) -> Self {
        Self {
            contig: contig.into(),
            position,
            bases,
            relation,
        }
    }

    /// Homozygous-reference locus carrying the reference base on both strands.
    pub fn reference(contig: impl Into<Arc<str>>, position: u64, base: Base) -> Self {
        Self::new(
            contig,
            position,
            (base, base),
            RefRelation::HomozygousReference,
        )
    }

    /// Whether this locus differs from the reference.
    pub fn is_variant(&self) -> bool {
        self.relation != RefRelation::HomozygousReference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn seq(text: &str) -> Vec<Base> {
        Base::parse_sequence(text).unwrap()
    }

    #[test_case("A", &["G"], StructuralType::Snp)]
    #[test_case("A", &["G", "T"], StructuralType::Snp)]
    #[test_case("A", &["AT"], StructuralType::Insertion)]
    #[test_case("A", &["AT", "ATT"], StructuralType::Insertion)]
    #[test_case("ACGT", &["A"], StructuralType::Deletion)]
    #[test_case("AC", &["A", "G"], StructuralType::Deletion)]
    #[test_case("A", &["G", "AT"], StructuralType::Other)]
    #[test_case("AC", &["GT"], StructuralType::Other)]
    fn classifies_by_allele_lengths(reference: &str, alts: &[&str], expected: StructuralType) {
        let alternates: Vec<Vec<Base>> = alts.iter().map(|alt| seq(alt)).collect();
        assert_eq!(StructuralType::classify(&seq(reference), &alternates), expected);
    }

    #[test_case(Genotype(0, 0), RefRelation::HomozygousReference)]
    #[test_case(Genotype(0, 1), RefRelation::HeterozygousReference)]
    #[test_case(Genotype(1, 1), RefRelation::HomozygousAlternate)]
    #[test_case(Genotype(1, 2), RefRelation::HeterozygousAlternate)]
    #[test_case(Genotype(2, 2), RefRelation::HomozygousAlternate)]
    fn maps_known_genotypes(genotype: Genotype, expected: RefRelation) {
        assert_eq!(RefRelation::from_genotype(genotype), Ok(expected));
    }

    #[test_case(Genotype(1, 0))]
    #[test_case(Genotype(0, 2))]
    #[test_case(Genotype(2, 1))]
    #[test_case(Genotype(3, 3))]
    fn rejects_unknown_genotypes(genotype: Genotype) {
        assert_eq!(
            RefRelation::from_genotype(genotype),
            Err(UnsupportedGenotype(genotype))
        );
    }

    #[test]
    fn allele_lookup_indexes_reference_then_alternates() {
        let record = VariantRecord {
            contig: Arc::from("chr1"),
            position: 10,
            kind: StructuralType::Snp,
            reference: seq("A"),
            alternates: vec![seq("G"), seq("T")],
            quality: 50.0,
            filter: "PASS".to_string(),
            info: ".".to_string(),
            genotype: Genotype(1, 2),
            likelihoods: String::new(),
        };
        assert_eq!(record.allele(0), Some(&[Base::A][..]));
        assert_eq!(record.allele(2), Some(&[Base::T][..]));
        assert_eq!(record.allele(3), None);
        assert!(record.is_pass());
        assert!(record.is_snp());
    }
}
