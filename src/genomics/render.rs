use std::io::{self, Write};

use super::{Base, Locus};

/// Which allele of a locus to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    /// First base of the pair.
    #[default]
    First,
    /// Second base of the pair.
    Second,
}

impl Strand {
    /// Base of `locus` on this strand.
    pub fn select(self, locus: &Locus) -> Base {
        match self {
            Strand::First => locus.bases.0,
            Strand::Second => locus.bases.1,
        }
    }
}

/// Character for one locus: lowercase when it matches the reference.
pub fn locus_char(locus: &Locus, strand: Strand, complement: bool) -> char {
    let base = strand.select(locus);
    let base = if complement { base.complement() } else { base };
    if locus.is_variant() {
        base.as_char()
    } else {
        base.as_char().to_ascii_lowercase()
    }
}

/// Write one character per locus, followed by a newline.
pub fn write_consensus<'a, W, I>(
    writer: &mut W,
    loci: I,
    strand: Strand,
    complement: bool,
) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Locus>,
{
    let mut buffer = [0u8; 4];
    for locus in loci {
        let symbol = locus_char(locus, strand, complement);
        writer.write_all(symbol.encode_utf8(&mut buffer).as_bytes())?;
    }
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Render loci into a string (useful for tests and snapshots).
pub fn render_consensus(loci: &[Locus], strand: Strand, complement: bool) -> String {
    loci.iter()
        .map(|locus| locus_char(locus, strand, complement))
        .chain(std::iter::once('\n'))
        .collect()
}
