use std::fmt;

/// Nucleotide symbol carried by a reference position or a variant allele.
///
/// Covers the four canonical bases, the "any" symbol `N`, an explicit
/// missing symbol used to pad unequal allele lengths, and the IUPAC
/// ambiguity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Base {
    /// Any base (`N`).
    N,
    /// Adenine.
    A,
    /// Cytosine.
    C,
    /// Thymine.
    T,
    /// Guanine.
    G,
    /// No base present (padding for the shorter allele of an indel).
    Missing,
    /// G or A.
    R,
    /// T or C.
    Y,
    /// G or T.
    K,
    /// A or C.
    M,
    /// G or C.
    S,
    /// A or T.
    W,
    /// G, T or C.
    B,
    /// G, A or T.
    D,
    /// A, C or T.
    H,
    /// G, C or A.
    V,
}

impl Base {
    /// Parse an ASCII symbol (case-insensitive).
    ///
    /// The missing symbol has no textual form in input files and is never
    /// produced here.
    pub fn from_ascii(symbol: u8) -> Option<Self> {
        let base = match symbol.to_ascii_uppercase() {
            b'N' => Base::N,
            b'A' => Base::A,
            b'C' => Base::C,
            b'T' => Base::T,
            b'G' => Base::G,
            b'R' => Base::R,
            b'Y' => Base::Y,
            b'K' => Base::K,
            b'M' => Base::M,
            b'S' => Base::S,
            b'W' => Base::W,
            b'B' => Base::B,
            b'D' => Base::D,
            b'H' => Base::H,
            b'V' => Base::V,
            _ => return None,
        };
        Some(base)
    }

    /// Decode a whole allele string into bases.
    pub fn parse_sequence(text: &str) -> Option<Vec<Self>> {
        if text.is_empty() {
            return None;
        }
        text.bytes().map(Self::from_ascii).collect()
    }

    /// Uppercase symbol for display. The missing base renders as `-`.
    pub fn as_char(self) -> char {
        match self {
            Base::N => 'N',
            Base::A => 'A',
            Base::C => 'C',
            Base::T => 'T',
            Base::G => 'G',
            Base::Missing => '-',
            Base::R => 'R',
            Base::Y => 'Y',
            Base::K => 'K',
            Base::M => 'M',
            Base::S => 'S',
            Base::W => 'W',
            Base::B => 'B',
            Base::D => 'D',
            Base::H => 'H',
            Base::V => 'V',
        }
    }

    /// Base on the opposite strand.
    pub fn complement(self) -> Self {
        match self {
            Base::A => Base::T,
            Base::T => Base::A,
            Base::C => Base::G,
            Base::G => Base::C,
            Base::R => Base::Y,
            Base::Y => Base::R,
            Base::K => Base::M,
            Base::M => Base::K,
            Base::B => Base::V,
            Base::V => Base::B,
            Base::D => Base::H,
            Base::H => Base::D,
            Base::N | Base::Missing | Base::S | Base::W => self,
        }
    }

    /// Returns `true` for A, C, G and T.
    pub fn is_canonical(self) -> bool {
        matches!(self, Base::A | Base::C | Base::G | Base::T)
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
