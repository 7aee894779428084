use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Base, Genotype, StructuralType, VariantRecord};

/// Columns up to and including FORMAT plus one sample column.
const MIN_COLUMNS: usize = 10;

/// Reasons a variant line cannot be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariantParseError {
    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    Encoding,
    /// Fewer columns than a sample-carrying record needs.
    #[error("expected at least {MIN_COLUMNS} columns, found {0}")]
    MissingColumns(usize),
    /// Position is not a positive integer.
    #[error("invalid position '{0}'")]
    InvalidPosition(String),
    /// An allele contains a symbol outside the base alphabet.
    #[error("invalid allele '{0}'")]
    InvalidAllele(String),
    /// Quality is neither a number nor `.`.
    #[error("invalid quality '{0}'")]
    InvalidQuality(String),
    /// Genotype indices could not be decoded.
    #[error("invalid genotype '{0}'")]
    InvalidGenotype(String),
    /// Genotype refers to an allele the record does not have.
    #[error("genotype {genotype} refers past the {alleles} alleles of the record")]
    AlleleOutOfRange {
        /// Decoded genotype.
        genotype: Genotype,
        /// Number of alleles (reference included).
        alleles: usize,
    },
}

/// Decode one tab-separated variant line.
pub fn parse_line(line: &str) -> Result<VariantRecord, VariantParseError> {
    let cols: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if cols.len() < MIN_COLUMNS {
        return Err(VariantParseError::MissingColumns(cols.len()));
    }

    let position = cols[1]
        .parse::<u64>()
        .ok()
        .filter(|&pos| pos >= 1)
        .ok_or_else(|| VariantParseError::InvalidPosition(cols[1].to_string()))?;

    let reference = Base::parse_sequence(cols[3])
        .ok_or_else(|| VariantParseError::InvalidAllele(cols[3].to_string()))?;
    let alternates = cols[4]
        .split(',')
        .map(|alt| {
            Base::parse_sequence(alt).ok_or_else(|| VariantParseError::InvalidAllele(alt.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let quality = match cols[5] {
        "." => 0.0,
        text => text
            .parse::<f32>()
            .map_err(|_| VariantParseError::InvalidQuality(text.to_string()))?,
    };

    let sample = cols[cols.len() - 1];
    let (genotype_text, likelihoods) = sample.split_once(':').unwrap_or((sample, ""));
    let genotype = parse_genotype(genotype_text)?;
    if genotype.max_index() > alternates.len() {
        return Err(VariantParseError::AlleleOutOfRange {
            genotype,
            alleles: alternates.len() + 1,
        });
    }

    Ok(VariantRecord {
        contig: Arc::from(cols[0]),
        position,
        kind: StructuralType::classify(&reference, &alternates),
        reference,
        alternates,
        quality,
        filter: cols[6].to_string(),
        info: cols[7].to_string(),
        genotype,
        likelihoods: likelihoods.to_string(),
    })
}

/// Decode `a/b` (or phased `a|b`). A single index means a single-copy
/// contig and is read as homozygous.
fn parse_genotype(text: &str) -> Result<Genotype, VariantParseError> {
    let invalid = || VariantParseError::InvalidGenotype(text.to_string());
    let indices = text
        .split(|c| c == '/' || c == '|')
        .map(|idx| idx.parse::<usize>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    match indices.as_slice() {
        [single] => Ok(Genotype::homozygous(*single)),
        [first, second] => Ok(Genotype(*first, *second)),
        _ => Err(invalid()),
    }
}

/// Position of a line if it is a record of `contig`.
fn probe_position(line: &[u8], contig: &str) -> Option<u64> {
    let text = std::str::from_utf8(line).ok()?;
    let mut cols = text.split('\t');
    if cols.next()? != contig {
        return None;
    }
    cols.next()?.trim_end().parse().ok()
}

/// Offset of the first line starting at or after `offset`.
fn line_start_at_or_after<R: BufRead + Seek>(
    reader: &mut R,
    offset: u64,
    scratch: &mut Vec<u8>,
) -> io::Result<u64> {
    if offset == 0 {
        return Ok(0);
    }
    reader.seek(SeekFrom::Start(offset - 1))?;
    scratch.clear();
    let read = reader.read_until(b'\n', scratch)?;
    Ok(offset - 1 + read as u64)
}

/// Binary search for the byte offset of the first `contig` record whose
/// position is at least `target`.
///
/// Lines that are not records of `contig` (headers, other contigs, garbage)
/// compare as smaller than `target`, so the file must hold `contig`'s
/// records after anything else. Returns the file length when no record
/// qualifies.
pub fn search_offset<R: BufRead + Seek>(
    reader: &mut R,
    contig: &str,
    target: u64,
) -> io::Result<u64> {
    let mut lower = 0u64;
    let mut upper = reader.seek(SeekFrom::End(0))?;
    let mut line = Vec::new();

    // lower: a line start, every line before it sorts below target.
    // upper: a line start or EOF, every line from it on sorts at or above.
    while lower < upper {
        let mid = lower + (upper - lower) / 2;
        let mut probe = line_start_at_or_after(reader, mid, &mut line)?;
        if probe >= upper {
            // no line starts in [mid, upper): examine the line at lower
            probe = lower;
        }

        reader.seek(SeekFrom::Start(probe))?;
        line.clear();
        let read = reader.read_until(b'\n', &mut line)? as u64;
        if read == 0 {
            upper = probe;
            continue;
        }

        match probe_position(&line, contig) {
            Some(position) if position >= target => upper = probe,
            _ => lower = probe + read,
        }
        debug!(contig, lower, upper, "narrowed variant search");
    }

    Ok(lower)
}

/// Open `path` and locate the first record of `contig` at or after `target`.
pub fn find_first_at_or_after<P: AsRef<Path>>(
    path: P,
    contig: &str,
    target: u64,
) -> io::Result<u64> {
    let path = path.as_ref();
    info!(
        contig,
        target,
        path = %path.display(),
        "searching for next variant"
    );
    let mut reader = BufReader::new(File::open(path)?);
    let offset = search_offset(&mut reader, contig, target)?;
    info!(contig, target, offset, "found next variant offset");
    Ok(offset)
}

/// Forward, lazily parsed stream of one contig's variant records.
///
/// Header lines and other contigs are skipped silently. Malformed lines are
/// logged and skipped. With `require_pass`, records whose filter is not
/// `PASS` are skipped. Fused after an I/O error.
#[derive(Debug)]
pub struct VariantStream<R> {
    reader: R,
    contig: Arc<str>,
    require_pass: bool,
    offset: u64,
    line: Vec<u8>,
    malformed: usize,
    finished: bool,
}

impl VariantStream<BufReader<File>> {
    /// Open `path` and stream records from byte `offset` onwards.
    pub fn open<P: AsRef<Path>>(
        path: P,
        contig: impl Into<Arc<str>>,
        offset: u64,
        require_pass: bool,
    ) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        reader.seek(SeekFrom::Start(offset))?;
        Ok(Self::new(reader, contig, offset, require_pass))
    }

    /// Stream records of `contig` at or after `target`, locating the start by
    /// binary search.
    pub fn from_position<P: AsRef<Path>>(
        path: P,
        contig: impl Into<Arc<str>>,
        target: u64,
        require_pass: bool,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let contig = contig.into();
        let offset = find_first_at_or_after(path, &contig, target)?;
        Self::open(path, contig, offset, require_pass)
    }
}

impl<R: BufRead> VariantStream<R> {
    /// Wrap a reader positioned at byte `offset`.
    pub fn new(reader: R, contig: impl Into<Arc<str>>, offset: u64, require_pass: bool) -> Self {
        Self {
            reader,
            contig: contig.into(),
            require_pass,
            offset,
            line: Vec::new(),
            malformed: 0,
            finished: false,
        }
    }

    /// Number of malformed lines skipped so far.
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    fn decode(&self) -> Option<Result<VariantRecord, VariantParseError>> {
        let line = match std::str::from_utf8(&self.line) {
            Ok(text) => text.trim_end_matches(['\r', '\n']),
            Err(_) => return Some(Err(VariantParseError::Encoding)),
        };
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        if line.split('\t').next() != Some(&*self.contig) {
            return None;
        }
        Some(parse_line(line))
    }
}

impl<R: BufRead> Iterator for VariantStream<R> {
    type Item = io::Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.line.clear();
            let line_offset = self.offset;
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => self.finished = true,
                Ok(read) => {
                    self.offset += read as u64;
                    match self.decode() {
                        None => continue,
                        Some(Ok(record)) if self.require_pass && !record.is_pass() => continue,
                        Some(Ok(mut record)) => {
                            record.contig = Arc::clone(&self.contig);
                            return Some(Ok(record));
                        }
                        Some(Err(err)) => {
                            self.malformed += 1;
                            warn!(
                                contig = %self.contig,
                                offset = line_offset,
                                error = %err,
                                "skipping malformed variant line"
                            );
                        }
                    }
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
