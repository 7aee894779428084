use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::{error, warn};

use super::{Base, ContigLayout};

/// Lazy, position-tagged stream of reference bases for one contig.
///
/// Positions are 1-based and strictly increasing. The stream ends at the
/// contig's declared length, at the next `>` header, or at end of file,
/// whichever comes first. It is fused after an I/O error.
#[derive(Debug)]
pub struct ReferenceReader<R> {
    reader: R,
    contig: Arc<str>,
    length: u64,
    next_position: u64,
    line: Vec<u8>,
    cursor: usize,
    finished: bool,
}

impl ReferenceReader<BufReader<File>> {
    /// Open the reference file and seek directly to `start` (1-based).
    pub fn open<P: AsRef<Path>>(path: P, layout: &ContigLayout, start: u64) -> io::Result<Self> {
        let start = start.max(1);
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(layout.byte_offset(start - 1)))?;
        Ok(Self::new(
            BufReader::new(file),
            layout.name.as_str(),
            layout.length,
            start,
        ))
    }
}

impl<R: BufRead> ReferenceReader<R> {
    /// Wrap a reader already positioned on the base at `start`.
    pub fn new(reader: R, contig: impl Into<Arc<str>>, length: u64, start: u64) -> Self {
        Self {
            reader,
            contig: contig.into(),
            length,
            next_position: start.max(1),
            line: Vec::new(),
            cursor: 0,
            finished: false,
        }
    }

    /// Contig being read.
    pub fn contig(&self) -> &Arc<str> {
        &self.contig
    }

    /// Position the next emitted base will carry.
    pub fn next_position(&self) -> u64 {
        self.next_position
    }

    fn fill_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        self.cursor = 0;
        Ok(self.reader.read_until(b'\n', &mut self.line)? > 0)
    }

    fn truncated(&mut self, cause: &'static str) {
        warn!(
            contig = %self.contig,
            position = self.next_position - 1,
            expected = self.length,
            cause,
            "contig ended prematurely"
        );
        self.finished = true;
    }
}

impl<R: BufRead> Iterator for ReferenceReader<R> {
    type Item = io::Result<(u64, Base)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.next_position > self.length {
                self.finished = true;
                return None;
            }

            if self.cursor >= self.line.len() {
                match self.fill_line() {
                    Ok(true) => continue,
                    Ok(false) => {
                        self.truncated("end of file");
                        return None;
                    }
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                }
            }

            let symbol = self.line[self.cursor];
            self.cursor += 1;

            match symbol {
                b'\n' | b'\r' => continue,
                b'>' => {
                    self.truncated("next contig header");
                    return None;
                }
                _ => match Base::from_ascii(symbol) {
                    Some(base) => {
                        let position = self.next_position;
                        self.next_position += 1;
                        return Some(Ok((position, base)));
                    }
                    None => {
                        error!(
                            contig = %self.contig,
                            position = self.next_position,
                            symbol = %(symbol as char).escape_default(),
                            "invalid character in reference"
                        );
                    }
                },
            }
        }
    }
}
