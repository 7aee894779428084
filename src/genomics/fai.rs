use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Number of tab-separated columns in a sequence index row.
const INDEX_COLUMNS: usize = 5;

/// Byte layout of one contig inside the flat reference file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigLayout {
    /// Contig name.
    pub name: String,
    /// Number of bases in the contig.
    pub length: u64,
    /// Byte offset of the first base.
    pub offset: u64,
    /// Bases on each full line.
    pub bases_per_line: u64,
    /// Bytes on each full line, line terminator included.
    pub bytes_per_line: u64,
}

impl ContigLayout {
    /// Byte offset of the base `bases_before` bases into the contig.
    pub fn byte_offset(&self, bases_before: u64) -> u64 {
        self.offset
            + (bases_before / self.bases_per_line) * self.bytes_per_line
            + bases_before % self.bases_per_line
    }

    /// Byte offset just past the last base of the contig.
    pub fn end_offset(&self) -> u64 {
        match self.length {
            0 => self.offset,
            len => self.byte_offset(len - 1) + 1,
        }
    }

    /// Check the layout fits in a reference file of `file_size` bytes.
    pub fn validate(&self, file_size: u64) -> Result<(), IndexError> {
        let required = self.end_offset();
        if required > file_size {
            return Err(IndexError::LayoutOutOfBounds {
                contig: self.name.clone(),
                required,
                file_size,
            });
        }
        Ok(())
    }
}

/// Errors raised while loading a sequence index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be opened or read.
    #[error("failed to read sequence index {path}: {source}")]
    Open {
        /// Path of the index file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading rows failed part-way through.
    #[error("failed to read sequence index: {0}")]
    Read(#[from] io::Error),
    /// A row could not be parsed.
    #[error("malformed index row {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },
    /// The declared layout extends past the end of the reference file.
    #[error("contig {contig} needs {required} bytes but the reference has {file_size}")]
    LayoutOutOfBounds {
        /// Contig whose layout is invalid.
        contig: String,
        /// Byte offset required by the layout.
        required: u64,
        /// Size of the reference file.
        file_size: u64,
    },
}

/// Lookup table from contig name to [`ContigLayout`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    layouts: HashMap<String, ContigLayout>,
}

impl ReferenceIndex {
    /// Load the layouts of `wanted` contigs from an index file.
    pub fn load<P, S>(path: P, wanted: &[S]) -> Result<Self, IndexError>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), |name| {
            wanted.iter().any(|contig| contig.as_ref() == name)
        })
    }

    /// Load every contig listed in an index file.
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), |_| true)
    }

    /// Parse index rows from any buffered reader, keeping rows accepted by `keep`.
    ///
    /// Every non-empty row is validated, kept or not.
    pub fn from_reader<R, F>(reader: R, keep: F) -> Result<Self, IndexError>
    where
        R: BufRead,
        F: Fn(&str) -> bool,
    {
        let mut layouts = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let layout = parse_row(line.trim_end(), line_no + 1)?;
            if keep(&layout.name) {
                debug!(contig = %layout.name, length = layout.length, "loaded contig layout");
                layouts.insert(layout.name.clone(), layout);
            }
        }

        Ok(Self { layouts })
    }

    /// Layout for a contig.
    pub fn get(&self, contig: &str) -> Option<&ContigLayout> {
        self.layouts.get(contig)
    }

    /// Number of loaded contigs.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns `true` when no contig was loaded.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Iterate over loaded layouts, ordered by byte offset.
    pub fn layouts(&self) -> Vec<&ContigLayout> {
        let mut layouts: Vec<&ContigLayout> = self.layouts.values().collect();
        layouts.sort_by_key(|layout| layout.offset);
        layouts
    }

    /// Validate every layout against the reference file size.
    pub fn validate(&self, file_size: u64) -> Result<(), IndexError> {
        self.layouts
            .values()
            .try_for_each(|layout| layout.validate(file_size))
    }
}

fn parse_row(line: &str, line_no: usize) -> Result<ContigLayout, IndexError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != INDEX_COLUMNS {
        return Err(IndexError::Malformed {
            line: line_no,
            reason: format!("expected {INDEX_COLUMNS} columns, found {}", fields.len()),
        });
    }

    let number = |idx: usize, what: &str| -> Result<u64, IndexError> {
        fields[idx].parse().map_err(|_| IndexError::Malformed {
            line: line_no,
            reason: format!("invalid {what} '{}'", fields[idx]),
        })
    };

    let layout = ContigLayout {
        name: fields[0].to_string(),
        length: number(1, "length")?,
        offset: number(2, "offset")?,
        bases_per_line: number(3, "bases per line")?,
        bytes_per_line: number(4, "bytes per line")?,
    };

    if layout.bases_per_line == 0 || layout.bytes_per_line < layout.bases_per_line {
        return Err(IndexError::Malformed {
            line: line_no,
            reason: format!(
                "line width {} bases / {} bytes is inconsistent",
                layout.bases_per_line, layout.bytes_per_line
            ),
        });
    }

    Ok(layout)
}
