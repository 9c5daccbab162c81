use bio::io::fasta;
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Record '{id}' has an invalid sequence: {message}")]
    InvalidRecord { id: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }
}

impl TryFrom<fasta::Record> for FastaRecord {
    type Error = FastaError;

    fn try_from(record: fasta::Record) -> Result<Self, Self::Error> {
        if let Err(message) = record.check() {
            return Err(FastaError::InvalidRecord {
                id: record.id().to_string(),
                message: message.to_string(),
            });
        }
        let sequence = String::from_utf8(record.seq().to_vec()).map_err(|e| {
            FastaError::InvalidRecord {
                id: record.id().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::new(record.id(), sequence))
    }
}

/// Reads every record of a multi-FASTA stream.
///
/// The identifier is the first whitespace-delimited token of the header;
/// the rest of the header line is discarded.
pub fn read_fasta(reader: impl Read) -> Result<Vec<FastaRecord>, FastaError> {
    fasta::Reader::new(reader)
        .records()
        .map(|record| FastaRecord::try_from(record?))
        .collect()
}

pub fn write_fasta(records: &[FastaRecord], writer: impl Write) -> io::Result<()> {
    let mut writer = fasta::Writer::new(writer);
    for record in records {
        writer.write(&record.id, None, record.sequence.as_bytes())?;
    }
    writer.flush()
}
