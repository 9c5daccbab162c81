use crate::core::models::structure::StructureRecord;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Options controlling how a structure is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Replace the destination file if it already exists.
    pub overwrite: bool,
    /// Wrap rows in MODEL/ENDMDL sections by model index.
    pub with_models: bool,
    /// Encode residue annotations into the occupancy and temperature-factor columns.
    pub annotations: bool,
}

/// Defines the interface for reading and writing structure file formats.
///
/// This trait provides a common API for structure I/O, supporting reading
/// from and writing to any buffered source. Implementors handle
/// format-specific parsing and serialization.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a structure from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `id` - The identifier given to the parsed structure.
    ///
    /// # Return
    ///
    /// Returns the parsed structure record.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead, id: &str) -> Result<StructureRecord, Self::Error>;

    /// Writes a structure to a writer.
    ///
    /// # Arguments
    ///
    /// * `structure` - The structure to write.
    /// * `options` - Serialization options.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        structure: &StructureRecord,
        options: &WriteOptions,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads a structure from a file path, using the path as its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<StructureRecord, Self::Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, &path.display().to_string())
    }

    /// Writes a structure to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination exists and `options.overwrite` is not
    /// set, or if the file cannot be created or written.
    fn write_to_path<P: AsRef<Path>>(
        structure: &StructureRecord,
        options: &WriteOptions,
        path: P,
    ) -> Result<(), Self::Error> {
        let path = path.as_ref();
        if path.exists() && !options.overwrite {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", path.display()),
            )
            .into());
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(structure, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
