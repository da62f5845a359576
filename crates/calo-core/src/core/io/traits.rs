use crate::core::table::ResultTable;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Defines the interface for reading and writing result tables in a file format.
///
/// Implementors handle format-specific encoding; the provided path-based methods add
/// the all-or-nothing write semantics shared by every format.
pub trait TableFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Writes a table to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be represented in the format or the
    /// writer fails.
    fn write_to<W: Write + Send>(table: &ResultTable, writer: W) -> Result<(), Self::Error>;

    /// Reads a table from an open file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a valid table in this format.
    fn read_from(file: File) -> Result<ResultTable, Self::Error>;

    /// Reads a table from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ResultTable, Self::Error> {
        let file = File::open(path)?;
        Self::read_from(file)
    }

    /// Writes a table to `path` atomically.
    ///
    /// The table is first written to a hidden sibling file which is renamed over
    /// `path` once complete. On failure the partial file is removed and `path` is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding, writing or the final rename fails.
    fn write_to_path<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<(), Self::Error> {
        let path = path.as_ref();
        let partial = partial_path(path);

        let result = (|| -> Result<(), Self::Error> {
            let file = File::create(&partial)?;
            let mut writer = BufWriter::new(file);
            Self::write_to(table, &mut writer)?;
            let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
            file.sync_all()?;
            fs::rename(&partial, path)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                debug!(path = %path.display(), rows = table.num_rows(), "Table written.");
                Ok(())
            }
            Err(e) => {
                if partial.exists() {
                    if let Err(cleanup) = fs::remove_file(&partial) {
                        warn!(
                            path = %partial.display(),
                            "Failed to remove partial table file: {}", cleanup
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!(".{}.partial", file_name))
}
