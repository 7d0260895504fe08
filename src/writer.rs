use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Could not write to output file {path}: {message}")]
    CouldNotWrite { path: String, message: String },
}

/// Writes the rendered document verbatim, replacing whatever was at `path`.
/// A failure part way through can leave a truncated file behind.
pub fn write(path: &Path, contents: &str) -> Result<(), Error> {
    let result = File::create(path).and_then(|mut file| {
        file.write_all(contents.as_bytes())?;
        file.flush()
    });

    return match result {
        Ok(_) => {
            debug!(bytes = contents.len(), "wrote {}", path.display());
            Ok(())
        }
        Err(error) => Err(Error::CouldNotWrite {
            path: path.display().to_string(),
            message: error.to_string(),
        }),
    };
}
