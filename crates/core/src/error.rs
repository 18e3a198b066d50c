use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("input file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("input file contains no records: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("no CSV files found in: {}", .0.display())]
    NoCsvFiles(PathBuf),

    #[error("no TXT files found in: {}", .0.display())]
    NoTxtFiles(PathBuf),

    #[error("no `Tags of` line found in: {}", .0.display())]
    NoReferencedFile(PathBuf),

    #[error("referenced file does not exist: {}", .0.display())]
    ReferencedFileMissing(PathBuf),

    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
