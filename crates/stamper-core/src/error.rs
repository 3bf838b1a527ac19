use crate::stamp::StampId;
use std::path::PathBuf;

/// Errors surfaced by the stamping engine.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("stamp {0} already exists")]
    DuplicateId(StampId),

    #[error("malformed tag line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("not found: {}", display_paths(.paths))]
    NotFound { paths: Vec<PathBuf> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("no free stamp id left")]
    IdsExhausted,
}

impl StampError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse { line, reason: reason.into() }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { paths: vec![path.into()] }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, StampError>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_every_candidate() {
        let err = StampError::NotFound {
            paths: vec![PathBuf::from("shot-orig.png"), PathBuf::from("shot.png")],
        };

        assert_eq!(err.to_string(), "not found: shot-orig.png, shot.png");
    }

    #[test]
    fn parse_error_carries_line_number() {
        let err = StampError::parse(3, "expected 3 fields, found 2");
        assert!(matches!(err, StampError::Parse { line: 3, .. }));
        assert!(err.to_string().contains("line 3"));
    }
}
