use thiserror::Error;

/// Hard failures that abort a compilation outright. Soft, recoverable
/// problems (unknown commands, bad notes, out-of-range indices, ...) never
/// construct one of these; they go through `Diagnostics` instead and the
/// compiler continues.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unterminated group(s) at end of input, {0} still open")]
    UnterminatedGroups(usize),
    #[error("group close with no matching group open at line {0}")]
    UnbalancedGroupClose(i32),
    #[error("group-jump to undefined group {0}")]
    UndefinedGroupNumber(u8),
    #[error("failed to read wave file {path}: {source}")]
    WaveRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sample attribute: {0}")]
    InvalidSampleAttr(String),
}

pub type CompileResult<T> = Result<T, CompileError>;
