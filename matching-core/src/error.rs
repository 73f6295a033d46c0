use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}
