//! Error type shared by parsing, preprocessing and the solver entry point.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    #[error("infeasible configuration: {centers} centers requested for {nodes} nodes (need 0 < P < N)")]
    InfeasibleConfiguration { centers: usize, nodes: usize },
    #[error("no worker produced a feasible solution")]
    NoFeasibleSolution,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }

    pub fn invalid_instance(message: impl Into<String>) -> Self {
        Self::InvalidInstance(message.into())
    }
}
