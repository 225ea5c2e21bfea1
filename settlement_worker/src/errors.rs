use settlement_engine::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not initialize the worker. {0}")]
    InitializeError(String),
    #[error("Invalid worker configuration. {0}")]
    ConfigurationError(String),
    #[error("An error occurred on the backend. {0}")]
    BackendError(#[from] SettlementError),
    #[error("An I/O error happened in the worker. {0}")]
    IOError(#[from] std::io::Error),
}
