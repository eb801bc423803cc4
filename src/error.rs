#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    #[error("authentication required")]
    NotAuthenticated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type GatehouseResult<T> = Result<T, GatehouseError>;
