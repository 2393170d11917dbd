use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not find available port in range {start}-{end}")]
    NoFreePort { start: u16, end: u16 },

    #[error("try_bind() must be called before run()")]
    NotBound,

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
