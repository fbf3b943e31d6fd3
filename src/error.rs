use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bounded queue capacity must be at least 1")]
    ZeroCapacity,
}
