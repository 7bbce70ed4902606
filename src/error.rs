use std::result::Result as StdResult;

pub use crate::net::errors::{Disconnect, NetworkError};

pub type Result<T> = StdResult<T, NetworkError>;
