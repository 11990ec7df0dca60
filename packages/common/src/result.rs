use crate::error::CommonError;

/// Result alias used across the fleurmod crates
pub type CommonResult<T> = Result<T, CommonError>;
