use crate::error::CommonError;

/// Result alias for template and data loading
pub type CommonResult<T> = Result<T, CommonError>;
