pub mod error;
pub mod result;
pub mod source;
pub mod visitor;

pub use error::*;
pub use result::*;
pub use source::*;
pub use visitor::*;
