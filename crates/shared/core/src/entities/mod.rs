mod operation;
mod result;

pub use operation::Operation;
pub use result::OperationResult;
