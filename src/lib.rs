pub use crud_core::*;
pub use crud_macros::*;
