pub mod enums;
pub mod knowledge;
pub mod raw;

pub use knowledge::*;
pub use raw::*;
