pub mod definition;
pub mod expression;

pub use definition::*;
pub use expression::*;
