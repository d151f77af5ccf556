pub mod site;
pub mod types;

pub use site::*;
pub use types::*;
