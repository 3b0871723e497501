//! Option chains and contract resolution

pub mod resolver;
pub mod types;

pub use resolver::ContractResolver;
pub use types::{ContractSelection, OptionChain, OptionContract};
