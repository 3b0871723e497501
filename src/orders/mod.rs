//! Order pricing, construction and submission
//!
//! # Flow
//!
//! ```text
//! ContractSelection + quotes
//!        │
//!        ▼
//!   pricing::limit_price   (mid, tick schedule, half-to-even)
//!        │
//!        ▼
//!   builder::build_option_order
//!        │
//!        ▼
//!   OrderSubmitter::submit  dry run ──✗──▶ DryRunRejected
//!        │ ✓
//!        ▼
//!   live placement ──errors──▶ Submission
//!        │
//!        ▼
//!   SubmissionReport
//! ```

pub mod builder;
pub mod pricing;
pub mod submit;
pub mod types;

pub use builder::{build_closing_order, build_option_order};
pub use submit::OrderSubmitter;
pub use types::{OrderAction, OrderLeg, PricedOrder, SubmissionReport};
