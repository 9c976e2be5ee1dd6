//! Factor Flow: the message-operator catalogue.
//!
//! One module per factor kind. Each module exposes the subset of the
//! operator contract that applies to its factor:
//!
//! - `log_average_factor` / `log_evidence_ratio` / `average_log_factor`
//!   for evidence,
//! - `<arg>_average_conditional` for EP messages,
//! - `<arg>_average_logarithm` for VMP messages,
//! - `<arg>_max_conditional` for max-product messages,
//! - buffer `init` / `update` where the factor keeps auxiliary state.
//!
//! Operators are pure functions (or caller-serialized buffer updates);
//! scheduling, model compilation and message storage live outside this
//! crate.

pub mod boolean;
pub mod copy;
pub mod damping;
pub mod equal;
pub mod gather;
pub mod index_of_maximum;
pub mod is_between;
pub mod log_odds;
pub mod logistic;
pub mod matrix_vector;
pub mod max_gaussian;
pub mod plus;
pub mod product;
pub mod sparse_list;
pub mod string_format;
