//! # legalstat-cli: Command-Line Front End
//!
//! Runs one legal-status engine operation per invocation and prints the
//! result as JSON on stdout. State comes from a JSON fixture
//! (see [`fixture`]); office records come from the fixture or, with
//! `--remote-url`, from an HTTP status gateway.
//!
//! ```bash
//! legalstat --fixture portfolio.json sync US11234567B2
//! legalstat --fixture portfolio.json batch US1 EP2 CN3 --write-back
//! legalstat --fixture portfolio.json summary core
//! legalstat map CN 专利权维持
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: success.
//! - `1`: the operation failed (validation, not found, backend error).
//! - `2`: partial success: a batch with failed items, or a reconciliation
//!   whose fix could not be applied.

pub mod args;
pub mod fixture;
pub mod runner;

pub use args::{Cli, Command};
pub use fixture::{Fixture, FixtureState};
pub use runner::{run, Outcome, EXIT_PARTIAL};
