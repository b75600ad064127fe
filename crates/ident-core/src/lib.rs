//! # ident-core — Foundational Types for the ident Service
//!
//! Defines the record types the label-driven state engine operates on.
//! Every other crate in the workspace depends on `ident-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated label primitives.** `LabelKey` and `LabelValue` normalize
//!    and validate at construction. A label that exists is well-formed.
//!
//! 2. **Newtype identifiers.** `AccountId`, `LabelId` and `Uid` cannot be
//!    confused with one another or with bare strings.
//!
//! 3. **Closed scope set.** `LabelScope` has exactly two variants; only
//!    `Private` labels feed the state engine.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ident-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod account;
pub mod error;
pub mod identity;
pub mod label;

pub use account::{Account, DEFAULT_LEVEL, DEFAULT_ROLE, DEFAULT_STATE};
pub use error::ValidationError;
pub use identity::{AccountId, LabelId, Uid};
pub use label::{normalize, Label, LabelKey, LabelScope, LabelValue};
