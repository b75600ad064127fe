//! # ident-policy — Rule Configuration for the State Engine
//!
//! The rule set that maps an account's private labels to a lifecycle state
//! and a trust level is supplied from outside the engine. This crate turns
//! that external configuration into typed, validated values.
//!
//! ## Architecture
//!
//! - **Config** (`config.rs`): [`PolicyConfig`] parsed once from YAML with
//!   declaration order preserved and every key/value validated with the
//!   same rules that apply to labels.
//!
//! - **Rules** (`rules.rs`): the generic [`RuleSet`] shape shared by state
//!   and level resolution. ALL rules require exact key/value pairs; ANY
//!   rules require the presence of one key from a list.
//!
//! - **Source** (`source.rs`): the [`PolicySource`] collaborator, consulted
//!   fresh on every recomputation. [`StaticPolicySource`] holds an in-process
//!   configuration; [`FilePolicySource`] re-reads a YAML file per load.

pub mod config;
pub mod error;
pub mod rules;
pub mod source;

pub use config::{LevelRule, PolicyConfig, Requirement, StateTrigger, ACTIVE_STATE};
pub use error::PolicyError;
pub use rules::{Rule, RuleSet};
pub use source::{FilePolicySource, PolicySource, StaticPolicySource, POLICY_PATH_ENV};
