//! Template Cloning Engine for Studio pages.
//!
//! Studio pages live in a relational store: components, properties, event
//! triggers, and named query definitions are rows, not files. This crate
//! duplicates an entire template page into a target page through a resumable
//! multi-step session: load hierarchy, clone components (remapping
//! auto-generated ids), clone props, clone query definitions, clone triggers,
//! then commit.

pub mod clone;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod sql;
pub mod tokens;
pub mod types;
