//! Error types and result definitions for the recdb workspace.
//!
//! This crate provides the unified error type ([`Error`]) and result type alias
//! ([`Result<T>`]) used by every recdb crate, together with the stable
//! [`ErrorCategory`] codes and the [`Notice`] type used for non-fatal reports.
//!
//! # Error Categories
//!
//! - **Data format errors** ([`Error::Arrow`]): cursor batches and value rendering
//! - **User input errors** ([`Error::InvalidArgumentError`]): malformed requests and plans
//! - **Catalog errors** ([`Error::CatalogError`]): missing or duplicate tables
//! - **Constraint violations** ([`Error::ConstraintError`]): NOT NULL and primary keys
//! - **Transaction errors** ([`Error::TransactionContextError`]): savepoints, open cursors
//! - **Recommender errors**: unknown recommenders, unknown methods, read-only sessions
//! - **Internal errors** ([`Error::Internal`]): bugs or unexpected states

pub mod error;
pub mod notice;
pub mod result;

pub use error::{Error, ErrorCategory};
pub use notice::{Notice, NoticeLevel};
pub use result::Result;
