//! Core types shared by the library and the command line tool
//!
//! The library reports failures through the error enum of each component.
//! This module gathers them into [`UpdaterError`] and turns any error into an
//! [`ErrorContext`] with details and a suggestion for the user.
//!
//! # Modules
//!
//! ## `error`
//!
//! - [`UpdaterError`] - every failure the tool can report
//! - [`ErrorContext`] - an error with user-facing details and suggestion
//! - [`user_friendly_error`] - convert any [`anyhow::Error`] for display

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
