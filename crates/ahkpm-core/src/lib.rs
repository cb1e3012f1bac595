#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

//! Core of ahkpm, a git-based package manager for AutoHotkey.
//!
//! Resolves `ahkpm.json` dependencies into a pinned tree, keeps it in
//! `ahkpm.lock`, and materialises it under `ahkpm-modules`.

pub mod config;
pub mod error;
pub mod paths;
pub mod pkg;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use version::VERSION;
