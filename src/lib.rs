//! ghutils - GitHub identity and reference resolution engine
//!
//! This library is the core of a Discord bot that exposes GitHub entities
//! (issues, pull requests, commits) to chat-command users. It provides:
//! - Per-user OAuth credential lifecycle management with an app-installation
//!   fallback identity
//! - Parsing and resolution of short textual references like
//!   `owner/repo#123` and `owner/repo@sha`
//! - Autocomplete suggestions that degrade safely for untrusted input
//! - Count-aware pagination of list endpoints
//!
//! The Discord transport, message rendering, and the OAuth web callback are
//! external collaborators; this crate only defines the contracts they use.

pub mod core;
pub mod error;
pub mod github;

pub use error::{GhUtilsError, Result};
