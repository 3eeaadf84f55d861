//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`prompts`] - Interactive prompts and confirmations
//! - [`editor`] - Plan editing, interactive or scripted
//!
//! # Design
//!
//! All output and prompts go through this module to ensure consistent
//! formatting and proper handling of interactive vs non-interactive modes.

pub mod editor;
pub mod output;
pub mod prompts;
