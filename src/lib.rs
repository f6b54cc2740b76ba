//! This library crate contains everything needed to relay notifications between users.
//!
//! Submodules have been introduced to split responsibilities. Each module has a specific focus
//! and they together form a chain of dependencies from the low-level [`library`], over the notification [`domain`]
//! specific types, through the executable [`harness`], up to the high-level [`modules`](module) which
//! expose the producing and consuming side of the system.

#![deny(missing_docs)]
#![allow(clippy::nonstandard_macro_braces)]

pub mod constants;
pub mod domain;
pub mod harness;
pub mod library;
pub mod module;
