//! # SkillStore Storage
//!
//! Durable file primitives for SkillStore.
//!
//! This crate provides the lowest-level building blocks the dataset engine
//! relies on. Like a byte store, it never interprets what it writes: callers
//! hand it serialized bytes and paths.
//!
//! ## Primitives
//!
//! - [`atomic_write`] - temp file + fsync + rename, so readers never observe
//!   a half-written file
//! - [`copy_if_exists`] - durable copy that skips missing sources
//! - [`append_line`] - synced append of one newline-terminated line
//! - [`FileLock`] - cross-process advisory lock represented by the existence
//!   of an exclusively created file
//!
//! ## Example
//!
//! ```rust
//! use skillstore_storage::{atomic_write, FileLock, LockPolicy};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let target = dir.path().join("records.json");
//!
//! let _guard = FileLock::acquire(&dir.path().join(".lock"), "users", &LockPolicy::default()).unwrap();
//! atomic_write(&target, b"{}").unwrap();
//! assert_eq!(std::fs::read(&target).unwrap(), b"{}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod append;
mod atomic;
mod error;
mod lock;

pub use append::append_line;
pub use atomic::{atomic_write, copy_if_exists, remove_if_exists, temp_path};
pub use error::{StorageError, StorageResult};
pub use lock::{FileLock, LockPolicy};
