//! chainrun
//!
//! Runner-based task scheduling with continuation chaining. Work is scheduled
//! on an [`AsyncRunner`](runtime::scheduler::AsyncRunner), which hands back a
//! task handle; continuations chained on the handle are parked until it
//! completes and then forwarded to the runner they target. Runners are drained
//! explicitly, one at a time, on whatever thread calls `await_all`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chainrun::runtime::scheduler::{AsyncRunner, AsyncRunnerExt, CurrentThreadAsyncRunner, RunnerRef};
//!
//! let runner: RunnerRef = Arc::new(CurrentThreadAsyncRunner::new());
//! let greeting = runner
//!     .schedule(|| "hello")
//!     .then_with(Some(|s: &&str| format!("{}, world", s)))
//!     .unwrap();
//!
//! runner.await_all();
//! assert_eq!(greeting.wait().unwrap(), "hello, world");
//! ```

#![doc(html_root_url = "https://docs.rs/chainrun")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

pub use runtime::scheduler::{
    AsyncAction, AsyncError, AsyncFunction, AsyncResult, AsyncRunner, AsyncRunnerExt, AsyncTask,
    BasicAsyncTask, BlockingSynchronization, CurrentThreadAsyncRunner, RunnerRef, Synchronization,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "chainrun";
