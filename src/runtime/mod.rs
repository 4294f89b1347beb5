//! Runtime system
//!
//! This module contains the runner-based task scheduler.

pub mod scheduler;
