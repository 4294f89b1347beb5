//! Scheduler 单元测试
//!
//! 测试任务链、运行器排空和同步原语


use std::sync::Arc;

use crate::runtime::scheduler::{CurrentThreadAsyncRunner, RunnerRef};

/// Fresh cooperative runner behind a shared handle.
pub(super) fn runner() -> RunnerRef {
    Arc::new(CurrentThreadAsyncRunner::new())
}
