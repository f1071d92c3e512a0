//! HTTP endpoint that kicks off the episode production workflow.
//!
//! `POST /api/trigger` forwards a `workflow_dispatch` call to the CI API and
//! reports the outcome as JSON.

mod dispatch;
mod handler;

pub use dispatch::{DispatchError, WorkflowDispatcher};
pub use handler::{router, serve, TRIGGER_PATH};
