//! Core module: the analysis session runtime.
//!
//! This module contains:
//! - `events`: session status, stream event translation, bus topics
//! - `stream`: the SSE connector owning the live subscription
//! - `controller`: the session state machine driving everything

pub mod controller;
pub mod events;
pub mod stream;
