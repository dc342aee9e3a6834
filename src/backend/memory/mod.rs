// src/backend/memory/mod.rs

//! In-memory backend implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `TransportHandle` trait. It is intended primarily for testing, local
//! execution, and as a reference for delivery semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory backend defines the **reference behavior** for the
//! transport layer. All other backend implementations are expected to
//! approximate this behavior as closely as their underlying systems allow
//! and to document any unavoidable deviations.
//!
//! In particular, the in-memory backend establishes the following
//! expectations:
//!
//! - Once `subscribe()` returns successfully, messages published *after*
//!   that point and matching the subscription are deliverable.
//! - Exact channels match by string equality; pattern channels match by
//!   glob, with `*` crossing any separator character.
//! - A handle registered for both an exact channel and a pattern matching
//!   it receives the message once per registration, mirroring how Redis
//!   delivers overlapping `SUBSCRIBE` and `PSUBSCRIBE` registrations.
//! - Message delivery is deterministic within a single process.
//!
//! ## Non-Goals
//!
//! This backend does not attempt to emulate the failure modes, persistence,
//! or delivery guarantees of any specific broker. It exists to provide a
//! clear, deterministic baseline against which higher-level behavior can be
//! validated.

mod broker;
mod connector;
mod handle;

pub use broker::MemoryBroker;
pub use connector::{create_memory_connector, create_memory_connector_with_broker};
