// src/backend/redis/mod.rs

//! Redis Pub/Sub backend implementation.
//!
//! This module provides an implementation of the `TransportHandle` trait
//! backed by Redis Pub/Sub via the `redis` crate.
//!
//! Exact channels map onto `SUBSCRIBE`, pattern channels onto
//! `PSUBSCRIBE`; matching happens server-side with Redis glob semantics,
//! which agree with the in-memory backend's reference semantics.

mod connector;
mod handle;

pub use connector::create_redis_connector;
