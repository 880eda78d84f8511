// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.
#![deny(unused_crate_dependencies)]

//! Cache records and the client interface towards the cache store.
//!
//! The cache itself is an external service; the engine only depends on the
//! [`CacheClient`] trait. Every operation is scoped by device and by one of
//! the four [`Store`]s.

pub mod client;
pub mod update;

pub use self::client::{CacheClient, CacheClientBound, CacheError, CacheOpts, Store};
pub use self::update::{Update, UpdateSlice, UpdateValueError};
