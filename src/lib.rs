//! Card Badge Library
//!
//! This module exposes the cache, badge client, page adapter, renderer and
//! page-load sequence for use by the binary and integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod page;
pub mod ui;
