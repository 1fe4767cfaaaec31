// Copyright 2026 Reelscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reelscout library — headless-browser scraping API for movie/series
//! catalog sites.
//!
//! This library crate exposes the core modules for integration testing.

pub mod cache;
pub mod error;
pub mod extract;
pub mod renderer;
pub mod rest;
