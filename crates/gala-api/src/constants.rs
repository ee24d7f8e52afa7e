//! API constants
//!
//! Route groups and the OpenAPI spec build their paths from these so the
//! version prefix stays in one place.

#![allow(dead_code)]

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Versioned API prefix. All resource routes live under this.
pub const API_PREFIX: &str = "/api/v0";

/// Maximum number of files accepted in a single upload batch.
pub const MAX_UPLOAD_FILES_PER_BATCH: usize = 100;

/// How many face rows a similarity search fetches before grouping by image.
/// Several faces of the same person can match in one image, so this must be
/// larger than the number of result images a search can return.
pub const SEARCH_CANDIDATE_LIMIT: i64 = 1000;
