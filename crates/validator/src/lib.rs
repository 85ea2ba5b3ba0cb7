// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Output validator (component C): a JSON-Schema subset for structured
//! task outputs, and the size cap every delivered document is checked
//! against. The markdown section conventions this validates against
//! (Output Schema / Output Validation Retry Info) are parsed and rendered
//! by `crewly-engine`'s `task` module, which owns the task file format end
//! to end; this crate only judges the `Value` payload extracted from it.

pub mod schema;
pub mod size;

pub use schema::{validate_against_schema, SchemaError};
pub use size::{validate_size, SizeError, DEFAULT_MAX_BYTES};

use thiserror::Error;

/// Umbrella error covering every validation concern this crate checks.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("document too large: {0}")]
    Size(#[from] SizeError),
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaError),
}
