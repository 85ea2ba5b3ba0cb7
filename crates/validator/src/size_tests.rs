// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    under_limit = { "short", 10, true },
    at_limit = { "exact", 5, true },
    over_limit = { "too long for this", 5, false },
)]
fn size_check(content: &str, limit: usize, expect_ok: bool) {
    assert_eq!(validate_size(content, limit).is_ok(), expect_ok);
}

#[test]
fn error_reports_actual_and_limit() {
    let err = validate_size("0123456789", 4).unwrap_err();
    assert_eq!(err.actual, 10);
    assert_eq!(err.limit, 4);
}
