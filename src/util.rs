use std::backtrace::Backtrace;
use itertools::Itertools;
use rocket::http::Status;
use rocket::response::status::Custom;

pub(crate) fn status_sqlx_error(err: sqlx::Error) -> Custom<String> {
    error!("SQL Error: {err}\nbacktrace: {}", Backtrace::capture());
    Custom(Status::InternalServerError, format!("SQLx error: {}", err))
}
pub(crate) fn status_any_error(err: anyhow::Error) -> Custom<String> {
    error!("Error: {err}\nbacktrace: {}", Backtrace::capture());
    Custom(Status::InternalServerError, format!("Error: {}", err))
}
pub(crate) fn status_not_found(what: &str) -> Custom<String> {
    Custom(Status::NotFound, format!("Not found: {what}"))
}

/// Collapses every whitespace run to one space and trims the ends.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().join(" ")
}

#[test]
fn test_normalize_ws() {
    assert_eq!(normalize_ws("  Lincoln \n\t HS  "), "Lincoln HS");
    assert_eq!(normalize_ws(" \n "), "");
}
