//! Helpers for building SQLite statements.

/// Maximum number of bound values per `IN (...)` list.
///
/// SQLite limits the number of parameters per statement (999 on older
/// builds), so identifier lists are split into chunks of this size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits `items` into chunks that fit in one `IN (...)` list.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// `?, ?, ?` with `count` placeholders.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Decimal stored as text, without trailing zeros.
pub fn decimal_to_db(value: rust_decimal::Decimal) -> String {
    value.normalize().to_string()
}
