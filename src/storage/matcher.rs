//! Case-insensitive literal substring matching on hunter names
//!
//! Lookups are registered as a SQL function, `name_contains(fragment, name)`,
//! so a store can find and mutate the first match in a single statement.
//! The fragment is escaped before compilation: caller text never acts as a
//! pattern.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Compile a fragment into a case-insensitive literal pattern.
fn fragment_pattern(fragment: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(fragment))
        .case_insensitive(true)
        .build()
}

/// Install `name_contains` on a connection. The compiled pattern is cached
/// per statement since the fragment argument is constant across rows.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "name_contains",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |fragment| -> Result<_, BoxError> {
                Ok(fragment_pattern(fragment.as_str()?)?)
            })?;

            // Documents without a textual name never match
            let matched = match ctx.get_raw(1) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|name| pattern.is_match(name))
                    .unwrap_or(false),
                _ => false,
            };
            Ok(matched)
        },
    )
}
