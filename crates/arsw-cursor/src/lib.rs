//! Cursor execution engine over SQLite: multi-statement batches, positional
//! and named bindings, bulk execution, and trace hooks.

mod binder;
mod bindings;
mod cache;
mod config;
mod connection;
mod cursor;
mod error;
mod statement;
mod trace;
mod value;

pub use arsw_sqlite_ffi::ffi;

pub use bindings::{Bindings, NamedValues, TracedBindings};
pub use cache::CacheStats;
pub use config::{Config, DEFAULT_STATEMENT_CACHE_SIZE, MAX_VALUE_LENGTH, MissingNamed, OpenMode};
pub use connection::Connection;
pub use cursor::{BindingsSource, Cursor, Rows};
pub use error::{Error, ErrorKind, Incomplete, Result};
pub use trace::{ExecTrace, RowTrace, exec_trace, row_trace};
pub use value::{ColumnDescription, Row, Value};

pub fn sqlite_lib_version() -> String {
	arsw_sqlite_ffi::sqlite_lib_version()
}

pub fn sqlite_lib_version_number() -> i32 {
	arsw_sqlite_ffi::sqlite_lib_version_number()
}

pub fn sqlite_source_id() -> String {
	arsw_sqlite_ffi::sqlite_source_id()
}

pub fn sqlite_compile_options() -> Vec<String> {
	arsw_sqlite_ffi::sqlite_compile_options()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sqlite_version_number_is_sane() {
		assert!(sqlite_lib_version_number() >= 3_034_001);
		assert!(sqlite_lib_version().starts_with('3'));
	}

	#[test]
	fn types_cross_threads() {
		fn assert_send_sync<T: Send + Sync>() {}
		assert_send_sync::<Connection>();
		assert_send_sync::<Cursor>();
		assert_send_sync::<Bindings>();
	}
}
