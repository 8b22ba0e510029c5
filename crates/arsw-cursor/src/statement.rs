use core::ffi::{c_int, c_void};
use std::ffi::CStr;
use std::ptr::{NonNull, null, null_mut};

use crate::error::{Error, Result, check_ok, sqlite_error};
use crate::ffi;
use crate::value::{ColumnDescription, Row, Value};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Step {
	Row,
	Done,
}

/// One compiled statement from a batch, plus where the rest of the batch starts.
///
/// Text that compiles to nothing (blank or only comments) has no compiled
/// statement and steps straight to [`Step::Done`].
pub(crate) struct Statement {
	db: NonNull<ffi::Sqlite3>,
	raw: Option<NonNull<ffi::Sqlite3Stmt>>,
	query: String,
	consumed: usize,
	next: Option<usize>,
}

// The connection is opened in serialized mode, so a statement may be stepped
// from whichever thread currently holds the owning cursor.
unsafe impl Send for Statement {}

impl Statement {
	pub(crate) fn prepare(db: NonNull<ffi::Sqlite3>, query: &str) -> Result<Self> {
		if query.contains('\0') {
			return Err(Error::NulInSql);
		}
		let len = c_int::try_from(query.len()).map_err(|_| Error::Sqlite {
			code: ffi::SQLITE_TOOBIG,
			message: "SQL text is too long".to_string(),
		})?;

		let mut stmt: *mut ffi::Sqlite3Stmt = null_mut();
		let mut tail: *const core::ffi::c_char = null();
		let code = unsafe {
			ffi::sqlite3_prepare_v3(
				db.as_ptr(),
				query.as_ptr().cast(),
				len,
				0,
				&raw mut stmt,
				&raw mut tail,
			)
		};
		if code != ffi::SQLITE_OK {
			if !stmt.is_null() {
				let _ = unsafe { ffi::sqlite3_finalize(stmt) };
			}
			return Err(sqlite_error(db.as_ptr(), code));
		}

		let consumed = if tail.is_null() {
			query.len()
		} else {
			(tail as usize).saturating_sub(query.as_ptr() as usize).min(query.len())
		};
		let next = query
			.get(consumed..)
			.and_then(remaining_sql)
			.map(|rest| query.len() - rest.len());

		Ok(Self { db, raw: NonNull::new(stmt), query: query.to_string(), consumed, next })
	}

	/// The full text this handle was prepared from.
	pub(crate) fn query(&self) -> &str {
		&self.query
	}

	/// The text of this statement alone.
	pub(crate) fn sql(&self) -> &str {
		self.query.get(..self.consumed).unwrap_or(&self.query).trim()
	}

	pub(crate) fn next_sql(&self) -> Option<&str> {
		self.next.and_then(|offset| self.query.get(offset..))
	}

	pub(crate) const fn has_next(&self) -> bool {
		self.next.is_some()
	}

	pub(crate) const fn is_compiled(&self) -> bool {
		self.raw.is_some()
	}

	pub(crate) const fn db(&self) -> *mut ffi::Sqlite3 {
		self.db.as_ptr()
	}

	pub(crate) fn parameter_count(&self) -> usize {
		let Some(stmt) = self.raw else {
			return 0;
		};
		let n = unsafe { ffi::sqlite3_bind_parameter_count(stmt.as_ptr()) };
		usize::try_from(n).unwrap_or_default()
	}

	/// Declared name of the 1-based parameter, marker character included.
	pub(crate) fn parameter_name(&self, index: usize) -> Option<String> {
		let stmt = self.raw?;
		let index = c_int::try_from(index).ok()?;
		let ptr = unsafe { ffi::sqlite3_bind_parameter_name(stmt.as_ptr(), index) };
		if ptr.is_null() {
			None
		} else {
			Some(unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() })
		}
	}

	fn raw_for_bind(&self, index: usize) -> Result<(*mut ffi::Sqlite3Stmt, c_int)> {
		let stmt = self.raw.ok_or_else(|| Error::Sqlite {
			code: ffi::SQLITE_RANGE,
			message: "statement has no parameters".to_string(),
		})?;
		let index = c_int::try_from(index).map_err(|_| Error::Sqlite {
			code: ffi::SQLITE_RANGE,
			message: "binding index did not fit in c_int".to_string(),
		})?;
		Ok((stmt.as_ptr(), index))
	}

	pub(crate) fn bind_null(&mut self, index: usize) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe { ffi::sqlite3_bind_null(stmt, index) };
		check_ok(self.db(), code)
	}

	pub(crate) fn bind_i64(&mut self, index: usize, value: i64) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe { ffi::sqlite3_bind_int64(stmt, index, value) };
		check_ok(self.db(), code)
	}

	pub(crate) fn bind_f64(&mut self, index: usize, value: f64) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe { ffi::sqlite3_bind_double(stmt, index, value) };
		check_ok(self.db(), code)
	}

	pub(crate) fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe {
			ffi::sqlite3_bind_text64(
				stmt,
				index,
				value.as_ptr().cast(),
				value.len() as u64,
				Some(sqlite_transient()),
				ffi::SQLITE_UTF8,
			)
		};
		check_ok(self.db(), code)
	}

	pub(crate) fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe {
			ffi::sqlite3_bind_blob64(
				stmt,
				index,
				value.as_ptr().cast(),
				value.len() as u64,
				Some(sqlite_transient()),
			)
		};
		check_ok(self.db(), code)
	}

	pub(crate) fn bind_zeroblob(&mut self, index: usize, length: u64) -> Result<()> {
		let (stmt, index) = self.raw_for_bind(index)?;
		let code = unsafe { ffi::sqlite3_bind_zeroblob64(stmt, index, length) };
		check_ok(self.db(), code)
	}

	pub(crate) fn step(&mut self) -> Result<Step> {
		let Some(stmt) = self.raw else {
			return Ok(Step::Done);
		};
		let code = unsafe { ffi::sqlite3_step(stmt.as_ptr()) };
		match code {
			ffi::SQLITE_ROW => Ok(Step::Row),
			ffi::SQLITE_DONE => Ok(Step::Done),
			_ => Err(sqlite_error(self.db(), code)),
		}
	}

	/// Rewinds the statement and drops its bindings. Returns the status of the
	/// last step, so a failed run reports its error here as well.
	pub(crate) fn reset(&mut self) -> Result<()> {
		let Some(stmt) = self.raw else {
			return Ok(());
		};
		let code = unsafe { ffi::sqlite3_reset(stmt.as_ptr()) };
		let _ = unsafe { ffi::sqlite3_clear_bindings(stmt.as_ptr()) };
		check_ok(self.db(), code)
	}

	pub(crate) fn column_count(&self) -> usize {
		let Some(stmt) = self.raw else {
			return 0;
		};
		let n = unsafe { ffi::sqlite3_column_count(stmt.as_ptr()) };
		usize::try_from(n).unwrap_or_default()
	}

	fn data_count(&self) -> usize {
		let Some(stmt) = self.raw else {
			return 0;
		};
		let n = unsafe { ffi::sqlite3_data_count(stmt.as_ptr()) };
		usize::try_from(n).unwrap_or_default()
	}

	pub(crate) fn row(&self) -> Row {
		let count = self.data_count();
		let mut row = Vec::with_capacity(count);
		for i in 0..count {
			let Ok(index) = c_int::try_from(i) else {
				break;
			};
			row.push(self.column_value(index));
		}
		row
	}

	fn column_value(&self, index: c_int) -> Value {
		let Some(stmt) = self.raw else {
			return Value::Null;
		};
		let stmt = stmt.as_ptr();
		match unsafe { ffi::sqlite3_column_type(stmt, index) } {
			ffi::SQLITE_INTEGER => Value::Integer(unsafe { ffi::sqlite3_column_int64(stmt, index) }),
			ffi::SQLITE_FLOAT => Value::Float(unsafe { ffi::sqlite3_column_double(stmt, index) }),
			ffi::SQLITE_TEXT => {
				let ptr = unsafe { ffi::sqlite3_column_text(stmt, index) };
				let bytes = unsafe { ffi::sqlite3_column_bytes(stmt, index) };
				let slice = column_bytes(ptr.cast(), bytes);
				Value::Text(String::from_utf8_lossy(slice).into_owned())
			}
			ffi::SQLITE_BLOB => {
				let ptr = unsafe { ffi::sqlite3_column_blob(stmt, index) };
				let bytes = unsafe { ffi::sqlite3_column_bytes(stmt, index) };
				Value::Blob(column_bytes(ptr, bytes).to_vec())
			}
			_ => Value::Null,
		}
	}

	pub(crate) fn describe(&self) -> Vec<ColumnDescription> {
		let Some(stmt) = self.raw else {
			return Vec::new();
		};
		let stmt = stmt.as_ptr();
		(0..self.column_count())
			.filter_map(|i| c_int::try_from(i).ok())
			.map(|index| ColumnDescription {
				name: c_text(unsafe { ffi::sqlite3_column_name(stmt, index) }).unwrap_or_default(),
				decltype: c_text(unsafe { ffi::sqlite3_column_decltype(stmt, index) }),
			})
			.collect()
	}

	pub(crate) fn is_readonly(&self) -> bool {
		self.raw.is_none_or(|stmt| unsafe { ffi::sqlite3_stmt_readonly(stmt.as_ptr()) } != 0)
	}
}

impl Drop for Statement {
	fn drop(&mut self) {
		if let Some(stmt) = self.raw.take() {
			let _ = unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
		}
	}
}

fn column_bytes<'a>(ptr: *const c_void, bytes: c_int) -> &'a [u8] {
	let len = usize::try_from(bytes).unwrap_or_default();
	if ptr.is_null() || len == 0 {
		return &[];
	}
	unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) }
}

fn c_text(ptr: *const core::ffi::c_char) -> Option<String> {
	if ptr.is_null() {
		None
	} else {
		Some(unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() })
	}
}

fn sqlite_transient() -> unsafe extern "C" fn(*mut c_void) {
	unsafe { std::mem::transmute::<isize, unsafe extern "C" fn(*mut c_void)>(-1_isize) }
}

/// Skips separators and comments after a statement. `None` when nothing
/// executable is left.
pub(crate) fn remaining_sql(text: &str) -> Option<&str> {
	let mut rest = text;
	loop {
		rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == ';');
		if let Some(comment) = rest.strip_prefix("--") {
			rest = comment.find('\n').and_then(|end| comment.get(end + 1..)).unwrap_or_default();
		} else if let Some(comment) = rest.strip_prefix("/*") {
			rest = comment.find("*/").and_then(|end| comment.get(end + 2..)).unwrap_or_default();
		} else {
			break;
		}
	}
	(!rest.is_empty()).then_some(rest)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn remaining_sql_skips_separators_and_comments() {
		assert_eq!(remaining_sql("  ;\n select 2"), Some("select 2"));
		assert_eq!(remaining_sql("-- note\n/* block */ select 3;"), Some("select 3;"));
		assert_eq!(remaining_sql(" ; -- trailing comment"), None);
		assert_eq!(remaining_sql("/* unterminated"), None);
		assert_eq!(remaining_sql(""), None);
	}

	#[test]
	fn division_is_not_a_comment() {
		assert_eq!(remaining_sql(" / 2"), Some("/ 2"));
		assert_eq!(remaining_sql("- 1"), Some("- 1"));
	}
}
