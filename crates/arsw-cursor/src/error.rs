use core::ffi::c_int;
use std::ffi::CStr;

use crate::ffi;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which part of the execution contract an [`Error`] belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
	Usage,
	Bindings,
	Engine,
	IncompleteExecution,
	Abort,
	Callback,
}

/// Work left behind when a cursor is reset without being drained.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Incomplete {
	Statements { remaining: String },
	Bulk,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Sqlite { code: c_int, message: String },

	#[error("The cursor's connection has been closed")]
	ConnectionClosed,

	#[error(
		"You are trying to use the same object concurrently in two threads or re-entrantly within the same thread which is not allowed."
	)]
	ThreadingViolation,

	#[error("Can't get description for statements that have completed execution")]
	ExecutionComplete,

	#[error("SQL contains a NUL byte")]
	NulInSql,

	#[error("{0}")]
	InvalidBindings(String),

	#[error("Statement has {required} bindings but you didn't supply any!")]
	MissingBindings { required: usize },

	#[error(
		"Incorrect number of bindings supplied.  The current statement uses {required} and there are {available} supplied.  Current offset is {offset}"
	)]
	BindingsCount { required: usize, available: usize, offset: usize },

	#[error("Binding {index} has no name, but you supplied a dict (which only has names).")]
	UnnamedParameter { index: usize },

	#[error("You did not supply a value for binding {name}")]
	MissingNamedBinding { name: String },

	#[error("Bad binding argument type supplied - argument #{position}: type {type_name}")]
	BindingType { position: usize, type_name: String },

	#[error("Binding argument #{position} is {length} bytes which exceeds the limit of {max}")]
	TooBig { position: usize, length: usize, max: usize },

	#[error("value is too large to be represented as a 64 bit signed integer")]
	IntegerOverflow,

	#[error("{}", incomplete_message(.0))]
	IncompleteExecution(Incomplete),

	#[error("Aborted by false/null return value of exec tracer")]
	TraceAbort,

	#[error(transparent)]
	Callback(Box<dyn std::error::Error + Send + Sync>),
}

fn incomplete_message(incomplete: &Incomplete) -> &'static str {
	match incomplete {
		Incomplete::Statements { .. } => {
			"Error: there are still remaining sql statements to execute"
		}
		Incomplete::Bulk => "Error: there are still many remaining sql statements to execute",
	}
}

impl Error {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::Sqlite { .. } => ErrorKind::Engine,
			Self::ConnectionClosed
			| Self::ThreadingViolation
			| Self::ExecutionComplete
			| Self::NulInSql
			| Self::InvalidBindings(_) => ErrorKind::Usage,
			Self::MissingBindings { .. }
			| Self::BindingsCount { .. }
			| Self::UnnamedParameter { .. }
			| Self::MissingNamedBinding { .. }
			| Self::BindingType { .. }
			| Self::TooBig { .. }
			| Self::IntegerOverflow => ErrorKind::Bindings,
			Self::IncompleteExecution(_) => ErrorKind::IncompleteExecution,
			Self::TraceAbort => ErrorKind::Abort,
			Self::Callback(_) => ErrorKind::Callback,
		}
	}

	/// The extended result code for engine errors.
	#[must_use]
	pub const fn code(&self) -> Option<c_int> {
		match self {
			Self::Sqlite { code, .. } => Some(*code),
			Self::TooBig { .. } => Some(ffi::SQLITE_TOOBIG),
			_ => None,
		}
	}

	#[must_use]
	pub const fn primary_code(&self) -> Option<c_int> {
		match self.code() {
			Some(code) => Some(code & 0xff),
			None => None,
		}
	}

	pub fn callback<E>(error: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Self::Callback(Box::new(error))
	}

	pub(crate) fn at_position(self, position: usize) -> Self {
		match self {
			Self::BindingType { type_name, .. } => Self::BindingType { position, type_name },
			Self::TooBig { length, max, .. } => Self::TooBig { position, length, max },
			other => other,
		}
	}
}

pub(crate) fn check_ok(db: *mut ffi::Sqlite3, code: c_int) -> Result<()> {
	if code == ffi::SQLITE_OK { Ok(()) } else { Err(sqlite_error(db, code)) }
}

pub(crate) fn sqlite_error(db: *mut ffi::Sqlite3, code: c_int) -> Error {
	let code = if db.is_null() {
		code
	} else {
		match unsafe { ffi::sqlite3_extended_errcode(db) } {
			extended if extended & 0xff == code & 0xff => extended,
			_ => code,
		}
	};
	Error::Sqlite { code, message: db_error_message(db, code) }
}

fn db_error_message(db: *mut ffi::Sqlite3, code: c_int) -> String {
	if db.is_null() {
		return arsw_sqlite_ffi::sqlite_error_string(code);
	}

	let message_ptr = unsafe { ffi::sqlite3_errmsg(db) };
	if message_ptr.is_null() {
		return arsw_sqlite_ffi::sqlite_error_string(code);
	}

	unsafe { CStr::from_ptr(message_ptr).to_string_lossy().into_owned() }
}
