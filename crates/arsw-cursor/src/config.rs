//! Per-connection configuration.

use core::ffi::c_int;

use crate::ffi;

pub const DEFAULT_STATEMENT_CACHE_SIZE: usize = 100;

/// Largest text or blob the engine accepts through its 32-bit length parameter.
pub const MAX_VALUE_LENGTH: usize = 0x7fff_ffff;

/// What to bind when a mapping has no entry for a named parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingNamed {
	#[default]
	Null,
	Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
	ReadOnly,
	ReadWrite,
	#[default]
	ReadWriteCreate,
}

#[derive(Debug, Clone)]
pub struct Config {
	/// Idle compiled statements kept per connection. Zero disables caching.
	pub statement_cache_size: usize,

	/// Text and blob values longer than this fail to bind.
	pub max_value_length: usize,

	pub missing_named: MissingNamed,

	pub open: OpenMode,

	/// Accept `file:` URI filenames.
	pub uri: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			statement_cache_size: DEFAULT_STATEMENT_CACHE_SIZE,
			max_value_length: MAX_VALUE_LENGTH,
			missing_named: MissingNamed::default(),
			open: OpenMode::default(),
			uri: true,
		}
	}
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub const fn with_statement_cache_size(mut self, size: usize) -> Self {
		self.statement_cache_size = size;
		self
	}

	/// Values above [`MAX_VALUE_LENGTH`] are clamped to it.
	#[must_use]
	pub fn with_max_value_length(mut self, length: usize) -> Self {
		self.max_value_length = length.min(MAX_VALUE_LENGTH);
		self
	}

	#[must_use]
	pub const fn with_missing_named(mut self, policy: MissingNamed) -> Self {
		self.missing_named = policy;
		self
	}

	#[must_use]
	pub const fn with_open_mode(mut self, mode: OpenMode) -> Self {
		self.open = mode;
		self
	}

	#[must_use]
	pub const fn with_uri(mut self, uri: bool) -> Self {
		self.uri = uri;
		self
	}

	pub(crate) const fn open_flags(&self) -> c_int {
		let mode = match self.open {
			OpenMode::ReadOnly => ffi::SQLITE_OPEN_READONLY,
			OpenMode::ReadWrite => ffi::SQLITE_OPEN_READWRITE,
			OpenMode::ReadWriteCreate => ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
		};
		let uri = if self.uri { ffi::SQLITE_OPEN_URI } else { 0 };
		mode | uri | ffi::SQLITE_OPEN_FULLMUTEX
	}

	pub(crate) fn value_limit(&self) -> usize {
		self.max_value_length.min(MAX_VALUE_LENGTH)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn max_value_length_never_exceeds_engine_limit() {
		let config = Config::new().with_max_value_length(usize::MAX);
		assert_eq!(config.max_value_length, MAX_VALUE_LENGTH);

		let config = Config::new().with_max_value_length(8);
		assert_eq!(config.value_limit(), 8);
	}

	#[test]
	fn read_only_does_not_create() {
		let flags = Config::new().with_open_mode(OpenMode::ReadOnly).with_uri(false).open_flags();
		assert_eq!(flags & ffi::SQLITE_OPEN_CREATE, 0);
		assert_eq!(flags & ffi::SQLITE_OPEN_URI, 0);
		assert_ne!(flags & ffi::SQLITE_OPEN_READONLY, 0);
	}
}
