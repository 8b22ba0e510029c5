use crate::error::{Error, Result};

/// A value that can be bound to a statement parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Integer(i64),
	Float(f64),
	Text(String),
	Blob(Vec<u8>),
	/// A blob of this many zero bytes, reserved for incremental blob I/O.
	ZeroBlob(u64),
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnDescription {
	pub name: String,
	pub decltype: Option<String>,
}

impl Value {
	#[must_use]
	pub const fn zeroblob(length: u64) -> Self {
		Self::ZeroBlob(length)
	}

	#[must_use]
	pub const fn type_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Integer(_) => "integer",
			Self::Float(_) => "float",
			Self::Text(_) => "text",
			Self::Blob(_) => "blob",
			Self::ZeroBlob(_) => "zeroblob",
		}
	}

	#[must_use]
	pub const fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	#[must_use]
	pub const fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Integer(v) => Some(*v),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(v) => Some(v),
			_ => None,
		}
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Integer(i64::from(value))
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Self::Integer(i64::from(value))
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Integer(i64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<&[u8]> for Value {
	fn from(value: &[u8]) -> Self {
		Self::Blob(value.to_vec())
	}
}

impl From<Vec<u8>> for Value {
	fn from(value: Vec<u8>) -> Self {
		Self::Blob(value)
	}
}

impl<T: Into<Self>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

impl TryFrom<u64> for Value {
	type Error = Error;

	fn try_from(value: u64) -> Result<Self> {
		i64::try_from(value).map(Self::Integer).map_err(|_| Error::IntegerOverflow)
	}
}

impl TryFrom<usize> for Value {
	type Error = Error;

	fn try_from(value: usize) -> Result<Self> {
		i64::try_from(value).map(Self::Integer).map_err(|_| Error::IntegerOverflow)
	}
}

impl TryFrom<i128> for Value {
	type Error = Error;

	fn try_from(value: i128) -> Result<Self> {
		i64::try_from(value).map(Self::Integer).map_err(|_| Error::IntegerOverflow)
	}
}
