use crate::error::{Error, Result};
use crate::statement::Statement;
use crate::value::Value;

/// Binds one value to the 1-based parameter `index`.
///
/// `position` is what errors report: the parameter's place across the whole
/// batch. Oversized text and blobs are rejected before the engine is called.
pub(crate) fn bind_value(
	stmt: &mut Statement,
	index: usize,
	value: &Value,
	limit: usize,
	position: usize,
) -> Result<()> {
	match value {
		Value::Null => stmt.bind_null(index),
		Value::Integer(v) => stmt.bind_i64(index, *v),
		Value::Float(v) => stmt.bind_f64(index, *v),
		Value::Text(v) => {
			check_length(v.len(), limit, position)?;
			stmt.bind_text(index, v)
		}
		Value::Blob(v) => {
			check_length(v.len(), limit, position)?;
			stmt.bind_blob(index, v)
		}
		Value::ZeroBlob(length) => stmt.bind_zeroblob(index, *length),
	}
}

const fn check_length(length: usize, max: usize, position: usize) -> Result<()> {
	if length > max { Err(Error::TooBig { position, length, max }) } else { Ok(()) }
}
