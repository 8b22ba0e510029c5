use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binder::bind_value;
use crate::config::{Config, MissingNamed};
use crate::error::{Error, Result};
use crate::statement::Statement;
use crate::value::Value;

/// Looks up values for named parameters by name, without the marker character.
///
/// Lookups happen only for names a statement declares, so a mapping can hold
/// entries that could never be bound.
pub trait NamedValues: fmt::Debug + Send + Sync {
	/// `Ok(None)` when there is no entry. A `BindingType` error may leave the
	/// position as zero; the resolver fills it in.
	fn value(&self, name: &str) -> Result<Option<Value>>;

	fn as_any(&self) -> &dyn Any;
}

impl NamedValues for HashMap<String, Value> {
	fn value(&self, name: &str) -> Result<Option<Value>> {
		Ok(self.get(name).cloned())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Parameters for one execution, or one cycle of a bulk execution.
#[derive(Debug, Clone)]
pub enum Bindings {
	/// Consumed in order across every statement of a batch.
	Positional(Vec<Value>),
	Named(Arc<dyn NamedValues>),
}

impl Bindings {
	pub fn positional<I, V>(values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		Self::Positional(values.into_iter().map(Into::into).collect())
	}

	pub fn named<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<Value>,
	{
		let map: HashMap<String, Value> =
			pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		Self::Named(Arc::new(map))
	}

	pub fn from_named<N: NamedValues + 'static>(values: N) -> Self {
		Self::Named(Arc::new(values))
	}

	pub(crate) fn traced(&self, from: usize, to: usize) -> TracedBindings<'_> {
		match self {
			Self::Positional(values) => {
				TracedBindings::Positional(values.get(from..to).unwrap_or_default())
			}
			Self::Named(named) => TracedBindings::Named(named.as_ref()),
		}
	}
}

impl From<Vec<Value>> for Bindings {
	fn from(values: Vec<Value>) -> Self {
		Self::Positional(values)
	}
}

impl From<HashMap<String, Value>> for Bindings {
	fn from(map: HashMap<String, Value>) -> Self {
		Self::Named(Arc::new(map))
	}
}

/// The bindings an execution trace sees for the statement about to run.
#[derive(Debug, Clone, Copy)]
pub enum TracedBindings<'a> {
	/// Only the slice this statement consumed.
	Positional(&'a [Value]),
	Named(&'a dyn NamedValues),
}

/// Binds `bindings` to `stmt` starting at `offset` and returns the new offset.
pub(crate) fn resolve(
	stmt: &mut Statement,
	bindings: Option<&Bindings>,
	offset: usize,
	config: &Config,
) -> Result<usize> {
	let required = stmt.parameter_count();
	let Some(bindings) = bindings else {
		if required == 0 {
			return Ok(offset);
		}
		return Err(Error::MissingBindings { required });
	};
	let limit = config.value_limit();

	match bindings {
		Bindings::Named(named) => {
			for index in 1..=required {
				let name = stmt
					.parameter_name(index)
					.ok_or(Error::UnnamedParameter { index })?;
				let key = strip_marker(&name);
				let position = index + offset;
				let value = named.value(key).map_err(|e| e.at_position(position))?;
				match (value, config.missing_named) {
					(Some(value), _) => bind_value(stmt, index, &value, limit, position)?,
					(None, MissingNamed::Null) => stmt.bind_null(index)?,
					(None, MissingNamed::Error) => {
						return Err(Error::MissingNamedBinding { name: key.to_string() });
					}
				}
			}
			Ok(offset)
		}
		Bindings::Positional(values) => {
			let available = values.len();
			let left = available.saturating_sub(offset);
			let fits = if stmt.has_next() { left >= required } else { left == required };
			if !fits {
				return Err(Error::BindingsCount { required, available, offset });
			}

			for index in 1..=required {
				let value = values
					.get(offset + index - 1)
					.ok_or(Error::BindingsCount { required, available, offset })?;
				bind_value(stmt, index, value, limit, offset + index)?;
			}
			Ok(offset + required)
		}
	}
}

fn strip_marker(name: &str) -> &str {
	name.strip_prefix([':', '$', '@', '?']).unwrap_or(name)
}
