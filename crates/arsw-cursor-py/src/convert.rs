use super::*;

fn type_name(value: &Bound<'_, PyAny>) -> String {
	value.get_type().name().map_or_else(|_| "unknown".to_string(), |name| name.to_string())
}

/// Converts one Python object to a bindable value. Type errors carry position
/// zero; callers that know the position fill it in.
pub(crate) fn value_from_python(value: &Bound<'_, PyAny>) -> arsw_cursor::Result<Value> {
	if value.is_none() {
		return Ok(Value::Null);
	}
	if let Ok(int) = value.cast::<PyInt>() {
		return int.extract::<i64>().map(Value::Integer).map_err(|_| CoreError::IntegerOverflow);
	}
	if let Ok(float) = value.cast::<PyFloat>() {
		return Ok(Value::Float(float.value()));
	}
	if let Ok(text) = value.cast::<PyString>() {
		return text.to_str().map(Value::from).map_err(CoreError::callback);
	}
	if let Ok(bytes) = value.cast::<PyBytes>() {
		return Ok(Value::Blob(bytes.as_bytes().to_vec()));
	}
	if let Ok(bytes) = value.cast::<PyByteArray>() {
		return Ok(Value::Blob(bytes.to_vec()));
	}
	if let Ok(zero) = value.cast::<ZeroBlob>() {
		return Ok(Value::ZeroBlob(zero.get().length));
	}
	if let Ok(view) = PyMemoryView::from(value) {
		return buffer_bytes(&view).map(Value::Blob).map_err(CoreError::callback);
	}
	Err(CoreError::BindingType { position: 0, type_name: type_name(value) })
}

/// Copies the contents of any object exposing the buffer protocol.
fn buffer_bytes(view: &Bound<'_, PyMemoryView>) -> PyResult<Vec<u8>> {
	let bytes = view.call_method0("tobytes")?;
	Ok(bytes.cast::<PyBytes>()?.as_bytes().to_vec())
}

pub(crate) fn value_to_python(py: Python<'_>, value: &Value) -> PyResult<Py<PyAny>> {
	let object = match value {
		Value::Null => py.None(),
		Value::Integer(v) => v.into_pyobject(py)?.unbind().into_any(),
		Value::Float(v) => v.into_pyobject(py)?.unbind().into_any(),
		Value::Text(v) => PyString::new(py, v).unbind().into_any(),
		Value::Blob(v) => PyBytes::new(py, v).unbind().into_any(),
		Value::ZeroBlob(length) => Py::new(py, ZeroBlob { length: *length })?.into_any(),
	};
	Ok(object)
}

pub(crate) fn row_to_python<'py>(py: Python<'py>, row: &[Value]) -> PyResult<Bound<'py, PyTuple>> {
	let values = row.iter().map(|value| value_to_python(py, value)).collect::<PyResult<Vec<_>>>()?;
	PyTuple::new(py, values)
}

/// A Python dict consulted key by key as named parameters are bound.
#[derive(Debug)]
pub(crate) struct DictBindings {
	dict: Py<PyDict>,
}

impl DictBindings {
	pub(crate) fn dict(&self, py: Python<'_>) -> Py<PyAny> {
		self.dict.clone_ref(py).into_any()
	}
}

impl NamedValues for DictBindings {
	fn value(&self, name: &str) -> arsw_cursor::Result<Option<Value>> {
		Python::attach(|py| {
			let item = self.dict.bind(py).get_item(name).map_err(CoreError::callback)?;
			item.as_ref().map(value_from_python).transpose()
		})
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Converts the `bindings` argument of `execute`. `None` means no bindings.
pub(crate) fn bindings_from_python(
	bindings: Option<&Bound<'_, PyAny>>,
) -> arsw_cursor::Result<Option<Bindings>> {
	match bindings {
		None => Ok(None),
		Some(value) if value.is_none() => Ok(None),
		Some(value) => binding_set_from_python(value).map(Some),
	}
}

/// Converts one dict or sequence. Sequence items are converted eagerly and
/// type errors report the item's 1-based position.
pub(crate) fn binding_set_from_python(value: &Bound<'_, PyAny>) -> arsw_cursor::Result<Bindings> {
	if let Ok(dict) = value.cast::<PyDict>() {
		return Ok(Bindings::from_named(DictBindings { dict: dict.clone().unbind() }));
	}
	let Ok(sequence) = value.cast::<PySequence>() else {
		return Err(CoreError::InvalidBindings("You must supply a dict or a sequence".to_string()));
	};
	let mut values = Vec::new();
	for (index, item) in sequence.try_iter().map_err(CoreError::callback)?.enumerate() {
		let item = item.map_err(CoreError::callback)?;
		let value = value_from_python(&item).map_err(|err| match err {
			CoreError::BindingType { type_name, .. } => {
				CoreError::BindingType { position: index + 1, type_name }
			}
			other => other,
		})?;
		values.push(value);
	}
	Ok(Bindings::Positional(values))
}

/// What an exec tracer receives: the caller's dict, the consumed slice of a
/// sequence as a tuple, or `None`.
pub(crate) fn traced_to_python(
	py: Python<'_>,
	bindings: Option<TracedBindings<'_>>,
) -> PyResult<Py<PyAny>> {
	match bindings {
		None => Ok(py.None()),
		Some(TracedBindings::Positional(values)) => {
			Ok(row_to_python(py, values)?.into_any().unbind())
		}
		Some(TracedBindings::Named(named)) => Ok(named
			.as_any()
			.downcast_ref::<DictBindings>()
			.map_or_else(|| py.None(), |dict| dict.dict(py))),
	}
}

/// Feeds `executemany` from a Python iterator, one binding set per item.
pub(crate) struct PyBindingsSource {
	iter: Py<PyIterator>,
}

impl PyBindingsSource {
	pub(crate) fn new(iterable: &Bound<'_, PyAny>) -> PyResult<Self> {
		let iter = iterable.try_iter().map_err(|_| {
			pyo3::exceptions::PyTypeError::new_err("2nd parameter must be iterable")
		})?;
		Ok(Self { iter: iter.unbind() })
	}
}

impl Iterator for PyBindingsSource {
	type Item = arsw_cursor::Result<Bindings>;

	fn next(&mut self) -> Option<Self::Item> {
		Python::attach(|py| {
			let item = match self.iter.bind(py).clone().next()? {
				Ok(item) => item,
				Err(err) => return Some(Err(CoreError::callback(err))),
			};
			Some(binding_set_from_python(&item))
		})
	}
}
