use super::*;

pyo3::create_exception!(apsw, Error, pyo3::exceptions::PyException);
pyo3::create_exception!(apsw, AbortError, Error);
pyo3::create_exception!(apsw, AuthError, Error);
pyo3::create_exception!(apsw, BindingsError, Error);
pyo3::create_exception!(apsw, BusyError, Error);
pyo3::create_exception!(apsw, CantOpenError, Error);
pyo3::create_exception!(apsw, ConnectionClosedError, Error);
pyo3::create_exception!(apsw, ConstraintError, Error);
pyo3::create_exception!(apsw, CorruptError, Error);
pyo3::create_exception!(apsw, EmptyError, Error);
pyo3::create_exception!(apsw, ExecTraceAbort, Error);
pyo3::create_exception!(apsw, ExecutionCompleteError, Error);
pyo3::create_exception!(apsw, FormatError, Error);
pyo3::create_exception!(apsw, FullError, Error);
pyo3::create_exception!(apsw, IOError, Error);
pyo3::create_exception!(apsw, IncompleteExecutionError, Error);
pyo3::create_exception!(apsw, InternalError, Error);
pyo3::create_exception!(apsw, InterruptError, Error);
pyo3::create_exception!(apsw, LockedError, Error);
pyo3::create_exception!(apsw, MismatchError, Error);
pyo3::create_exception!(apsw, MisuseError, Error);
pyo3::create_exception!(apsw, NoLFSError, Error);
pyo3::create_exception!(apsw, NoMemError, Error);
pyo3::create_exception!(apsw, NotADBError, Error);
pyo3::create_exception!(apsw, NotFoundError, Error);
pyo3::create_exception!(apsw, PermissionsError, Error);
pyo3::create_exception!(apsw, ProtocolError, Error);
pyo3::create_exception!(apsw, RangeError, Error);
pyo3::create_exception!(apsw, ReadOnlyError, Error);
pyo3::create_exception!(apsw, SQLError, Error);
pyo3::create_exception!(apsw, SchemaChangeError, Error);
pyo3::create_exception!(apsw, ThreadingViolationError, Error);
pyo3::create_exception!(apsw, TooBigError, Error);

macro_rules! add_exception {
	($module:expr, $py:expr, $($name:ident),+ $(,)?) => {
		$($module.add(stringify!($name), $py.get_type::<$name>())?;)+
	};
}

pub(crate) fn add_module_exceptions(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
	add_exception!(
		m,
		py,
		Error,
		AbortError,
		AuthError,
		BindingsError,
		BusyError,
		CantOpenError,
		ConnectionClosedError,
		ConstraintError,
		CorruptError,
		EmptyError,
		ExecTraceAbort,
		ExecutionCompleteError,
		FormatError,
		FullError,
		IOError,
		IncompleteExecutionError,
		InternalError,
		InterruptError,
		LockedError,
		MismatchError,
		MisuseError,
		NoLFSError,
		NoMemError,
		NotADBError,
		NotFoundError,
		PermissionsError,
		ProtocolError,
		RangeError,
		ReadOnlyError,
		SQLError,
		SchemaChangeError,
		ThreadingViolationError,
		TooBigError,
	);
	Ok(())
}

/// The exception class for a primary SQLite result code.
fn class_for_primary(py: Python<'_>, primary: c_int) -> Option<Bound<'_, PyType>> {
	let class = match primary {
		1 => py.get_type::<SQLError>(),
		2 => py.get_type::<InternalError>(),
		3 => py.get_type::<PermissionsError>(),
		4 => py.get_type::<AbortError>(),
		5 => py.get_type::<BusyError>(),
		6 => py.get_type::<LockedError>(),
		7 => py.get_type::<NoMemError>(),
		8 => py.get_type::<ReadOnlyError>(),
		9 => py.get_type::<InterruptError>(),
		10 => py.get_type::<IOError>(),
		11 => py.get_type::<CorruptError>(),
		12 => py.get_type::<NotFoundError>(),
		13 => py.get_type::<FullError>(),
		14 => py.get_type::<CantOpenError>(),
		15 => py.get_type::<ProtocolError>(),
		16 => py.get_type::<EmptyError>(),
		17 => py.get_type::<SchemaChangeError>(),
		18 => py.get_type::<TooBigError>(),
		19 => py.get_type::<ConstraintError>(),
		20 => py.get_type::<MismatchError>(),
		21 => py.get_type::<MisuseError>(),
		22 => py.get_type::<NoLFSError>(),
		23 => py.get_type::<AuthError>(),
		24 => py.get_type::<FormatError>(),
		25 => py.get_type::<RangeError>(),
		26 => py.get_type::<NotADBError>(),
		_ => return None,
	};
	Some(class)
}

/// Builds the exception for an extended result code, carrying `result` and
/// `extendedresult` attributes.
pub(crate) fn sqlite_exception(py: Python<'_>, code: c_int, message: &str) -> PyResult<PyErr> {
	let primary = code & 0xff;
	let class = class_for_primary(py, primary).unwrap_or_else(|| py.get_type::<Error>());
	let instance = class.call1((message,))?;
	instance.setattr("result", primary)?;
	instance.setattr("extendedresult", code)?;
	Ok(PyErr::from_value(instance))
}

/// Converts an engine error into the Python exception callers expect.
///
/// Errors raised by Python callbacks travel through the engine boxed and are
/// re-raised unchanged.
pub(crate) fn to_py_err(py: Python<'_>, err: CoreError) -> PyErr {
	let message = err.to_string();
	match err {
		CoreError::Callback(inner) => match inner.downcast::<PyErr>() {
			Ok(original) => *original,
			Err(other) => pyo3::exceptions::PyRuntimeError::new_err(other.to_string()),
		},
		CoreError::Sqlite { code, .. } => {
			sqlite_exception(py, code, &message).unwrap_or_else(|failed| failed)
		}
		CoreError::TooBig { .. } => {
			sqlite_exception(py, ffi::SQLITE_TOOBIG, &message).unwrap_or_else(|failed| failed)
		}
		CoreError::BindingType { .. } | CoreError::InvalidBindings(_) => {
			pyo3::exceptions::PyTypeError::new_err(message)
		}
		CoreError::IntegerOverflow => pyo3::exceptions::PyOverflowError::new_err(message),
		CoreError::NulInSql => pyo3::exceptions::PyValueError::new_err(message),
		CoreError::ConnectionClosed => ConnectionClosedError::new_err(message),
		CoreError::ThreadingViolation => ThreadingViolationError::new_err(message),
		CoreError::ExecutionComplete => ExecutionCompleteError::new_err(message),
		CoreError::IncompleteExecution(_) => IncompleteExecutionError::new_err(message),
		CoreError::TraceAbort => ExecTraceAbort::new_err(message),
		CoreError::MissingBindings { .. }
		| CoreError::BindingsCount { .. }
		| CoreError::UnnamedParameter { .. }
		| CoreError::MissingNamedBinding { .. } => BindingsError::new_err(message),
	}
}

/// Runs engine work with the interpreter lock released.
pub(crate) fn without_gil<T, F>(py: Python<'_>, f: F) -> PyResult<T>
where
	F: Ungil + FnOnce() -> arsw_cursor::Result<T>,
	T: Ungil + Send,
{
	py.detach(f).map_err(|err| to_py_err(py, err))
}
