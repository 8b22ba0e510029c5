use super::*;

pub(crate) const DEFAULT_OPEN_FLAGS: c_int = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;

/// Maps `sqlite3_open_v2` style flags onto the engine's open configuration.
fn config_from_flags(flags: c_int, statement_cache_size: usize) -> Config {
	let mode = if flags & ffi::SQLITE_OPEN_READONLY != 0 {
		OpenMode::ReadOnly
	} else if flags & ffi::SQLITE_OPEN_CREATE != 0 {
		OpenMode::ReadWriteCreate
	} else {
		OpenMode::ReadWrite
	};
	Config::new()
		.with_open_mode(mode)
		.with_uri(flags & ffi::SQLITE_OPEN_URI != 0)
		.with_statement_cache_size(statement_cache_size)
}

#[pyclass(module = "apsw", frozen)]
pub(crate) struct Connection {
	pub(crate) inner: CoreConnection,
}

#[pymethods]
impl Connection {
	#[new]
	#[pyo3(signature = (filename, flags = DEFAULT_OPEN_FLAGS, statementcachesize = 100))]
	fn new(py: Python<'_>, filename: &str, flags: c_int, statementcachesize: usize) -> PyResult<Self> {
		let config = config_from_flags(flags, statementcachesize);
		let inner = without_gil(py, || CoreConnection::open_with(filename, config))?;
		Ok(Self { inner })
	}

	fn cursor(slf: &Bound<'_, Self>) -> PyResult<Py<Cursor>> {
		let py = slf.py();
		let connection = slf.get().inner.clone();
		let cursor = without_gil(py, move || connection.cursor())?;
		Py::new(py, Cursor::new(slf.clone().unbind(), cursor))
	}

	#[pyo3(signature = (force = false))]
	fn close(&self, py: Python<'_>, force: bool) -> PyResult<()> {
		let connection = &self.inner;
		without_gil(py, || connection.close(force))
	}

	#[getter]
	fn filename(&self) -> &str {
		self.inner.filename()
	}

	fn changes(&self, py: Python<'_>) -> PyResult<i64> {
		let connection = &self.inner;
		without_gil(py, || connection.changes())
	}

	fn last_insert_rowid(&self, py: Python<'_>) -> PyResult<i64> {
		let connection = &self.inner;
		without_gil(py, || connection.last_insert_rowid())
	}

	fn __repr__(&self) -> String {
		let state = if self.inner.is_closed() { " (closed)" } else { "" };
		format!("<apsw.Connection object \"{}\"{state}>", self.inner.filename())
	}
}
