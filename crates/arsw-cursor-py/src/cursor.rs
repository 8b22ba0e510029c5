use super::*;

/// Accepts `None` or a callable, as every trace setter does.
fn checked_callable(callable: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Py<PyAny>>> {
	match callable {
		None => Ok(None),
		Some(callable) if callable.is_none() => Ok(None),
		Some(callable) if callable.is_callable() => Ok(Some(callable.clone().unbind())),
		Some(_) => Err(pyo3::exceptions::PyTypeError::new_err("parameter must be callable")),
	}
}

/// Wraps a Python callable as an engine exec trace. The callable receives the
/// statement text and its bindings; a falsy return aborts execution.
fn python_exec_trace(callable: Py<PyAny>) -> ExecTrace {
	exec_trace(move |sql, bindings| {
		Python::attach(|py| {
			let bindings = traced_to_python(py, bindings)?;
			callable.bind(py).call1((sql, bindings))?.is_truthy()
		})
		.map_err(CoreError::callback)
	})
}

fn current(slot: &Mutex<Option<Py<PyAny>>>, py: Python<'_>) -> Py<PyAny> {
	lock(slot).as_ref().map_or_else(|| py.None(), |callable| callable.clone_ref(py))
}

#[pyclass(module = "apsw", frozen)]
pub(crate) struct Cursor {
	connection: Py<Connection>,
	inner: CoreCursor,
	exec_trace: Mutex<Option<Py<PyAny>>>,
	row_trace: Mutex<Option<Py<PyAny>>>,
}

impl Cursor {
	pub(crate) const fn new(connection: Py<Connection>, inner: CoreCursor) -> Self {
		Self { connection, inner, exec_trace: Mutex::new(None), row_trace: Mutex::new(None) }
	}

	fn description_pairs(&self, py: Python<'_>) -> PyResult<Vec<ColumnDescription>> {
		let cursor = &self.inner;
		without_gil(py, || cursor.describe_columns())
	}
}

#[pymethods]
impl Cursor {
	#[new]
	fn py_new(py: Python<'_>, connection: Py<Connection>) -> PyResult<Self> {
		let core = connection.get().inner.clone();
		let inner = without_gil(py, move || core.cursor())?;
		Ok(Self::new(connection, inner))
	}

	fn __iter__(slf: PyRef<'_, Self>) -> Py<Self> {
		slf.into()
	}

	fn __next__(&self, py: Python<'_>) -> PyResult<Option<Py<PyAny>>> {
		self.fetchone(py)
	}

	#[pyo3(signature = (statements, bindings = None))]
	fn execute(
		slf: PyRef<'_, Self>,
		py: Python<'_>,
		statements: &str,
		bindings: Option<&Bound<'_, PyAny>>,
	) -> PyResult<Py<Self>> {
		let bindings = bindings_from_python(bindings).map_err(|err| to_py_err(py, err))?;
		let cursor = &slf.inner;
		without_gil(py, || cursor.execute(statements, bindings).map(|_| ()))?;
		Ok(slf.into())
	}

	fn executemany(
		slf: PyRef<'_, Self>,
		py: Python<'_>,
		statements: &str,
		sequenceofbindings: &Bound<'_, PyAny>,
	) -> PyResult<Py<Self>> {
		let source = PyBindingsSource::new(sequenceofbindings)?;
		let cursor = &slf.inner;
		without_gil(py, || cursor.executemany_from(statements, Box::new(source)).map(|_| ()))?;
		Ok(slf.into())
	}

	/// The next row as a tuple, after the row tracer if one is set.
	fn fetchone(&self, py: Python<'_>) -> PyResult<Option<Py<PyAny>>> {
		let tracer = lock(&self.row_trace).as_ref().map(|callable| callable.clone_ref(py));
		let cursor = &self.inner;
		loop {
			let Some(row) = without_gil(py, || cursor.fetch_next())? else {
				return Ok(None);
			};
			let row = row_to_python(py, &row)?;
			let Some(tracer) = &tracer else {
				return Ok(Some(row.into_any().unbind()));
			};
			let traced = tracer.bind(py).call1(row)?;
			if !traced.is_none() {
				return Ok(Some(traced.unbind()));
			}
		}
	}

	fn fetchall(&self, py: Python<'_>) -> PyResult<Vec<Py<PyAny>>> {
		let mut rows = Vec::new();
		while let Some(row) = self.fetchone(py)? {
			rows.push(row);
		}
		Ok(rows)
	}

	fn getdescription<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyTuple>> {
		let columns = self
			.description_pairs(py)?
			.into_iter()
			.map(|column| (column.name, column.decltype))
			.collect::<Vec<_>>();
		PyTuple::new(py, columns)
	}

	#[getter]
	fn description<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyTuple>> {
		let columns = self
			.description_pairs(py)?
			.into_iter()
			.map(|column| {
				let none = || py.None();
				(column.name, column.decltype, none(), none(), none(), none(), none())
			})
			.collect::<Vec<_>>();
		PyTuple::new(py, columns)
	}

	#[pyo3(signature = (callable = None))]
	fn setexectrace(&self, py: Python<'_>, callable: Option<&Bound<'_, PyAny>>) -> PyResult<()> {
		let callable = checked_callable(callable)?;
		let trace = callable.as_ref().map(|callable| python_exec_trace(callable.clone_ref(py)));
		let cursor = &self.inner;
		without_gil(py, || cursor.set_exec_trace(trace))?;
		*lock(&self.exec_trace) = callable;
		Ok(())
	}

	fn getexectrace(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
		let cursor = &self.inner;
		without_gil(py, || cursor.exec_trace().map(|_| ()))?;
		Ok(current(&self.exec_trace, py))
	}

	#[pyo3(signature = (callable = None))]
	fn setrowtrace(&self, py: Python<'_>, callable: Option<&Bound<'_, PyAny>>) -> PyResult<()> {
		let callable = checked_callable(callable)?;
		// Row tracers run here rather than in the engine so they may return any object.
		let cursor = &self.inner;
		without_gil(py, || cursor.row_trace().map(|_| ()))?;
		*lock(&self.row_trace) = callable;
		Ok(())
	}

	fn getrowtrace(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
		let cursor = &self.inner;
		without_gil(py, || cursor.row_trace().map(|_| ()))?;
		Ok(current(&self.row_trace, py))
	}

	fn getconnection(&self, py: Python<'_>) -> PyResult<Py<Connection>> {
		let cursor = &self.inner;
		without_gil(py, || cursor.connection().map(|_| ()))?;
		Ok(self.connection.clone_ref(py))
	}

	#[pyo3(signature = (force = false))]
	fn close(&self, py: Python<'_>, force: bool) -> PyResult<()> {
		let cursor = &self.inner;
		without_gil(py, || cursor.close(force))
	}
}
