use core::ffi::c_int;
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

use arsw_cursor::{
	Bindings, ColumnDescription, Config, Connection as CoreConnection, Cursor as CoreCursor,
	Error as CoreError, ExecTrace, NamedValues, OpenMode, TracedBindings, Value, exec_trace, ffi,
};
use pyo3::marker::Ungil;
use pyo3::prelude::*;
use pyo3::types::{
	PyAny, PyByteArray, PyBytes, PyDict, PyFloat, PyInt, PyIterator, PyMemoryView, PySequence,
	PyString, PyTuple, PyType,
};

mod blob;
mod connection;
mod convert;
mod cursor;
mod errors;

pub(crate) use blob::ZeroBlob;
pub(crate) use connection::Connection;
pub(crate) use convert::*;
pub(crate) use cursor::Cursor;
pub(crate) use errors::*;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[pyfunction(name = "sqlitelibversion")]
fn sqlite_lib_version() -> String {
	arsw_cursor::sqlite_lib_version()
}

#[pyfunction(name = "apswversion")]
#[expect(clippy::missing_const_for_fn, reason = "PyO3 functions are not const")]
fn apsw_version() -> &'static str {
	env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn apsw(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
	m.add_function(wrap_pyfunction!(sqlite_lib_version, m)?)?;
	m.add_function(wrap_pyfunction!(apsw_version, m)?)?;
	m.add_class::<Connection>()?;
	m.add_class::<Cursor>()?;
	m.add_class::<ZeroBlob>()?;
	m.add("SQLITE_OPEN_READONLY", ffi::SQLITE_OPEN_READONLY)?;
	m.add("SQLITE_OPEN_READWRITE", ffi::SQLITE_OPEN_READWRITE)?;
	m.add("SQLITE_OPEN_CREATE", ffi::SQLITE_OPEN_CREATE)?;
	m.add("SQLITE_OPEN_URI", ffi::SQLITE_OPEN_URI)?;
	add_module_exceptions(py, m)?;
	Ok(())
}
