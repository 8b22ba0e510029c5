use super::*;

/// A blob of `length` zero bytes, bound without materialising the bytes.
#[pyclass(module = "apsw", name = "zeroblob", frozen)]
pub(crate) struct ZeroBlob {
	pub(crate) length: u64,
}

#[pymethods]
impl ZeroBlob {
	#[new]
	#[expect(clippy::missing_const_for_fn, reason = "PyO3 #[new] methods are not const")]
	fn py_new(length: u64) -> Self {
		Self { length }
	}

	#[expect(clippy::missing_const_for_fn, reason = "PyO3 methods are not const")]
	fn length(&self) -> u64 {
		self.length
	}

	fn __repr__(&self) -> String {
		format!("<apsw.zeroblob length={}>", self.length)
	}
}
