use std::sync::Arc;

use tracing::debug;

use crate::bindings::{Bindings, TracedBindings};
use crate::error::{Error, Result};
use crate::value::Row;

/// Called with a statement's text and bindings just before it runs.
/// Returning `false` aborts the batch with [`Error::TraceAbort`].
pub type ExecTrace =
	Arc<dyn Fn(&str, Option<TracedBindings<'_>>) -> Result<bool> + Send + Sync + 'static>;

/// Called with each row. `None` skips the row.
pub type RowTrace = Arc<dyn Fn(Row) -> Result<Option<Row>> + Send + Sync + 'static>;

pub fn exec_trace<F>(f: F) -> ExecTrace
where
	F: Fn(&str, Option<TracedBindings<'_>>) -> Result<bool> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub fn row_trace<F>(f: F) -> RowTrace
where
	F: Fn(Row) -> Result<Option<Row>> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// Runs the exec trace for a statement that consumed `bindings[from..to]`.
pub(crate) fn run_exec_trace(
	trace: &ExecTrace,
	sql: &str,
	bindings: Option<&Bindings>,
	from: usize,
	to: usize,
) -> Result<()> {
	let traced = bindings.map(|b| b.traced(from, to));
	if trace(sql, traced)? {
		Ok(())
	} else {
		debug!(sql, "exec trace vetoed statement");
		Err(Error::TraceAbort)
	}
}
