use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, trace, warn};

use crate::bindings::{Bindings, resolve};
use crate::connection::{Connection, ConnectionInner, lock};
use crate::error::{Error, Incomplete, Result};
use crate::statement::{Statement, Step};
use crate::trace::{ExecTrace, RowTrace, run_exec_trace};
use crate::value::{ColumnDescription, Row};

/// A lazily evaluated sequence of parameter sets for [`Cursor::executemany_from`].
pub type BindingsSource = Box<dyn Iterator<Item = Result<Bindings>> + Send>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Status {
	Begin,
	Row,
	Done,
}

/// Marks a cursor busy for the duration of one call.
struct InUse<'a>(&'a AtomicBool);

impl<'a> InUse<'a> {
	fn acquire(flag: &'a AtomicBool) -> Result<Self> {
		flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
			.map(|_| Self(flag))
			.map_err(|_| Error::ThreadingViolation)
	}
}

impl Drop for InUse<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

struct CursorState {
	statement: Option<Statement>,
	status: Status,
	bindings: Option<Bindings>,
	offset: usize,
	bulk: Option<BindingsSource>,
	bulk_query: Option<String>,
	exec_trace: Option<ExecTrace>,
	row_trace: Option<RowTrace>,
}

impl CursorState {
	const fn new() -> Self {
		Self {
			statement: None,
			status: Status::Done,
			bindings: None,
			offset: 0,
			bulk: None,
			bulk_query: None,
			exec_trace: None,
			row_trace: None,
		}
	}

	fn clear(&mut self) {
		self.bindings = None;
		self.offset = 0;
		self.bulk = None;
		self.bulk_query = None;
		self.status = Status::Done;
	}

	/// Drops everything in flight after a failure. Errors from releasing the
	/// statement are ignored; the failure being reported takes precedence.
	fn discard(&mut self, conn: &ConnectionInner) {
		if let Some(stmt) = self.statement.take() {
			let _ = conn.release(stmt);
		}
		self.clear();
	}

	fn fail(&mut self, conn: &ConnectionInner, err: Error) -> Error {
		self.discard(conn);
		err
	}

	/// Returns the cursor to idle. Unless `force` is set, leftover statements
	/// or bulk parameter sets are reported as incomplete execution.
	fn reset(&mut self, conn: Option<&ConnectionInner>, force: bool) -> Result<()> {
		let unfinished = self.status != Status::Done;
		let remaining = self.statement.as_ref().and_then(Statement::next_sql).map(str::to_string);

		let released = match (self.statement.take(), conn) {
			(Some(stmt), Some(conn)) => conn.release(stmt),
			_ => Ok(()),
		};

		if force {
			if unfinished && (remaining.is_some() || self.bulk.is_some()) {
				warn!(
					remaining = ?remaining,
					bulk = self.bulk.is_some(),
					"discarding unfinished execution"
				);
			}
			self.clear();
			return Ok(());
		}

		let mut result = released;
		if result.is_ok() && unfinished {
			if let Some(remaining) = remaining {
				result = Err(Error::IncompleteExecution(Incomplete::Statements { remaining }));
			} else if let Some(source) = self.bulk.as_mut() {
				result = match source.next() {
					Some(Ok(_)) => Err(Error::IncompleteExecution(Incomplete::Bulk)),
					Some(Err(err)) => Err(err),
					None => Ok(()),
				};
			}
		}
		self.clear();
		result
	}

	/// Binds the current statement from the current offset and runs the exec
	/// trace over what it consumed.
	fn bind_and_trace(&mut self, conn: &ConnectionInner) -> Result<()> {
		let Some(stmt) = self.statement.as_mut() else {
			return Ok(());
		};
		let from = self.offset;
		self.offset = resolve(stmt, self.bindings.as_ref(), from, conn.config())?;
		if let Some(exec_trace) = self.exec_trace.clone() {
			run_exec_trace(&exec_trace, stmt.sql(), self.bindings.as_ref(), from, self.offset)?;
		}
		Ok(())
	}

	fn start(&mut self, conn: &ConnectionInner) -> Result<()> {
		if let Err(err) = self.bind_and_trace(conn) {
			return Err(self.fail(conn, err));
		}
		self.status = Status::Begin;
		self.advance(conn)
	}

	/// Steps until a row is available or the batch, and any bulk cycles, are
	/// exhausted. Any failure leaves the cursor idle.
	fn advance(&mut self, conn: &ConnectionInner) -> Result<()> {
		loop {
			let Some(stmt) = self.statement.as_mut() else {
				self.status = Status::Done;
				return Ok(());
			};
			match stmt.step() {
				Ok(Step::Row) => {
					self.status = Status::Row;
					return Ok(());
				}
				Ok(Step::Done) => trace!(sql = stmt.sql(), "statement complete"),
				Err(err) => return Err(self.fail(conn, err)),
			}

			self.status = Status::Done;
			if let Err(err) = self.next_statement(conn) {
				return Err(self.fail(conn, err));
			}
			if self.statement.is_none() {
				return Ok(());
			}
			if let Err(err) = self.bind_and_trace(conn) {
				return Err(self.fail(conn, err));
			}
			self.status = Status::Begin;
		}
	}

	/// Replaces the finished statement with the next one in the batch, or
	/// with the bulk statement primed for the next parameter set. Leaves no
	/// statement once everything has run.
	fn next_statement(&mut self, conn: &ConnectionInner) -> Result<()> {
		let Some(stmt) = self.statement.take() else {
			return Ok(());
		};
		if stmt.has_next() {
			self.statement = conn.advance(stmt)?;
			if let Some(next) = &self.statement {
				debug!(sql = next.sql(), "advanced to next statement");
			}
			return Ok(());
		}

		let next_set = match self.bulk.as_mut() {
			Some(source) => source.next().transpose()?,
			None => None,
		};
		conn.release(stmt)?;

		match (next_set, self.bulk_query.clone()) {
			(Some(bindings), Some(query)) => {
				self.bindings = Some(bindings);
				self.offset = 0;
				self.statement = Some(conn.prepare(&query)?);
			}
			_ => self.clear(),
		}
		Ok(())
	}
}

pub(crate) struct CursorInner {
	id: u64,
	connection: Weak<ConnectionInner>,
	in_use: AtomicBool,
	state: Mutex<CursorState>,
}

impl CursorInner {
	pub(crate) const fn id(&self) -> u64 {
		self.id
	}

	fn state(&self) -> MutexGuard<'_, CursorState> {
		lock(&self.state)
	}

	fn live_connection(&self) -> Result<Arc<ConnectionInner>> {
		self.connection.upgrade().filter(|conn| !conn.is_closed()).ok_or(Error::ConnectionClosed)
	}

	/// Whether a batch or bulk run is still in progress.
	pub(crate) fn is_busy(&self) -> bool {
		self.state().status != Status::Done
	}

	pub(crate) fn close(&self, conn: Option<&ConnectionInner>, force: bool) -> Result<()> {
		let _in_use = InUse::acquire(&self.in_use)?;
		self.state().reset(conn, force)
	}
}

/// Runs SQL batches against one connection and yields their rows.
///
/// Every method fails with [`Error::ThreadingViolation`] while another call on
/// the same cursor is in progress, including calls made from inside its own
/// trace callbacks.
pub struct Cursor {
	inner: Arc<CursorInner>,
}

impl Cursor {
	pub(crate) fn new(connection: &Arc<ConnectionInner>, id: u64) -> (Self, Weak<CursorInner>) {
		let inner = Arc::new(CursorInner {
			id,
			connection: Arc::downgrade(connection),
			in_use: AtomicBool::new(false),
			state: Mutex::new(CursorState::new()),
		});
		let weak = Arc::downgrade(&inner);
		(Self { inner }, weak)
	}

	fn enter(&self) -> Result<(InUse<'_>, Arc<ConnectionInner>)> {
		let in_use = InUse::acquire(&self.inner.in_use)?;
		let conn = self.inner.live_connection()?;
		Ok((in_use, conn))
	}

	/// Runs `sql` up to its first row. A flat list of positional bindings is
	/// shared across all statements of the batch in order.
	pub fn execute(&self, sql: &str, bindings: Option<Bindings>) -> Result<&Self> {
		let (_in_use, conn) = self.enter()?;
		let mut state = self.inner.state();
		state.reset(Some(conn.as_ref()), false)?;

		debug!(cursor = self.inner.id, sql, "execute");
		let stmt = conn.prepare(sql)?;
		state.bindings = bindings;
		state.offset = 0;
		state.statement = Some(stmt);
		state.start(&conn)?;
		Ok(self)
	}

	/// Runs `sql` once per parameter set. An empty source runs nothing.
	pub fn executemany<I>(&self, sql: &str, sets: I) -> Result<&Self>
	where
		I: IntoIterator<Item = Bindings>,
		I::IntoIter: Send + 'static,
	{
		self.executemany_from(sql, Box::new(sets.into_iter().map(Ok::<Bindings, Error>)))
	}

	/// Like [`Cursor::executemany`], for sources that can fail while producing
	/// the next parameter set.
	pub fn executemany_from(&self, sql: &str, mut source: BindingsSource) -> Result<&Self> {
		let (_in_use, conn) = self.enter()?;
		let mut state = self.inner.state();
		state.reset(Some(conn.as_ref()), false)?;

		let Some(first) = source.next().transpose()? else {
			debug!(cursor = self.inner.id, sql, "executemany with no parameter sets");
			return Ok(self);
		};

		debug!(cursor = self.inner.id, sql, "executemany");
		let stmt = conn.prepare(sql)?;
		state.bulk = Some(source);
		state.bulk_query = Some(sql.to_string());
		state.bindings = Some(first);
		state.offset = 0;
		state.statement = Some(stmt);
		state.start(&conn)?;
		Ok(self)
	}

	/// The next row, or `None` once everything has run.
	pub fn fetch_next(&self) -> Result<Option<Row>> {
		let (_in_use, conn) = self.enter()?;
		let mut state = self.inner.state();
		loop {
			if state.status == Status::Begin {
				state.advance(&conn)?;
			}
			if state.status == Status::Done {
				return Ok(None);
			}

			state.status = Status::Begin;
			let row = state.statement.as_ref().map(Statement::row).unwrap_or_default();
			let Some(row_trace) = state.row_trace.clone() else {
				return Ok(Some(row));
			};
			if let Some(row) = row_trace(row)? {
				return Ok(Some(row));
			}
		}
	}

	pub fn rows(&self) -> Rows<'_> {
		Rows { cursor: self }
	}

	pub fn fetch_all(&self) -> Result<Vec<Row>> {
		self.rows().collect()
	}

	/// Column names and declared types of the statement being executed.
	pub fn describe_columns(&self) -> Result<Vec<ColumnDescription>> {
		let (_in_use, _conn) = self.enter()?;
		let state = self.inner.state();
		state.statement.as_ref().map(Statement::describe).ok_or(Error::ExecutionComplete)
	}

	/// Whether the statement being executed leaves the database unchanged.
	pub fn is_readonly(&self) -> Result<bool> {
		let (_in_use, _conn) = self.enter()?;
		let state = self.inner.state();
		state.statement.as_ref().map(Statement::is_readonly).ok_or(Error::ExecutionComplete)
	}

	/// Returns the cursor to idle. Without `force`, unfinished batches and bulk
	/// runs are reported; with it, they are discarded silently. Closing a
	/// cursor whose connection is gone does nothing.
	pub fn close(&self, force: bool) -> Result<()> {
		let conn = self.inner.connection.upgrade().filter(|conn| !conn.is_closed());
		match conn {
			Some(conn) => self.inner.close(Some(conn.as_ref()), force),
			None => self.inner.close(None, true),
		}
	}

	pub fn set_exec_trace(&self, exec_trace: Option<ExecTrace>) -> Result<()> {
		let (_in_use, _conn) = self.enter()?;
		self.inner.state().exec_trace = exec_trace;
		Ok(())
	}

	pub fn exec_trace(&self) -> Result<Option<ExecTrace>> {
		let (_in_use, _conn) = self.enter()?;
		Ok(self.inner.state().exec_trace.clone())
	}

	pub fn set_row_trace(&self, row_trace: Option<RowTrace>) -> Result<()> {
		let (_in_use, _conn) = self.enter()?;
		self.inner.state().row_trace = row_trace;
		Ok(())
	}

	pub fn row_trace(&self) -> Result<Option<RowTrace>> {
		let (_in_use, _conn) = self.enter()?;
		Ok(self.inner.state().row_trace.clone())
	}

	pub fn connection(&self) -> Result<Connection> {
		let (_in_use, conn) = self.enter()?;
		Ok(Connection::from_inner(conn))
	}
}

impl Drop for Cursor {
	fn drop(&mut self) {
		let conn = self.inner.connection.upgrade();
		if let Some(conn) = &conn {
			self.inner.state().discard(conn);
			conn.deregister(self.inner.id);
		} else {
			let mut state = self.inner.state();
			state.statement = None;
			state.clear();
		}
	}
}

impl fmt::Debug for Cursor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cursor").field("id", &self.inner.id).finish_non_exhaustive()
	}
}

pub struct Rows<'a> {
	cursor: &'a Cursor,
}

impl Iterator for Rows<'_> {
	type Item = Result<Row>;

	fn next(&mut self) -> Option<Self::Item> {
		self.cursor.fetch_next().transpose()
	}
}
