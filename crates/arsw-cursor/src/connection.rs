use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::cache::{CacheStats, StatementCache};
use crate::config::Config;
use crate::cursor::{Cursor, CursorInner};
use crate::error::{Error, Result, check_ok, sqlite_error};
use crate::ffi;
use crate::statement::Statement;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Database {
	db: Option<NonNull<ffi::Sqlite3>>,
	cache: StatementCache,
}

// Opened with SQLITE_OPEN_FULLMUTEX and only touched under the connection lock.
unsafe impl Send for Database {}

impl Database {
	fn handle(&self) -> Result<NonNull<ffi::Sqlite3>> {
		self.db.ok_or(Error::ConnectionClosed)
	}

	fn close(&mut self) -> Result<()> {
		self.cache.clear();
		let Some(db) = self.db.take() else {
			return Ok(());
		};
		let code = unsafe { ffi::sqlite3_close_v2(db.as_ptr()) };
		check_ok(std::ptr::null_mut(), code)
	}
}

impl Drop for Database {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

pub(crate) struct ConnectionInner {
	filename: String,
	config: Config,
	database: Mutex<Option<Database>>,
	dependents: Mutex<HashMap<u64, Weak<CursorInner>>>,
	next_cursor: AtomicU64,
}

impl ConnectionInner {
	pub(crate) const fn config(&self) -> &Config {
		&self.config
	}

	pub(crate) fn is_closed(&self) -> bool {
		lock(&self.database).is_none()
	}

	fn with_database<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
		let mut guard = lock(&self.database);
		let database = guard.as_mut().ok_or(Error::ConnectionClosed)?;
		f(database)
	}

	pub(crate) fn prepare(&self, sql: &str) -> Result<Statement> {
		self.with_database(|database| {
			let db = database.handle()?;
			database.cache.prepare(db, sql)
		})
	}

	pub(crate) fn advance(&self, stmt: Statement) -> Result<Option<Statement>> {
		self.with_database(|database| {
			let db = database.handle()?;
			database.cache.advance(db, stmt)
		})
	}

	/// Gives a statement back to the cache. After close the statement is
	/// simply finalized.
	pub(crate) fn release(&self, stmt: Statement) -> Result<()> {
		let mut guard = lock(&self.database);
		match guard.as_mut() {
			Some(database) => database.cache.release(stmt),
			None => {
				drop(stmt);
				Ok(())
			}
		}
	}

	pub(crate) fn deregister(&self, cursor: u64) {
		lock(&self.dependents).remove(&cursor);
	}
}

impl Drop for ConnectionInner {
	fn drop(&mut self) {
		let dependents = self.dependents.get_mut().unwrap_or_else(PoisonError::into_inner);
		let busy = dependents.values().filter_map(Weak::upgrade).filter(|c| c.is_busy()).count();
		if busy > 0 {
			warn!(
				path = %self.filename,
				cursors = busy,
				"connection dropped with cursors still executing"
			);
		}
	}
}

/// A handle to one open database. Clones share the same connection, which
/// closes when [`Connection::close`] is called or the last handle is dropped.
#[derive(Clone)]
pub struct Connection {
	inner: Arc<ConnectionInner>,
}

impl Connection {
	pub fn open(path: &str) -> Result<Self> {
		Self::open_with(path, Config::default())
	}

	pub fn open_in_memory() -> Result<Self> {
		Self::open(":memory:")
	}

	pub fn open_with(path: &str, config: Config) -> Result<Self> {
		let path_c = CString::new(path).map_err(|_| Error::Sqlite {
			code: ffi::SQLITE_MISUSE,
			message: "database path contains a NUL byte".to_string(),
		})?;

		let mut db: *mut ffi::Sqlite3 = std::ptr::null_mut();
		let code = unsafe {
			ffi::sqlite3_open_v2(path_c.as_ptr(), &raw mut db, config.open_flags(), std::ptr::null())
		};
		if code != ffi::SQLITE_OK {
			let error = sqlite_error(db, code);
			if !db.is_null() {
				let _ = unsafe { ffi::sqlite3_close_v2(db) };
			}
			return Err(error);
		}

		let db = NonNull::new(db).ok_or_else(|| Error::Sqlite {
			code: ffi::SQLITE_MISUSE,
			message: "SQLite returned a null connection handle".to_string(),
		})?;

		let _ = unsafe { ffi::sqlite3_extended_result_codes(db.as_ptr(), 1) };
		debug!(path, cache = config.statement_cache_size, "opened connection");

		let database =
			Database { db: Some(db), cache: StatementCache::new(config.statement_cache_size) };
		Ok(Self {
			inner: Arc::new(ConnectionInner {
				filename: path.to_string(),
				config,
				database: Mutex::new(Some(database)),
				dependents: Mutex::new(HashMap::new()),
				next_cursor: AtomicU64::new(1),
			}),
		})
	}

	pub(crate) const fn from_inner(inner: Arc<ConnectionInner>) -> Self {
		Self { inner }
	}

	pub fn cursor(&self) -> Result<Cursor> {
		if self.inner.is_closed() {
			return Err(Error::ConnectionClosed);
		}
		let id = self.inner.next_cursor.fetch_add(1, Ordering::Relaxed);
		let (cursor, weak) = Cursor::new(&self.inner, id);
		lock(&self.inner.dependents).insert(id, weak);
		Ok(cursor)
	}

	/// Closes every cursor of this connection with the same `force`, then the
	/// database itself. A non-forced close fails, leaving everything open, if
	/// any cursor still has work outstanding.
	pub fn close(&self, force: bool) -> Result<()> {
		if self.inner.is_closed() {
			return Ok(());
		}

		let cursors: Vec<Arc<CursorInner>> =
			lock(&self.inner.dependents).values().filter_map(Weak::upgrade).collect();
		for cursor in cursors {
			if let Err(err) = cursor.close(Some(self.inner.as_ref()), force) {
				if force {
					warn!(cursor = cursor.id(), error = %err, "cursor could not be closed");
				}
				return Err(err);
			}
		}

		let closed = lock(&self.inner.database).take();
		lock(&self.inner.dependents).clear();
		if let Some(mut database) = closed {
			database.close()?;
			debug!(path = %self.inner.filename, "closed connection");
		}
		Ok(())
	}

	pub fn is_closed(&self) -> bool {
		self.inner.is_closed()
	}

	pub fn filename(&self) -> &str {
		&self.inner.filename
	}

	pub fn config(&self) -> &Config {
		self.inner.config()
	}

	pub fn cache_stats(&self) -> Result<CacheStats> {
		self.inner.with_database(|database| Ok(database.cache.stats()))
	}

	pub fn changes(&self) -> Result<i64> {
		self.inner.with_database(|database| {
			let db = database.handle()?;
			Ok(unsafe { ffi::sqlite3_changes64(db.as_ptr()) })
		})
	}

	pub fn last_insert_rowid(&self) -> Result<i64> {
		self.inner.with_database(|database| {
			let db = database.handle()?;
			Ok(unsafe { ffi::sqlite3_last_insert_rowid(db.as_ptr()) })
		})
	}

	/// Whether both handles refer to the same underlying connection.
	pub fn same_as(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for Connection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("filename", &self.inner.filename)
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}
