//! Compiled statements parked between uses, keyed by their exact query text.

use std::collections::VecDeque;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::error::Result;
use crate::ffi;
use crate::statement::Statement;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
}

impl CacheStats {
	#[must_use]
	#[expect(clippy::cast_precision_loss, reason = "ratio only needs to be approximate")]
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
	}
}

pub(crate) struct StatementCache {
	capacity: usize,
	idle: VecDeque<Statement>,
	stats: CacheStats,
}

impl StatementCache {
	pub(crate) const fn new(capacity: usize) -> Self {
		Self { capacity, idle: VecDeque::new(), stats: CacheStats { hits: 0, misses: 0, evictions: 0 } }
	}

	/// Hands out a statement for the first statement in `query`, reusing an
	/// idle one compiled from identical text when there is one.
	pub(crate) fn prepare(&mut self, db: NonNull<ffi::Sqlite3>, query: &str) -> Result<Statement> {
		if let Some(stmt) =
			self.idle.iter().rposition(|stmt| stmt.query() == query).and_then(|i| self.idle.remove(i))
		{
			self.stats.hits += 1;
			trace!(sql = stmt.sql(), "statement cache hit");
			return Ok(stmt);
		}

		self.stats.misses += 1;
		let stmt = Statement::prepare(db, query)?;
		debug!(sql = stmt.sql(), has_next = stmt.has_next(), "compiled statement");
		Ok(stmt)
	}

	/// Releases `stmt` and prepares the statement that follows it in the same
	/// batch. `None` when the batch is finished.
	pub(crate) fn advance(
		&mut self,
		db: NonNull<ffi::Sqlite3>,
		stmt: Statement,
	) -> Result<Option<Statement>> {
		let next = stmt.next_sql().map(str::to_string);
		self.release(stmt)?;
		next.map(|sql| self.prepare(db, &sql)).transpose()
	}

	/// Returns a statement for reuse. The result is the reset status, which
	/// repeats any error from the statement's last step.
	pub(crate) fn release(&mut self, mut stmt: Statement) -> Result<()> {
		let status = stmt.reset();
		if self.capacity == 0 || !stmt.is_compiled() {
			return status;
		}

		self.idle.push_back(stmt);
		while self.idle.len() > self.capacity {
			if let Some(evicted) = self.idle.pop_front() {
				self.stats.evictions += 1;
				debug!(sql = evicted.sql(), "evicted cached statement");
			}
		}
		status
	}

	pub(crate) fn clear(&mut self) {
		if !self.idle.is_empty() {
			debug!(count = self.idle.len(), "finalizing cached statements");
		}
		self.idle.clear();
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.idle.len()
	}

	pub(crate) const fn stats(&self) -> CacheStats {
		self.stats
	}
}

#[cfg(test)]
mod tests {
	use std::ffi::CString;

	use super::*;

	struct MemoryDb(NonNull<ffi::Sqlite3>);

	impl MemoryDb {
		fn open() -> Self {
			let name = CString::new(":memory:").expect("static name has no NUL");
			let mut db = std::ptr::null_mut();
			let flags = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
			let code =
				unsafe { ffi::sqlite3_open_v2(name.as_ptr(), &raw mut db, flags, std::ptr::null()) };
			assert_eq!(code, ffi::SQLITE_OK);
			Self(NonNull::new(db).expect("open returns a handle"))
		}
	}

	impl Drop for MemoryDb {
		fn drop(&mut self) {
			let _ = unsafe { ffi::sqlite3_close_v2(self.0.as_ptr()) };
		}
	}

	#[test]
	fn reuses_statements_with_identical_text() {
		let db = MemoryDb::open();
		let mut cache = StatementCache::new(4);

		let stmt = cache.prepare(db.0, "select 1").expect("prepare first time");
		cache.release(stmt).expect("release");
		let stmt = cache.prepare(db.0, "select 1").expect("prepare second time");
		cache.release(stmt).expect("release again");

		assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
		assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn hit_rate_of_an_unused_cache_is_zero() {
		assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
	}

	#[test]
	fn advance_walks_a_batch_in_order() {
		let db = MemoryDb::open();
		let mut cache = StatementCache::new(4);

		let first = cache.prepare(db.0, "select 1; select 2;  -- done").expect("prepare batch");
		assert_eq!(first.sql(), "select 1;");
		let second = cache.advance(db.0, first).expect("advance").expect("second statement");
		assert_eq!(second.sql(), "select 2;");
		assert!(!second.has_next());
		assert!(cache.advance(db.0, second).expect("advance past end").is_none());
	}

	#[test]
	fn evicts_oldest_beyond_capacity() {
		let db = MemoryDb::open();
		let mut cache = StatementCache::new(1);

		let a = cache.prepare(db.0, "select 'a'").expect("prepare a");
		let b = cache.prepare(db.0, "select 'b'").expect("prepare b");
		cache.release(a).expect("release a");
		cache.release(b).expect("release b");

		assert_eq!(cache.len(), 1);
		assert_eq!(cache.stats().evictions, 1);
		let _ = cache.prepare(db.0, "select 'b'").expect("b is still cached");
		assert_eq!(cache.stats().hits, 1);
	}

	#[test]
	fn zero_capacity_never_keeps_statements() {
		let db = MemoryDb::open();
		let mut cache = StatementCache::new(0);

		let stmt = cache.prepare(db.0, "select 1").expect("prepare");
		cache.release(stmt).expect("release");
		assert_eq!(cache.len(), 0);
	}

	#[test]
	fn comment_only_text_has_no_compiled_statement() {
		let db = MemoryDb::open();
		let mut cache = StatementCache::new(4);

		let stmt = cache.prepare(db.0, "-- nothing here").expect("prepare comment");
		assert!(!stmt.is_compiled());
		assert_eq!(stmt.parameter_count(), 0);
		cache.release(stmt).expect("release comment");
		assert_eq!(cache.len(), 0);
	}
}
