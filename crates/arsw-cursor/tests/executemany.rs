use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arsw_cursor::{
	Bindings, BindingsSource, Connection, Error, ErrorKind, Incomplete, TracedBindings, Value,
	exec_trace,
};

fn int(v: i64) -> Value {
	Value::Integer(v)
}

fn one(v: i64) -> Bindings {
	Bindings::positional([v])
}

#[test]
fn empty_source_is_a_no_op() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	cursor
		.set_exec_trace(Some(exec_trace(move |_, _| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(true)
		})))
		.expect("install exec trace");
	let before = db.cache_stats().expect("stats before");

	cursor.executemany("insert into nowhere values(?)", Vec::new()).expect("empty executemany");

	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert_eq!(db.cache_stats().expect("stats after"), before);
	assert_eq!(cursor.fetch_next().expect("fetch"), None);
	assert!(matches!(cursor.describe_columns(), Err(Error::ExecutionComplete)));
}

#[test]
fn runs_the_statement_once_per_set() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	cursor.execute("create table t(x, y)", None).expect("create table");

	let sets = vec![
		Bindings::Positional(vec![int(1), Value::from("a")]),
		Bindings::Positional(vec![int(2), Value::from("b")]),
		Bindings::Positional(vec![int(3), Value::from("c")]),
	];
	cursor.executemany("insert into t values(?, ?)", sets).expect("executemany");
	assert_eq!(cursor.fetch_next().expect("inserts produce no rows"), None);

	let rows = cursor.execute("select count(*), group_concat(y, '') from t", None).expect("count");
	assert_eq!(rows.fetch_all().expect("rows"), vec![vec![int(3), Value::from("abc")]]);
}

#[test]
fn rows_of_every_cycle_are_returned() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let rows = cursor
		.executemany("select ?", vec![one(1), one(2), one(3)])
		.expect("executemany")
		.fetch_all()
		.expect("drain");
	assert_eq!(rows, vec![vec![int(1)], vec![int(2)], vec![int(3)]]);

	let named = vec![Bindings::named([("x", 1_i64)]), Bindings::named([("x", 2_i64)])];
	let rows =
		cursor.executemany("select :x * 2", named).expect("named executemany").fetch_all();
	assert_eq!(rows.expect("drain named"), vec![vec![int(2)], vec![int(4)]]);
}

#[test]
fn multi_statement_text_runs_whole_for_each_set() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	cursor.execute("create table t(x)", None).expect("create table");

	cursor
		.executemany(
			"insert into t values(?); insert into t values(?)",
			vec![Bindings::positional([1_i64, 2]), Bindings::positional([3_i64, 4])],
		)
		.expect("executemany batch");

	let rows = cursor.execute("select x from t order by x", None).expect("select").fetch_all();
	assert_eq!(rows.expect("rows"), vec![vec![int(1)], vec![int(2)], vec![int(3)], vec![int(4)]]);
}

#[test]
fn abandoning_a_bulk_run_is_incomplete() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.executemany("select ?", vec![one(1), one(2)]).expect("executemany");
	let err = cursor.execute("select 3", None).expect_err("bulk sets remain");
	assert!(matches!(err, Error::IncompleteExecution(Incomplete::Bulk)));
	assert_eq!(err.kind(), ErrorKind::IncompleteExecution);

	let rows = cursor.execute("select 3", None).expect("cursor was reset").fetch_all();
	assert_eq!(rows.expect("rows"), vec![vec![int(3)]]);
}

#[test]
fn last_cycle_may_be_left_unread() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.executemany("select ?", vec![one(1)]).expect("executemany");
	cursor.execute("select 2", None).expect("no sets remain");
}

#[test]
fn source_errors_propagate_when_reached() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let source: BindingsSource = Box::new(
		vec![Ok(one(1)), Err(Error::callback(std::io::Error::other("source failed")))].into_iter(),
	);
	cursor.executemany_from("select ?", source).expect("first set runs");
	assert_eq!(cursor.fetch_next().expect("first row"), Some(vec![int(1)]));

	let err = cursor.fetch_next().expect_err("source fails on second pull");
	assert_eq!(err.kind(), ErrorKind::Callback);
	assert_eq!(err.to_string(), "source failed");
	assert_eq!(cursor.fetch_next().expect("cursor is idle"), None);
}

#[test]
fn failing_first_pull_runs_nothing() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let source: BindingsSource =
		Box::new(std::iter::once(Err(Error::InvalidBindings("You must supply a dict or a sequence".into()))));
	let err = cursor.executemany_from("select ?", source).expect_err("first pull fails");
	assert_eq!(err.kind(), ErrorKind::Usage);
	assert_eq!(db.cache_stats().expect("stats").misses, 0);
}

#[test]
fn each_set_is_checked_for_arity() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor
		.executemany("select ?, ?", vec![Bindings::positional([1_i64, 2]), one(3)])
		.expect("first set binds");
	assert_eq!(cursor.fetch_next().expect("first row"), Some(vec![int(1), int(2)]));

	let err = cursor.fetch_next().expect_err("second set is short");
	assert!(matches!(err, Error::BindingsCount { required: 2, available: 1, offset: 0 }));
}

#[test]
fn exec_trace_sees_every_cycle() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	let seen = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&seen);
	cursor
		.set_exec_trace(Some(exec_trace(move |sql, bindings| {
			let values = match bindings {
				Some(TracedBindings::Positional(values)) => values.to_vec(),
				_ => Vec::new(),
			};
			log.lock().expect("trace log lock").push((sql.to_string(), values));
			Ok(true)
		})))
		.expect("install exec trace");

	cursor.executemany("select ?", vec![one(1), one(2)]).expect("executemany").fetch_all().expect("drain");

	let seen = seen.lock().expect("trace log lock");
	assert_eq!(
		*seen,
		vec![("select ?".to_string(), vec![int(1)]), ("select ?".to_string(), vec![int(2)])]
	);
}
