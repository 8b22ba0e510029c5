use std::collections::HashMap;

use arsw_cursor::{Bindings, ColumnDescription, Connection, Error, ErrorKind, Value};

fn int(v: i64) -> Value {
	Value::Integer(v)
}

#[test]
fn zero_parameter_statements_accept_empty_bindings() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let plain = cursor.execute("select 1", None).expect("execute without bindings").fetch_all();
	assert_eq!(plain.expect("rows without bindings"), vec![vec![int(1)]]);

	let sequence = cursor
		.execute("select 1", Some(Bindings::Positional(Vec::new())))
		.expect("execute with empty sequence")
		.fetch_all();
	assert_eq!(sequence.expect("rows with empty sequence"), vec![vec![int(1)]]);

	let mapping = cursor
		.execute("select 1", Some(Bindings::from(HashMap::new())))
		.expect("execute with empty mapping")
		.fetch_all();
	assert_eq!(mapping.expect("rows with empty mapping"), vec![vec![int(1)]]);
}

#[test]
fn batch_statements_run_in_order() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let rows = cursor
		.execute(
			"create table t(x); insert into t values(2); insert into t values(1); select x from t order by x",
			None,
		)
		.expect("execute batch")
		.fetch_all()
		.expect("drain batch");
	assert_eq!(rows, vec![vec![int(1)], vec![int(2)]]);
}

#[test]
fn rows_from_every_statement_are_returned() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.execute("select 1; select 'two', 2", None).expect("execute batch");
	let rows: Vec<_> = cursor.rows().collect::<Result<_, _>>().expect("iterate rows");
	assert_eq!(rows, vec![vec![int(1)], vec![Value::Text("two".to_string()), int(2)]]);
	assert_eq!(cursor.fetch_next().expect("fetch after end"), None);
}

#[test]
fn engine_errors_carry_codes_and_leave_cursor_idle() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let err = cursor.execute("select * from missing", None).expect_err("unknown table");
	assert_eq!(err.kind(), ErrorKind::Engine);
	assert_eq!(err.primary_code(), Some(1));
	assert!(err.to_string().contains("missing"));

	assert!(matches!(cursor.describe_columns(), Err(Error::ExecutionComplete)));
	let rows = cursor.execute("select 5", None).expect("execute after error").fetch_all();
	assert_eq!(rows.expect("rows after error"), vec![vec![int(5)]]);
}

#[test]
fn failure_mid_batch_is_reported_when_reached() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.execute("select 1; select * from missing; select 3", None).expect("first statement runs");
	assert_eq!(cursor.fetch_next().expect("first row"), Some(vec![int(1)]));

	let err = cursor.fetch_next().expect_err("second statement fails to prepare");
	assert_eq!(err.kind(), ErrorKind::Engine);
	assert_eq!(cursor.fetch_next().expect("cursor is idle after failure"), None);
}

#[test]
fn constraint_violations_report_extended_codes() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	cursor
		.execute("create table u(id integer primary key, name text unique); insert into u(name) values('a')", None)
		.expect("create table");

	let err = cursor.execute("insert into u(name) values('a')", None).expect_err("duplicate name");
	assert_eq!(err.primary_code(), Some(19));
	assert_eq!(err.code(), Some(2067));
}

#[test]
fn describe_columns_reports_declared_types() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	cursor
		.execute("create table t(a INTEGER, b TEXT); insert into t values('abc', 5)", None)
		.expect("create table");

	cursor.execute("select a, b, 1 + 1 as two from t", None).expect("select");
	let description = cursor.describe_columns().expect("describe running statement");
	assert_eq!(
		description,
		vec![
			ColumnDescription { name: "a".to_string(), decltype: Some("INTEGER".to_string()) },
			ColumnDescription { name: "b".to_string(), decltype: Some("TEXT".to_string()) },
			ColumnDescription { name: "two".to_string(), decltype: None },
		]
	);

	let row = cursor.fetch_next().expect("fetch row").expect("one row");
	assert_eq!(row, vec![Value::Text("abc".to_string()), Value::Text("5".to_string()), int(2)]);
}

#[test]
fn describe_columns_fails_without_a_statement() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	assert!(matches!(cursor.describe_columns(), Err(Error::ExecutionComplete)));
	cursor.execute("select 1", None).expect("execute").fetch_all().expect("drain");
	let err = cursor.describe_columns().expect_err("statement completed");
	assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn repeated_queries_reuse_cached_statements() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");
	let before = db.cache_stats().expect("stats before");

	for _ in 0..3 {
		cursor.execute("select 42", None).expect("execute").fetch_all().expect("drain");
	}

	let after = db.cache_stats().expect("stats after");
	assert_eq!(after.misses - before.misses, 1);
	assert_eq!(after.hits - before.hits, 2);
}

#[test]
fn comment_only_sql_produces_no_rows() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.execute("-- nothing to run", None).expect("execute comment");
	assert_eq!(cursor.fetch_next().expect("fetch"), None);

	cursor.execute("select 1; -- trailing", None).expect("execute with trailing comment");
	assert_eq!(cursor.fetch_all().expect("drain"), vec![vec![int(1)]]);
}

#[test]
fn nul_bytes_in_sql_are_rejected() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	let err = cursor.execute("select 1\0", None).expect_err("NUL in SQL");
	assert!(matches!(err, Error::NulInSql));
	assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn readonly_reflects_the_running_statement() {
	let db = Connection::open_in_memory().expect("open memory database");
	let cursor = db.cursor().expect("create cursor");

	cursor.execute("select 1", None).expect("select");
	assert!(cursor.is_readonly().expect("readonly while running"));
	cursor.fetch_all().expect("drain");

	cursor.execute("create table t(x); insert into t values(1) returning x", None).expect("insert");
	assert!(!cursor.is_readonly().expect("insert is not readonly"));
	assert_eq!(cursor.fetch_all().expect("drain returning"), vec![vec![int(1)]]);
	assert_eq!(db.last_insert_rowid().expect("rowid"), 1);
}
