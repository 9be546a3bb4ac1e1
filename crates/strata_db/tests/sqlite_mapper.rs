//! End-to-end mapping against an in-memory SQLite database.
//!
//! Exercises DDL, inserts, chunked multi-row inserts, updates, deletes and
//! scans through the SQLite backend's boolean, unsigned and timestamp
//! transforms.
#![cfg(feature = "sqlite")]

use strata_db::{
    BackendError, BackendRegistry, Connection, DbTimestamp, DbValue, Field, FieldType, HostValue,
    Mapper, Model, SqliteConnection, Tag,
};

const JAN_1_2021_MS: i64 = 1_609_459_200_000;

fn events() -> Model {
    Model::new("events")
        .with_field(Field::new("id", FieldType::I64).with_tag(Tag::parse("primary_key").unwrap()))
        .with_field(
            Field::new("name", FieldType::String)
                .with_tag(Tag::parse("unique,max_length=64").unwrap()),
        )
        .with_field(Field::new("active", FieldType::Bool))
        .with_field(Field::new("at", FieldType::Timestamp))
        .with_field(Field::new("score", FieldType::F64).nullable())
        .with_field(Field::new("hits", FieldType::U32))
        .with_field(Field::new("payload", FieldType::Custom("json".into())).nullable())
        .with_field(Field::new("data", FieldType::Bytes).nullable())
}

fn ts(ms: i64) -> HostValue {
    HostValue::Timestamp(DbTimestamp::from_unix_millis(ms).unwrap())
}

fn event_values(name: &str, active: bool, at_ms: i64) -> Vec<HostValue> {
    vec![
        HostValue::from(name),
        HostValue::Bool(active),
        ts(at_ms),
        HostValue::Float(1.5),
        HostValue::UInt(7),
        HostValue::custom("json", r#"{"a":1}"#),
        HostValue::Bytes(vec![0, 1, 2]),
    ]
}

fn setup() -> (Mapper, SqliteConnection, Model) {
    let mapper = Mapper::new(&BackendRegistry::with_builtin(), "sqlite").unwrap();
    let conn = SqliteConnection::open_in_memory().unwrap();
    let model = events();
    mapper.create_table(&conn, &model).unwrap();
    (mapper, conn, model)
}

#[test]
fn insert_and_select_roundtrip() {
    let (mapper, conn, model) = setup();

    let first = mapper
        .insert(&conn, &model, &event_values("launch", true, JAN_1_2021_MS))
        .unwrap();
    assert_eq!(first.last_insert_id, Some(1));
    assert_eq!(first.rows_affected, 1);

    let second = mapper
        .insert(&conn, &model, &event_values("landing", false, JAN_1_2021_MS + 1))
        .unwrap();
    assert_eq!(second.last_insert_id, Some(2));

    let records = mapper.select_all(&conn, &model).unwrap();
    assert_eq!(records.len(), 2);

    let mut expected = vec![HostValue::Int(1)];
    expected.extend(event_values("launch", true, JAN_1_2021_MS));
    assert_eq!(records[0], expected);
    assert_eq!(records[1][2], HostValue::Bool(false));
}

#[test]
fn transformed_values_are_stored_as_integers() {
    let (mapper, conn, model) = setup();
    mapper
        .insert(&conn, &model, &event_values("launch", true, JAN_1_2021_MS))
        .unwrap();

    let rows = conn
        .query("SELECT active, at, typeof(at) FROM events", &[])
        .unwrap();
    assert_eq!(rows[0].get_raw(0), Some(&DbValue::Integer(1)));
    assert_eq!(rows[0].get_raw(1), Some(&DbValue::Integer(JAN_1_2021_MS)));
    assert_eq!(rows[0].get_raw(2), Some(&DbValue::Text("integer".into())));
}

#[test]
fn find_update_delete_by_primary_key() {
    let (mapper, conn, model) = setup();
    mapper
        .insert(&conn, &model, &event_values("launch", true, JAN_1_2021_MS))
        .unwrap();

    let key = HostValue::Int(1);
    let mut changed = event_values("relaunch", false, JAN_1_2021_MS + 1000);
    changed[3] = HostValue::Null;
    let updated = mapper.update_by_pk(&conn, &model, &key, &changed).unwrap();
    assert_eq!(updated.rows_affected, 1);
    assert_eq!(updated.last_insert_id, None);

    let found = mapper.find_by_pk(&conn, &model, &key).unwrap().unwrap();
    assert_eq!(found[1], HostValue::from("relaunch"));
    assert_eq!(found[2], HostValue::Bool(false));
    assert_eq!(found[3], ts(JAN_1_2021_MS + 1000));
    assert_eq!(found[4], HostValue::Null);

    let deleted = mapper.delete_by_pk(&conn, &model, &key).unwrap();
    assert_eq!(deleted.rows_affected, 1);
    assert!(mapper.find_by_pk(&conn, &model, &key).unwrap().is_none());
}

#[test]
fn insert_many_chunks_under_parameter_limit() {
    let (mapper, conn, model) = setup();

    // 7 bound columns per row: 999 / 7 = 142 rows per statement.
    let rows: Vec<Vec<HostValue>> = (0..500)
        .map(|i| event_values(&format!("event-{}", i), i % 2 == 0, JAN_1_2021_MS + i))
        .collect();
    let result = mapper.insert_many(&conn, &model, &rows).unwrap();
    assert_eq!(result.rows_affected, 500);
    assert_eq!(result.last_insert_id, Some(500));

    let count: i64 = conn
        .query("SELECT COUNT(*) FROM events", &[])
        .unwrap()[0]
        .get(0)
        .unwrap();
    assert_eq!(count, 500);

    let records = mapper.select_all(&conn, &model).unwrap();
    assert_eq!(records[499][1], HostValue::from("event-499"));
    assert_eq!(records[499][3], ts(JAN_1_2021_MS + 499));
}

#[test]
fn null_columns_scan_per_nullability() {
    let (mapper, conn, _) = setup();
    conn.execute_batch("CREATE TABLE loose (flag INTEGER, at INTEGER, name TEXT, n INTEGER)")
        .unwrap();
    conn.execute("INSERT INTO loose VALUES (NULL, NULL, NULL, NULL)", &[])
        .unwrap();

    let strict = Model::new("loose")
        .with_field(Field::new("flag", FieldType::Bool))
        .with_field(Field::new("at", FieldType::Timestamp))
        .with_field(Field::new("name", FieldType::String))
        .with_field(Field::new("n", FieldType::U16));
    let records = mapper.select_all(&conn, &strict).unwrap();
    assert_eq!(
        records[0],
        vec![
            HostValue::Bool(false),
            HostValue::Timestamp(DbTimestamp::epoch()),
            HostValue::String(String::new()),
            HostValue::UInt(0),
        ]
    );

    let nullable = Model::new("loose")
        .with_field(Field::new("flag", FieldType::Bool).nullable())
        .with_field(Field::new("at", FieldType::Timestamp).nullable())
        .with_field(Field::new("name", FieldType::String).nullable())
        .with_field(Field::new("n", FieldType::U16).nullable());
    let records = mapper.select_all(&conn, &nullable).unwrap();
    assert!(records[0].iter().all(HostValue::is_null));
}

#[test]
fn out_of_range_boolean_is_a_scan_error() {
    let (mapper, conn, model) = setup();
    mapper
        .insert(&conn, &model, &event_values("launch", true, JAN_1_2021_MS))
        .unwrap();
    conn.execute("UPDATE events SET active = 2", &[]).unwrap();

    let err = mapper.select_all(&conn, &model).unwrap_err();
    match err {
        BackendError::Scan(scan) => {
            assert_eq!(scan.backend, "sqlite");
            assert_eq!(scan.field, "active");
        }
        other => panic!("expected scan error, got {other:?}"),
    }
}

#[test]
fn driver_failures_carry_statement_context() {
    let mapper = Mapper::new(&BackendRegistry::with_builtin(), "sqlite").unwrap();
    let conn = SqliteConnection::open_in_memory().unwrap();

    let err = mapper
        .insert(&conn, &events(), &event_values("x", true, 0))
        .unwrap_err();
    match err {
        BackendError::Statement { backend, sql, .. } => {
            assert_eq!(backend, "sqlite");
            assert!(sql.starts_with("INSERT INTO \"events\""));
        }
        other => panic!("expected statement error, got {other:?}"),
    }
}

#[test]
fn unique_violation_is_reported_not_retried() {
    let (mapper, conn, model) = setup();
    mapper
        .insert(&conn, &model, &event_values("launch", true, 0))
        .unwrap();
    let err = mapper
        .insert(&conn, &model, &event_values("launch", true, 0))
        .unwrap_err();
    assert!(matches!(err, BackendError::Statement { .. }));
    assert_eq!(mapper.select_all(&conn, &model).unwrap().len(), 1);
}

#[test]
fn values_are_validated_before_binding() {
    let (mapper, conn, model) = setup();

    let mut too_long = event_values("launch", true, 0);
    too_long[0] = HostValue::String("x".repeat(65));
    assert!(matches!(
        mapper.insert(&conn, &model, &too_long),
        Err(BackendError::Transform { .. })
    ));

    let mut null_required = event_values("launch", true, 0);
    null_required[1] = HostValue::Null;
    assert!(matches!(
        mapper.insert(&conn, &model, &null_required),
        Err(BackendError::Transform { .. })
    ));

    assert!(matches!(
        mapper.insert(&conn, &model, &[HostValue::from("short")]),
        Err(BackendError::Arity { expected: 7, actual: 1, .. })
    ));
}

#[test]
fn wide_unsigned_values_survive_storage() {
    let (mapper, conn, _) = setup();
    let model = Model::new("counters")
        .with_field(
            Field::new("slot", FieldType::U64).with_tag(Tag::parse("primary_key=natural").unwrap()),
        )
        .with_field(Field::new("total", FieldType::U64));
    mapper.create_table(&conn, &model).unwrap();

    for (slot, total) in [(u64::MAX, u64::MAX), (9, i64::MAX as u64 + 1), (10, 0)] {
        mapper
            .insert(&conn, &model, &[HostValue::UInt(slot), HostValue::UInt(total)])
            .unwrap();
    }

    let found = mapper
        .find_by_pk(&conn, &model, &HostValue::UInt(u64::MAX))
        .unwrap()
        .unwrap();
    assert_eq!(found, vec![HostValue::UInt(u64::MAX), HostValue::UInt(u64::MAX)]);

    let stored = conn
        .query("SELECT typeof(total) FROM counters ORDER BY slot", &[])
        .unwrap();
    assert!(stored
        .iter()
        .all(|row| row.get_raw(0) == Some(&DbValue::Text("text".into()))));

    // Zero padding keeps text order numeric.
    let ordered = conn
        .query("SELECT slot FROM counters ORDER BY slot", &[])
        .unwrap();
    let slots: Vec<_> = ordered.iter().map(|row| row.get_raw(0).cloned()).collect();
    assert_eq!(
        slots,
        vec![
            Some(DbValue::Text("00000000000000000009".into())),
            Some(DbValue::Text("00000000000000000010".into())),
            Some(DbValue::Text("18446744073709551615".into())),
        ]
    );
}

#[test]
fn sub_millisecond_timestamps_are_not_truncated() {
    let (mapper, conn, model) = setup();
    let mut values = event_values("launch", true, JAN_1_2021_MS);
    values[2] = HostValue::Timestamp(DbTimestamp::from_unix_micros(1_609_459_200_000_123).unwrap());

    let err = mapper.insert(&conn, &model, &values).unwrap_err();
    assert!(matches!(err, BackendError::Transform { ref field, .. } if field == "at"));
    assert!(mapper.select_all(&conn, &model).unwrap().is_empty());
}

#[test]
fn invalid_utf8_text_fails_string_scan() {
    let (mapper, conn, _) = setup();
    conn.execute_batch("CREATE TABLE raw (name TEXT)").unwrap();
    conn.execute("INSERT INTO raw VALUES (CAST(X'FF61' AS TEXT))", &[])
        .unwrap();

    let as_string = Model::new("raw").with_field(Field::new("name", FieldType::String));
    match mapper.select_all(&conn, &as_string).unwrap_err() {
        BackendError::Scan(scan) => {
            assert_eq!(scan.field, "name");
            assert!(scan.found.starts_with("blob"));
        }
        other => panic!("expected scan error, got {other:?}"),
    }

    let as_bytes = Model::new("raw").with_field(Field::new("name", FieldType::Bytes));
    let records = mapper.select_all(&conn, &as_bytes).unwrap();
    assert_eq!(records[0][0], HostValue::Bytes(vec![0xFF, 0x61]));
}

#[test]
fn key_only_model_has_nothing_to_update() {
    let (mapper, conn, _) = setup();
    let model = Model::new("keys")
        .with_field(Field::new("id", FieldType::I64).with_tag(Tag::parse("primary_key").unwrap()));
    mapper.create_table(&conn, &model).unwrap();

    let err = mapper
        .update_by_pk(&conn, &model, &HostValue::Int(1), &[])
        .unwrap_err();
    assert!(matches!(err, BackendError::NothingToUpdate(ref table) if table == "keys"));
}
