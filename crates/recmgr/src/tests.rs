use crate::{Attribute, DataType, Record, Schema, StoreError, Table, Value};
use predicate::{BinaryOp, Expr};
use tempfile::tempdir;

fn schema() -> Schema {
    Schema::new(
        vec![
            Attribute::new("id", DataType::Int),
            Attribute::new("name", DataType::String(8)),
        ],
        vec![0],
    )
    .unwrap()
}

fn record(schema: &Schema, id: i32, name: &str) -> Record {
    let mut r = Record::new(schema);
    r.set_attr(schema, 0, Value::Int(id)).unwrap();
    r.set_attr(schema, 1, Value::String(name.into())).unwrap();
    r
}

#[test]
fn insert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut r = record(&schema, 1, "alice");
    let rid = table.insert(&mut r).unwrap();
    assert_eq!(r.rid, rid);

    let mut out = Record::new(&schema);
    table.get(rid, &mut out).unwrap();
    assert_eq!(out.get_attr(&schema, 0).unwrap(), Value::Int(1));
    assert_eq!(
        out.get_attr(&schema, 1).unwrap(),
        Value::String("alice".into())
    );
    assert_eq!(table.num_tuples(), 1);

    table.close().unwrap();
}

#[test]
fn persists_records_across_close_and_reopen() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();

    let mut rids = Vec::new();
    {
        let mut table = Table::open(dir.path(), "people").unwrap();
        for i in 0..50 {
            let mut r = record(&schema, i, &format!("n{i}"));
            rids.push(table.insert(&mut r).unwrap());
        }
        assert_eq!(table.num_tuples(), 50);
        table.close().unwrap();
    }

    let mut table = Table::open(dir.path(), "people").unwrap();
    assert_eq!(table.num_tuples(), 50);
    let mut out = Record::new(&schema);
    for (i, rid) in rids.into_iter().enumerate() {
        table.get(rid, &mut out).unwrap();
        assert_eq!(out.get_attr(&schema, 0).unwrap(), Value::Int(i as i32));
    }
    table.close().unwrap();
}

#[test]
fn scan_without_predicate_visits_every_inserted_record() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    for i in 0..20 {
        let mut r = record(&schema, i, "x");
        table.insert(&mut r).unwrap();
    }

    let mut seen = Vec::new();
    let mut scan = table.scan(None);
    let mut rec = Record::new(&schema);
    while scan.next(&mut rec).unwrap() {
        seen.push(rec.get_attr(&schema, 0).unwrap());
    }
    scan.close();

    seen.sort_by_key(|v| match v {
        Value::Int(i) => *i,
        _ => unreachable!(),
    });
    let expected: Vec<_> = (0..20).map(Value::Int).collect();
    assert_eq!(seen, expected);

    table.close().unwrap();
}

#[test]
fn scan_with_predicate_filters_by_column() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    for i in 0..10 {
        let mut r = record(&schema, i, "x");
        table.insert(&mut r).unwrap();
    }

    let predicate = Expr::Binary {
        left: Box::new(Expr::Column(0)),
        op: BinaryOp::Ge,
        right: Box::new(Expr::Literal(Value::Int(5))),
    };

    let mut matched = 0;
    let mut scan = table.scan(Some(&predicate));
    let mut rec = Record::new(&schema);
    while scan.next(&mut rec).unwrap() {
        let Value::Int(id) = rec.get_attr(&schema, 0).unwrap() else {
            unreachable!()
        };
        assert!(id >= 5);
        matched += 1;
    }
    assert_eq!(matched, 5);

    table.close().unwrap();
}

#[test]
fn delete_frees_the_slot_for_reuse() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut r1 = record(&schema, 1, "a");
    let rid1 = table.insert(&mut r1).unwrap();
    table.delete(rid1).unwrap();
    assert_eq!(table.num_tuples(), 0);

    let mut r2 = record(&schema, 2, "b");
    let rid2 = table.insert(&mut r2).unwrap();
    assert_eq!(rid2.page, rid1.page);
    assert_eq!(table.num_tuples(), 1);

    table.close().unwrap();
}

#[test]
fn delete_then_get_reports_record_not_found() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut r = record(&schema, 1, "a");
    let rid = table.insert(&mut r).unwrap();
    table.delete(rid).unwrap();

    let mut out = Record::new(&schema);
    assert!(matches!(
        table.get(rid, &mut out),
        Err(StoreError::RecordNotFound(_))
    ));
    assert!(matches!(
        table.delete(rid),
        Err(StoreError::RecordNotFound(_))
    ));

    table.close().unwrap();
}

#[test]
fn update_overwrites_payload_in_place() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut r = record(&schema, 1, "a");
    table.insert(&mut r).unwrap();

    r.set_attr(&schema, 1, Value::String("updated".into()))
        .unwrap();
    table.update(&r).unwrap();

    let mut out = Record::new(&schema);
    table.get(r.rid, &mut out).unwrap();
    assert_eq!(
        out.get_attr(&schema, 1).unwrap(),
        Value::String("updated".into())
    );

    table.close().unwrap();
}

#[test]
fn insert_spans_multiple_pages_once_one_is_full() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut last_page = 1;
    for i in 0..2000 {
        let mut r = record(&schema, i, "x");
        let rid = table.insert(&mut r).unwrap();
        last_page = last_page.max(rid.page);
    }
    assert!(last_page > 1, "2000 records should have spilled past page 1");
    assert_eq!(table.num_tuples(), 2000);

    table.close().unwrap();
}

#[test]
fn unplaced_rid_is_record_not_found() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut out = Record::new(&schema);
    assert!(matches!(
        table.get(dbcore::Rid::UNPLACED, &mut out),
        Err(StoreError::RecordNotFound(_))
    ));

    table.close().unwrap();
}

#[test]
fn slot_past_slots_per_page_is_record_not_found_not_a_panic() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut r = record(&schema, 1, "a");
    table.insert(&mut r).unwrap();

    let bogus = dbcore::Rid::new(1, 9999);
    let mut out = Record::new(&schema);
    assert!(matches!(
        table.get(bogus, &mut out),
        Err(StoreError::RecordNotFound(_))
    ));
    assert!(matches!(
        table.delete(bogus),
        Err(StoreError::RecordNotFound(_))
    ));
    let mut bad = Record::new(&schema);
    bad.rid = bogus;
    assert!(matches!(
        table.update(&bad),
        Err(StoreError::RecordNotFound(_))
    ));

    table.close().unwrap();
}

#[test]
fn schema_too_large_for_one_page_is_rejected() {
    let dir = tempdir().unwrap();
    let huge_schema = Schema::new(
        vec![Attribute::new("blob", DataType::String(8192))],
        vec![],
    )
    .unwrap();

    let err = Table::create(dir.path(), "huge", huge_schema).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(_) | StoreError::Parameter(_)
    ));
}

#[test]
fn insert_wrong_size_payload_is_rejected() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema.clone()).unwrap();
    let mut table = Table::open(dir.path(), "people").unwrap();

    let mut bad = Record {
        rid: dbcore::Rid::UNPLACED,
        data: vec![0u8; schema.record_size() + 1],
    };
    assert!(matches!(
        table.insert(&mut bad),
        Err(StoreError::Parameter(_))
    ));

    table.close().unwrap();
}

#[test]
fn delete_table_removes_the_backing_file() {
    let dir = tempdir().unwrap();
    let schema = schema();
    Table::create(dir.path(), "people", schema).unwrap();
    assert!(dir.path().join("people.table").exists());

    Table::delete(dir.path(), "people").unwrap();
    assert!(!dir.path().join("people.table").exists());
}
