use store_middleware::prelude::*;

fn dialects() -> [&'static dyn Dialect; 2] {
    [&CqlDialect, &PostgresDialect]
}

fn placeholder_count(kind: StoreKind, query: &str) -> usize {
    match kind {
        StoreKind::Cassandra => query.matches('?').count(),
        StoreKind::Postgres => query.matches('$').count(),
    }
}

#[test]
fn create_table_lists_every_column_once_with_existence_guard() {
    let schema = SchemaDefinition::new()
        .column("id", "int")
        .column("name", "text")
        .column("tags", "varchar(32)")
        .column("score", "double precision");

    for dialect in dialects() {
        let stmt = dialect
            .build_create_table(Some("app"), "things", &schema, &TableKey::partition("id"))
            .unwrap();
        assert!(stmt.starts_with("CREATE TABLE IF NOT EXISTS app.things ("), "{stmt}");
        for (name, type_tag) in schema.columns() {
            let definition = format!("{name} {type_tag}");
            assert_eq!(stmt.matches(&definition).count(), 1, "{definition} in {stmt}");
        }
    }
}

#[test]
fn create_table_scenario_id_name() {
    let schema = SchemaDefinition::new().column("id", "int").column("name", "text");

    let pg = PostgresDialect
        .build_create_table(None, "t", &schema, &TableKey::NoKey)
        .unwrap();
    assert_eq!(pg, "CREATE TABLE IF NOT EXISTS t (id int, name text)");

    let cql = CqlDialect
        .build_create_table(None, "t", &schema, &TableKey::AllColumns)
        .unwrap();
    assert_eq!(
        cql,
        "CREATE TABLE IF NOT EXISTS t (id int, name text, PRIMARY KEY (id, name))"
    );
}

#[test]
fn insert_binds_values_in_placeholder_order() {
    let row = RowData::new()
        .value("id", 2)
        .value("name", "mohamed")
        .value("age", 28);

    for dialect in dialects() {
        let qp = dialect.build_insert(None, "t", &row).unwrap();
        assert_eq!(placeholder_count(dialect.kind(), &qp.query), 3, "{}", qp.query);
        assert_eq!(
            qp.params,
            vec![
                RowValues::Int(2),
                RowValues::Text("mohamed".to_string()),
                RowValues::Int(28),
            ]
        );
        // values travel as parameters, never as literals
        assert!(!qp.query.contains("mohamed"), "{}", qp.query);
        assert!(!qp.query.contains("28"), "{}", qp.query);
    }
}

#[test]
fn hostile_values_stay_out_of_the_statement() {
    let payload = "x'); DROP TABLE t; --";
    let row = RowData::new().value("name", payload);
    for dialect in dialects() {
        let insert = dialect.build_insert(None, "t", &row).unwrap();
        assert!(!insert.query.contains("DROP"), "{}", insert.query);
        assert_eq!(insert.params, vec![RowValues::Text(payload.to_string())]);

        let update = dialect.build_update(None, "t", &row, "id = 1").unwrap();
        assert!(!update.query.contains("DROP"), "{}", update.query);
    }
}

#[test]
fn empty_inputs_are_rejected_at_build_time() {
    let empty_row = RowData::new();
    let empty_schema = SchemaDefinition::new();
    for dialect in dialects() {
        assert!(matches!(
            dialect.build_insert(None, "t", &empty_row),
            Err(StoreMiddlewareError::InvalidRow(_))
        ));
        assert!(matches!(
            dialect.build_update(None, "t", &empty_row, "id = 1"),
            Err(StoreMiddlewareError::InvalidRow(_))
        ));
        assert!(matches!(
            dialect.build_create_table(None, "t", &empty_schema, &TableKey::AllColumns),
            Err(StoreMiddlewareError::InvalidSchema(_))
        ));
    }
}

#[test]
fn malformed_names_are_rejected() {
    let schema = SchemaDefinition::new().column("id", "int");
    let row = RowData::new().value("bad column", 1);
    for dialect in dialects() {
        assert!(matches!(
            dialect.build_create_table(None, "t;drop", &schema, &TableKey::AllColumns),
            Err(StoreMiddlewareError::InvalidSchema(_))
        ));
        assert!(matches!(
            dialect.build_insert(None, "t", &row),
            Err(StoreMiddlewareError::InvalidRow(_))
        ));
        assert!(dialect.build_drop_namespace("").is_err());
    }
}

#[test]
fn key_columns_must_exist() {
    let schema = SchemaDefinition::new().column("id", "int");
    let key = TableKey::explicit(["id"], ["missing"]);
    for dialect in dialects() {
        assert!(matches!(
            dialect.build_create_table(None, "t", &schema, &key),
            Err(StoreMiddlewareError::InvalidSchema(_))
        ));
    }
}

#[test]
fn duplicate_entries_are_rejected() {
    let err = SchemaDefinition::try_from_iter([("id", "int"), ("id", "text")]).unwrap_err();
    assert!(matches!(err, StoreMiddlewareError::InvalidSchema(_)));

    let err = RowData::try_from_iter([("id", RowValues::Int(1)), ("id", RowValues::Int(2))])
        .unwrap_err();
    assert!(matches!(err, StoreMiddlewareError::InvalidRow(_)));
}

#[test]
fn drops_carry_existence_guards() {
    for dialect in dialects() {
        let table = dialect.build_drop_table(Some("ns"), "t").unwrap();
        assert!(table.starts_with("DROP TABLE IF EXISTS"), "{table}");
        let ns = dialect.build_drop_namespace("ns").unwrap();
        assert!(ns.contains("IF EXISTS"), "{ns}");
    }
}

#[test]
fn network_topology_keyspace() {
    let spec = ReplicationSpec::NetworkTopology {
        data_centers: vec![("dc1".to_string(), 3), ("dc2".to_string(), 2)],
    };
    let stmt = CqlDialect.build_create_namespace("ks", Some(&spec)).unwrap();
    assert_eq!(
        stmt,
        "CREATE KEYSPACE IF NOT EXISTS ks WITH replication = \
         {'class': 'NetworkTopologyStrategy', 'dc1': 3, 'dc2': 2}"
    );

    let bad = ReplicationSpec::simple(0);
    assert!(CqlDialect.build_create_namespace("ks", Some(&bad)).is_err());

    let hyphenated = ReplicationSpec::NetworkTopology {
        data_centers: vec![("us-east".to_string(), 3)],
    };
    assert_eq!(
        CqlDialect.build_create_namespace("ks", Some(&hyphenated)).unwrap(),
        "CREATE KEYSPACE IF NOT EXISTS ks WITH replication = \
         {'class': 'NetworkTopologyStrategy', 'us-east': 3}"
    );
}

#[test]
fn script_text_splits_into_statements() {
    let script = "-- setup\nCREATE SCHEMA IF NOT EXISTS app;\n\n  // note\nCREATE TABLE IF NOT EXISTS app.t (id int);\n";
    assert_eq!(
        script_statements(script),
        vec![
            "CREATE SCHEMA IF NOT EXISTS app;",
            "CREATE TABLE IF NOT EXISTS app.t (id int);",
        ]
    );
}
