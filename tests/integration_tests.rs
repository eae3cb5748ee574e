//! Integration tests for the record mapper
//!
//! These tests run the mapper end to end against an in-memory SQLite database:
//! - Introspection and default synthesis
//! - Create, read, update and delete
//! - Transaction handling on failed inserts
//! - Concurrent reads and inserts through a shared mapper

#[cfg(feature = "sqlite")]
mod sqlite_tests {
    use rust_record_mapper::core::{SemanticType, StructuredCondition};
    use rust_record_mapper::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    table_record! {
        /// A row of `users`
        pub struct User => "users";
    }

    table_record! {
        pub struct Country => "countries", primary_key = "code";
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn setup() -> Mapper<SqliteDatabase> {
        init_logging();
        let db = SqliteDatabase::new();
        db.connect(":memory:").await.expect("Failed to connect");
        db.execute(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name varchar(64) UNIQUE,
                age int(11) NOT NULL,
                score double NOT NULL DEFAULT 1.5,
                flags bit(8)
            )",
        )
        .await
        .expect("Failed to create table");
        Mapper::new(Arc::new(db))
    }

    fn seed(name: &str, age: i64) -> DatabaseRow {
        let mut row = HashMap::new();
        row.insert("name".to_string(), DatabaseValue::from(name));
        row.insert("age".to_string(), DatabaseValue::Long(age));
        row
    }

    async fn create(mapper: &Mapper<SqliteDatabase>, name: &str, age: i64) -> User {
        let mut user: User = mapper.instantiate(seed(name, age)).await.expect("instantiate");
        mapper.save(&mut user).await.expect("Insert failed");
        user
    }

    #[tokio::test]
    async fn test_introspected_attributes() {
        let mapper = setup().await;
        let attributes = mapper.get_attributes("users").await.unwrap();

        let names: Vec<&str> = attributes.names().collect();
        assert_eq!(names, vec!["id", "name", "age", "score", "flags"]);

        let id = attributes.primary().expect("primary key");
        assert_eq!(id.name, "id");
        assert!(id.has_auto_increment);
        assert_eq!(id.semantic_type, SemanticType::Int);

        let age = attributes.get("age").unwrap();
        assert!(!age.nullable);
        assert_eq!(age.default_value, DatabaseValue::Long(0));

        let score = attributes.get("score").unwrap();
        assert_eq!(score.semantic_type, SemanticType::Float);
        assert_eq!(score.default_value, DatabaseValue::Double(1.5));

        assert_eq!(attributes.get("name").unwrap().default_value, DatabaseValue::Null);
        assert_eq!(attributes.get("flags").unwrap().semantic_type, SemanticType::Binary);
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let mapper = setup().await;

        let mut user: User = mapper
            .instantiate(HashMap::from([("name".to_string(), DatabaseValue::from("Ann"))]))
            .await
            .unwrap();
        let outcome = mapper.save(&mut user).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted(DatabaseValue::Long(1)));
        assert!(!mapper.database().in_transaction());

        let mut stored = mapper
            .find_by_primary_key::<User>(1)
            .await
            .unwrap()
            .expect("user 1 was inserted");
        assert_eq!(stored.get("name"), Some(&DatabaseValue::from("Ann")));
        assert_eq!(stored.get("age"), Some(&DatabaseValue::Long(0)));
        assert_eq!(stored.get("score"), Some(&DatabaseValue::Double(1.5)));

        stored.set("age", 33).unwrap();
        assert_eq!(mapper.save(&mut stored).await.unwrap(), SaveOutcome::Updated(true));
        assert_eq!(mapper.count::<User>("age > 30", ()).await.unwrap(), 1);

        assert!(mapper.delete(&stored).await.unwrap());
        assert!(mapper.find_by_primary_key::<User>(1).await.unwrap().is_none());
        assert!(!mapper.delete(&stored).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_order_and_params() {
        let mapper = setup().await;
        create(&mapper, "Ann", 40).await;
        create(&mapper, "Bob", 17).await;
        create(&mapper, "Cy", 25).await;

        let adults = mapper
            .find_all::<User>(
                StructuredCondition::new()
                    .condition("age > :min")
                    .order("name DESC"),
                QueryParams::named([("min", 18)]),
            )
            .await
            .unwrap();
        let keys: Vec<RecordKey> = adults.keys().cloned().collect();
        assert_eq!(keys, vec![RecordKey::Int(3), RecordKey::Int(1)]);

        let minors = mapper
            .find_all::<User>("age < ?", vec![DatabaseValue::Long(18)])
            .await
            .unwrap();
        assert_eq!(minors.len(), 1);
        assert!(minors.contains_key(&RecordKey::Int(2)));

        let everyone = mapper.find_all::<User>((), ()).await.unwrap();
        assert_eq!(everyone.len(), 3);
        assert_eq!(mapper.count::<User>((), ()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() {
        let mapper = setup().await;
        create(&mapper, "Ann", 20).await;

        let mut duplicate: User = mapper.instantiate(seed("Ann", 21)).await.unwrap();
        let err = mapper.save(&mut duplicate).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::QueryExecution);
        assert!(!duplicate.is_set("id"));
        assert!(!mapper.database().in_transaction());
        assert_eq!(mapper.count::<User>((), ()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_inside_caller_transaction() {
        let mapper = setup().await;
        let db = Arc::clone(mapper.database());

        db.begin_transaction().await.unwrap();
        let user = create(&mapper, "Ann", 20).await;
        assert!(user.is_persisted());
        assert!(db.in_transaction());
        db.rollback().await.unwrap();

        assert_eq!(mapper.count::<User>((), ()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_error_is_query_execution_failure() {
        let mapper = setup().await;
        let err = mapper
            .find_all::<User>("no_such_column = 1", ())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueryExecution);
        assert_eq!(err.code(), 10001);
    }

    #[tokio::test]
    async fn test_concurrent_reads() {
        let mapper = Arc::new(setup().await);
        for i in 0..10 {
            create(&mapper, &format!("user{}", i), i).await;
        }

        let mut handles = vec![];
        for id in 1..=10i64 {
            let mapper = Arc::clone(&mapper);
            handles.push(tokio::spawn(async move {
                mapper.find_by_primary_key::<User>(id).await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let user = handle
                .await
                .expect("Task panicked")
                .expect("Query failed")
                .expect("Row missing");
            assert_eq!(user.get("age"), Some(&DatabaseValue::Long(i as i64)));
        }
    }

    #[tokio::test]
    async fn test_text_primary_key_is_kept_on_insert() {
        let mapper = setup().await;
        mapper
            .database()
            .execute(
                "CREATE TABLE countries (
                    code char(2) PRIMARY KEY NOT NULL,
                    name varchar(64) NOT NULL
                )",
            )
            .await
            .unwrap();

        let mut nz: Country = mapper
            .instantiate(HashMap::from([
                ("code".to_string(), DatabaseValue::from("NZ")),
                ("name".to_string(), DatabaseValue::from("New Zealand")),
            ]))
            .await
            .unwrap();
        let outcome = mapper.save(&mut nz).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted(DatabaseValue::from("NZ")));
        assert_eq!(nz.get("code"), Some(&DatabaseValue::from("NZ")));

        let stored = mapper.find_all::<Country>("code = 'NZ'", ()).await.unwrap();
        assert!(stored.contains_key(&RecordKey::from("NZ")));

        assert!(mapper.delete(&nz).await.unwrap());
        assert_eq!(mapper.count::<Country>((), ()).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_inserts_get_their_own_ids() {
        let mapper = Arc::new(setup().await);

        let mut handles = vec![];
        for i in 0..100i64 {
            let mapper = Arc::clone(&mapper);
            handles.push(tokio::spawn(async move {
                let mut user: User = mapper.instantiate(seed(&format!("u{}", i), i)).await?;
                mapper.save(&mut user).await?;
                Ok::<_, DatabaseError>((i, user))
            }));
        }

        for handle in handles {
            let (i, user) = handle.await.expect("Task panicked").expect("Insert failed");
            let id = user
                .get("id")
                .and_then(DatabaseValue::as_long)
                .expect("generated id");
            let stored = mapper
                .find_by_primary_key::<User>(id)
                .await
                .unwrap()
                .expect("Row missing");
            assert_eq!(stored.get("name"), Some(&DatabaseValue::from(format!("u{}", i))));
        }

        assert_eq!(mapper.count::<User>((), ()).await.unwrap(), 100);
        assert!(!mapper.database().in_transaction());
    }

    #[tokio::test]
    async fn test_record_serializes_set_values() {
        let mapper = setup().await;
        let user = create(&mapper, "Ann", 20).await;
        let json: serde_json::Value = serde_json::from_str(&user.to_json().unwrap()).unwrap();
        assert_eq!(json["id"], serde_json::json!({"Long": 1}));
        assert_eq!(json["name"], serde_json::json!({"String": "Ann"}));
    }
}
