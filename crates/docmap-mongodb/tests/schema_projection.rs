//! Projection of richly typed documents to BSON and back

use bson::{doc, oid::ObjectId, Bson};
use chrono::{TimeZone, Utc};
use docmap_mongodb::{
    register, DocumentState, ErrorType, Field, FieldType, MemoryConnection, Persistable, Record,
    Registration, Schema, Validator, Value,
};
use std::sync::Arc;

struct Article(DocumentState);

impl Persistable for Article {
    fn state(&self) -> &DocumentState {
        &self.0
    }

    fn from_state(state: DocumentState) -> Self {
        Article(state)
    }
}

struct StrictArticle(DocumentState);

impl Persistable for StrictArticle {
    fn state(&self) -> &DocumentState {
        &self.0
    }

    fn from_state(state: DocumentState) -> Self {
        StrictArticle(state)
    }
}

fn author_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder("authors")
            .field(
                Field::new("name", FieldType::String)
                    .validator(Validator::required("author name is required")),
            )
            .field(Field::new("account", FieldType::ObjectId).rename("account_id"))
            .build()
            .unwrap(),
    )
}

fn article_schema(strict: bool) -> Schema {
    Schema::builder("articles")
        .field(
            Field::new("title", FieldType::String)
                .validator(Validator::required("title is required"))
                .validator(Validator::max_length(40, "title is too long")),
        )
        .field(Field::new("published_at", FieldType::Date).rename("publishedAt"))
        .field(Field::new("tags", FieldType::set(FieldType::String)))
        .field(Field::new("scores", FieldType::map(FieldType::Number)))
        .field(Field::new("revisions", FieldType::list(FieldType::Date)))
        .field(Field::new("author", FieldType::reference(author_schema())))
        .field(Field::new("preview", FieldType::String).transient())
        .field(Field::new("extra", FieldType::Mixed))
        .strict(strict)
        .build()
        .unwrap()
}

fn register_articles() {
    register::<Article>(
        Registration::new("articles", article_schema(false), Arc::new(MemoryConnection::new()))
            .unwrap(),
    );
    register::<StrictArticle>(
        Registration::new("articles", article_schema(true), Arc::new(MemoryConnection::new()))
            .unwrap(),
    );
}

fn published() -> Value {
    Value::datetime(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
}

fn full_record(account: ObjectId) -> Record {
    Record::new()
        .with("title", "Typed documents")
        .with("published_at", published())
        .with("tags", vec!["rust", "mongodb"])
        .with(
            "scores",
            Value::Object(vec![
                ("clarity".to_string(), Value::Int(4)),
                ("depth".to_string(), Value::Float(3.5)),
            ]),
        )
        .with("revisions", vec![published()])
        .with(
            "author",
            Value::Object(vec![
                ("name".to_string(), Value::from("ann")),
                ("account".to_string(), Value::from(account.to_hex())),
            ]),
        )
        .with("extra", Value::List(vec![Value::Int(1), Value::Null, Value::Bool(true)]))
}

#[tokio::test]
async fn test_round_trip_through_bson() {
    register_articles();
    let account = ObjectId::new();
    let id = ObjectId::new();

    let article = Article::from_state(DocumentState::persisted(id, full_record(account)));
    let validated = article.validate().await.unwrap();
    let persisted = validated.to_persisted().unwrap();

    let expected_published = Bson::DateTime(bson::DateTime::from_millis(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap()
            .timestamp_millis(),
    ));
    assert_eq!(persisted.get("publishedAt"), Some(&expected_published));
    assert!(persisted.get("published_at").is_none());
    assert_eq!(
        persisted.get_document("author").unwrap(),
        &doc! { "name": "ann", "account_id": account }
    );
    assert_eq!(
        persisted.get_document("scores").unwrap(),
        &doc! { "clarity": 4_i64, "depth": 3.5 }
    );

    let loaded = Article::from_persisted(&persisted).unwrap();
    assert_eq!(loaded.identity(), Some(id));
    assert_eq!(loaded.record(), validated.record());
}

#[tokio::test]
async fn test_transient_fields_are_validated_but_not_stored() {
    register_articles();
    let record = full_record(ObjectId::new()).with("preview", 12);

    let err = Article::new(record.clone()).validate().await.err().unwrap();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.for_field("preview").unwrap().error_type, ErrorType::TypeError);

    let fixed = Article::new(record.with("preview", "Typed…"));
    let persisted = fixed.validate().await.unwrap().to_persisted().unwrap();
    assert!(!persisted.contains_key("preview"));
}

#[tokio::test]
async fn test_type_errors_carry_nested_paths() {
    register_articles();
    let record = full_record(ObjectId::new())
        .with("tags", vec!["rust", "rust"])
        .with(
            "author",
            Value::Object(vec![
                ("name".to_string(), Value::from("ann")),
                ("account".to_string(), Value::from("not-an-id")),
            ]),
        );

    let err = Article::new(record).save().await.err().unwrap();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.for_field("tags").unwrap().message.contains("[1]: duplicate"));
    assert!(errors
        .for_field("author")
        .unwrap()
        .message
        .starts_with(".account:"));
}

#[tokio::test]
async fn test_unknown_fields_follow_strict_mode() {
    register_articles();
    let record = full_record(ObjectId::new()).with("color", "red");

    let lenient = Article::new(record.clone()).validate().await.unwrap();
    let persisted = lenient.to_persisted().unwrap();
    assert_eq!(persisted.get_str("color").unwrap(), "red");

    let err = StrictArticle::new(record).validate().await.err().unwrap();
    assert_eq!(
        err.validation_errors().unwrap().for_field("color").unwrap().error_type,
        ErrorType::ExtraForbidden
    );

    let loaded = StrictArticle::from_persisted(&persisted).unwrap();
    assert!(!loaded.record().contains("color"));
}

#[tokio::test]
async fn test_date_loads_from_rfc3339_string() {
    register_articles();
    let loaded = Article::from_persisted(&doc! {
        "title": "Imported",
        "publishedAt": "2024-03-01T12:30:00Z",
    })
    .unwrap();
    assert_eq!(loaded.get("published_at"), Some(&published()));
}

#[tokio::test]
async fn test_null_is_accepted_by_every_type() {
    register_articles();
    let record = Record::new()
        .with("title", "Nulls")
        .with("published_at", Value::Null)
        .with("author", Value::Null);

    let persisted = Article::new(record.clone())
        .validate()
        .await
        .unwrap()
        .to_persisted()
        .unwrap();
    assert_eq!(persisted.get("publishedAt"), Some(&Bson::Null));
    assert_eq!(Article::from_persisted(&persisted).unwrap().record(), &record);
}

#[tokio::test]
async fn test_reference_runs_author_validators() {
    register_articles();
    let record = full_record(ObjectId::new()).with(
        "author",
        Value::Object(vec![("account".to_string(), Value::from(ObjectId::new().to_hex()))]),
    );

    let err = Article::new(record).validate().await.err().unwrap();
    let author = err.validation_errors().unwrap().for_field("author").unwrap().clone();
    assert_eq!(author.error_type, ErrorType::Missing);
    assert_eq!(author.message, ".name: author name is required");
}

#[tokio::test]
async fn test_renamed_field_cannot_be_shadowed() {
    register_articles();
    let record = full_record(ObjectId::new()).with("publishedAt", "not a date");

    let err = Article::new(record.clone()).validate().await.err().unwrap();
    let shadow = err.validation_errors().unwrap().for_field("publishedAt").unwrap().clone();
    assert_eq!(shadow.error_type, ErrorType::ExtraForbidden);

    let unchecked = Article::from_state(DocumentState::persisted(ObjectId::new(), record));
    assert!(unchecked.to_persisted().is_err());
}

#[tokio::test]
async fn test_duplicate_object_keys_are_rejected() {
    register_articles();
    let twice = Value::Object(vec![
        ("clarity".to_string(), Value::Int(4)),
        ("clarity".to_string(), Value::Int(1)),
    ]);
    let record = full_record(ObjectId::new())
        .with("scores", twice.clone())
        .with("extra", Value::List(vec![twice]));

    let err = Article::new(record).validate().await.err().unwrap();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.for_field("scores").unwrap().message, ".clarity: duplicate key");
    assert_eq!(errors.for_field("extra").unwrap().message, "[0]: .clarity: duplicate key");
}

#[tokio::test]
async fn test_objectid_case_survives_round_trip() {
    register_articles();
    let account = ObjectId::new();
    let record = full_record(account).with(
        "author",
        Value::Object(vec![
            ("name".to_string(), Value::from("ann")),
            ("account".to_string(), Value::from(account.to_hex().to_ascii_uppercase())),
        ]),
    );

    let validated = Article::from_state(DocumentState::persisted(ObjectId::new(), record))
        .validate()
        .await
        .unwrap();
    let author = validated.get("author").unwrap();
    assert_eq!(
        author,
        &Value::Object(vec![
            ("account".to_string(), Value::from(account.to_hex())),
            ("name".to_string(), Value::from("ann")),
        ])
    );

    let loaded = Article::from_persisted(&validated.to_persisted().unwrap()).unwrap();
    assert_eq!(loaded.record(), validated.record());
}

#[tokio::test]
async fn test_reordered_map_keeps_document_clean() {
    register_articles();
    let persisted = Article::from_state(DocumentState::persisted(
        ObjectId::new(),
        full_record(ObjectId::new()),
    ));
    let reordered = persisted.set(
        "scores",
        Value::Object(vec![
            ("depth".to_string(), Value::Float(3.5)),
            ("clarity".to_string(), Value::Int(4)),
        ]),
    );
    assert!(reordered.is_clean());

    let changed = persisted.set(
        "scores",
        Value::Object(vec![("clarity".to_string(), Value::Int(5))]),
    );
    assert!(!changed.is_clean());
}
