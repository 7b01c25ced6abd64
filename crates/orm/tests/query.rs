//! Integration tests for queries and filters.

#![allow(missing_docs)]

mod common;

use common::{Person, assert_sql_contains, database, person};
use mangrove::{DataType, Filter, Model, Value};

fn names(people: &[Person]) -> Vec<&str> {
    people.iter().filter_map(|person| person.name.as_deref()).collect()
}

#[test]
fn select_statement() {
    let statement = Person::select()
        .r#where(Filter::gt("age", 18))
        .order_by_desc("age")
        .limit(10)
        .offset(5)
        .build()
        .unwrap();

    assert_sql_contains(
        &statement.sql,
        &[
            "SELECT Person.name, Person.age, Person.id",
            "FROM Person",
            "WHERE Person.age > ?",
            "ORDER BY Person.age DESC",
            "LIMIT ?",
            "OFFSET ?",
        ],
    );
    assert_eq!(statement.params.len(), 3);
    assert!(matches!(statement.params[0], DataType::Int32(Some(18))));
}

#[test]
fn count_statement() {
    let statement =
        Person::select().r#where(Filter::like("name", "J%")).build_count().unwrap();

    assert_sql_contains(&statement.sql, &["SELECT COUNT(*) AS count", "FROM Person", "LIKE ?"]);
    assert!(matches!(&statement.params[0], DataType::Str(Some(s)) if s == "J%"));
}

#[test]
fn null_equality_renders_is_null() {
    let statement = Person::select()
        .r#where(Filter::eq("age", Value::BigInt(None)))
        .r#where(Filter::ne("name", Value::String(None)))
        .build()
        .unwrap();

    assert_sql_contains(&statement.sql, &["Person.age IS NULL", "Person.name IS NOT NULL"]);
    assert!(statement.params.is_empty());
}

#[test]
fn nested_filters() {
    let statement = Person::select()
        .r#where(Filter::or(vec![
            Filter::and(vec![Filter::gte("age", 10), Filter::lte("age", 20)]),
            Filter::not(Filter::r#in("name", vec!["Jon", "Jane"])),
        ]))
        .build()
        .unwrap();

    assert_sql_contains(&statement.sql, &["WHERE", "AND", "OR", "NOT", "IN (?, ?)"]);
    assert_eq!(statement.params.len(), 4);
}

#[tokio::test]
async fn ordering() {
    let db = database().await;
    person(&db, "Jon", Some(32)).await;
    person(&db, "Jane", Some(28)).await;
    person(&db, "Bob", Some(45)).await;

    let people = Person::select().order_by("age").fetchall(&db).await.unwrap();
    assert_eq!(names(&people), ["Jane", "Jon", "Bob"]);

    let people = Person::select().order_by_desc("age").fetchall(&db).await.unwrap();
    assert_eq!(names(&people), ["Bob", "Jon", "Jane"]);

    let people = Person::select().order_by("name").limit(2).offset(1).fetchall(&db).await.unwrap();
    assert_eq!(names(&people), ["Jane", "Jon"]);
}

#[tokio::test]
async fn filtering_and_counting() {
    let db = database().await;
    person(&db, "Jon", Some(32)).await;
    person(&db, "Jane", Some(28)).await;
    person(&db, "Bob", None).await;

    let adults = Person::select().r#where(Filter::gt("age", 30)).fetchall(&db).await.unwrap();
    assert_eq!(names(&adults), ["Jon"]);

    let unknown =
        Person::select().r#where(Filter::eq("age", Value::BigInt(None))).fetchall(&db).await.unwrap();
    assert_eq!(names(&unknown), ["Bob"]);

    let js = Person::select().r#where(Filter::like("name", "J%")).count(&db).await.unwrap();
    assert_eq!(js, 2);

    let raw = Person::select().r#where(Filter::raw("name = 'Jane'")).fetchone(&db).await.unwrap();
    assert_eq!(raw.and_then(|person| person.age), Some(28));

    let between =
        Person::select().r#where(Filter::between("age", 20, 30)).fetchall(&db).await.unwrap();
    assert_eq!(names(&between), ["Jane"]);

    assert_eq!(Person::count(&db).await.unwrap(), 3);
}

#[tokio::test]
async fn fetch_variants() {
    let db = database().await;
    assert!(Person::select().fetchone(&db).await.unwrap().is_none());
    assert!(Person::select().first(&db).await.unwrap().is_none());
    assert_eq!(Person::count(&db).await.unwrap(), 0);

    for (name, age) in [("A", 1), ("B", 2), ("C", 3)] {
        person(&db, name, Some(age)).await;
    }

    let first = Person::select().order_by_desc("age").first(&db).await.unwrap().unwrap();
    assert_eq!(first.name.as_deref(), Some("C"));

    let some = Person::select().order_by("age").fetchmany(&db, 2).await.unwrap();
    assert_eq!(names(&some), ["A", "B"]);

    let missing = Person::get_by_key(&db, &[("id", Value::from(99_i64))]).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn projections_leave_other_attributes_default() {
    let db = database().await;
    person(&db, "Jon", Some(32)).await;

    let people = Person::select_columns(&["name"]).fetchall(&db).await.unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name.as_deref(), Some("Jon"));
    assert_eq!(people[0].age, None);
    assert_eq!(people[0].auto_id, None);

    let keyed = Person::select_columns(&["id", "age"]).fetchone(&db).await.unwrap().unwrap();
    assert_eq!(keyed.auto_id, Some(1));
    assert_eq!(keyed.age, Some(32));
    assert_eq!(keyed.name, None);
}

#[tokio::test]
async fn queries_create_missing_tables() {
    let db = database().await;
    assert!(!db.contains("Person"));
    assert!(Person::select().fetchall(&db).await.unwrap().is_empty());
    assert!(db.contains("Person"));
}
