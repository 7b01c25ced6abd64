//! Integration tests for references between models.

#![allow(missing_docs)]

mod common;

use common::{Child, Parent, database};
use mangrove::{Field, Model, Reference, ReferenceField, Statement, Value, model};

#[test]
fn reference_schema() {
    let schema = Child::schema().unwrap();

    let columns: Vec<_> = schema.columns().map(|column| column.name.as_str()).collect();
    assert_eq!(columns, ["name", "fk_parent_id", "id"]);

    let reference = schema.foreign_keys().next().unwrap();
    assert_eq!(reference.name, "fk_parent");
    assert_eq!(reference.columns, ["fk_parent_id"]);
    assert_eq!(reference.target_columns, ["id"]);
    assert_eq!(reference.target.name(), "Parent");

    let sql = schema.create_sql();
    assert!(sql.contains(r#"FOREIGN KEY ("fk_parent_id")"#), "{sql}");
    assert!(sql.contains(r#"REFERENCES "Parent""#), "{sql}");
}

model! {
    #[derive(Debug, Clone)]
    pub struct Toy {
        pub owner: Reference<Child> = ReferenceField::to::<Child>().name("toy_owner"),
        pub label: String = Field::varchar(20).primary_key(),
    }
}

#[test]
fn explicit_constraint_name() {
    let schema = Toy::schema().unwrap();
    let reference = schema.foreign_keys().next().unwrap();
    assert_eq!(reference.name, "toy_owner");
    assert_eq!(reference.columns, ["fk_child_id"]);
    assert_eq!(schema.key_name(), ["label"]);
}

#[tokio::test]
async fn resolves_once_and_caches() {
    let db = database().await;

    let mut parent = Parent {
        name: Some("Mother".to_string()),
        ..Parent::default()
    };
    parent.save(&db).await.unwrap();

    let mut child = Child {
        name: Some("Kid".to_string()),
        parent: Reference::to(&parent).unwrap(),
        ..Child::default()
    };
    child.save(&db).await.unwrap();
    assert_eq!(child.get("fk_parent_id").unwrap(), Value::BigInt(Some(1)));

    let loaded = Child::get_by_key(&db, &[("id", Value::from(1_i64))]).await.unwrap().unwrap();
    assert_eq!(loaded.parent.key(), [Value::BigInt(Some(1))]);
    assert!(!loaded.parent.is_cached());

    let resolved = loaded.parent.get(&db).await.unwrap().unwrap();
    assert_eq!(resolved.name.as_deref(), Some("Mother"));
    assert!(loaded.parent.is_cached());

    // the cached row is served even after the referenced row changes
    db.execute(Statement::new(r#"UPDATE "Parent" SET "name" = 'Mum'"#)).await.unwrap();
    let cached = loaded.parent.get(&db).await.unwrap();
    assert_eq!(cached.and_then(|parent| parent.name.as_deref()), Some("Mother"));

    // a fresh load queries again
    let reloaded = Child::get_by_key(&db, &[("id", Value::from(1_i64))]).await.unwrap().unwrap();
    let resolved = reloaded.parent.get(&db).await.unwrap().unwrap();
    assert_eq!(resolved.name.as_deref(), Some("Mum"));
}

#[tokio::test]
async fn unset_reference_resolves_to_none() {
    let db = database().await;

    let mut orphan = Child {
        name: Some("Orphan".to_string()),
        ..Child::default()
    };
    orphan.save(&db).await.unwrap();
    assert_eq!(orphan.get("fk_parent_id").unwrap(), Value::BigInt(None));

    let loaded = Child::select().first(&db).await.unwrap().unwrap();
    assert!(loaded.parent.key().is_empty());
    assert!(loaded.parent.get(&db).await.unwrap().is_none());
    assert!(loaded.parent.is_cached());
}

#[tokio::test]
async fn reassigning_clears_cache() {
    let db = database().await;

    let mut first = Parent {
        name: Some("First".to_string()),
        ..Parent::default()
    };
    first.save(&db).await.unwrap();
    let mut second = Parent {
        name: Some("Second".to_string()),
        ..Parent::default()
    };
    second.save(&db).await.unwrap();

    let mut child = Child {
        parent: Reference::to(&first).unwrap(),
        ..Child::default()
    };
    child.parent.get(&db).await.unwrap();
    assert!(child.parent.is_cached());

    child.parent.set(&second).unwrap();
    assert!(!child.parent.is_cached());
    let resolved = child.parent.get(&db).await.unwrap().unwrap();
    assert_eq!(resolved.name.as_deref(), Some("Second"));

    child.set("fk_parent_id", 1_i64).unwrap();
    assert!(!child.parent.is_cached());
    let resolved = child.parent.get(&db).await.unwrap().unwrap();
    assert_eq!(resolved.name.as_deref(), Some("First"));
}

#[tokio::test]
async fn update_can_exclude_references() {
    let db = database().await;

    let mut parent = Parent::default();
    parent.save(&db).await.unwrap();

    let mut child = Child {
        name: Some("Kid".to_string()),
        parent: Reference::to(&parent).unwrap(),
        ..Child::default()
    };
    child.save(&db).await.unwrap();

    child.name = Some("Teen".to_string());
    child.parent = Reference::default();
    assert_eq!(child.update(&db, &["parent"]).await.unwrap(), 1);

    let loaded = Child::get_by_key(&db, &[("id", Value::from(1_i64))]).await.unwrap().unwrap();
    assert_eq!(loaded.name.as_deref(), Some("Teen"));
    assert_eq!(loaded.parent.key(), [Value::BigInt(Some(1))]);
}
