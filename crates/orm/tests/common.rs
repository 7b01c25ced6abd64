//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use mangrove::{Database, Field, Reference, ReferenceField, Sqlite, model};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

// Common test models used across multiple test files

model! {
    #[derive(Debug, Clone)]
    pub struct Person {
        pub name: Option<String> = Field::string(),
        pub age: Option<i64> = Field::integer(),
    }
}

model! {
    #[derive(Debug, Clone)]
    pub struct Parent {
        pub name: Option<String> = Field::string(),
    }
}

model! {
    #[derive(Debug, Clone)]
    pub struct Child {
        pub name: Option<String> = Field::string(),
        pub parent: Reference<Parent> = ReferenceField::to::<Parent>(),
    }
}

model! {
    table = "tags",
    #[derive(Debug, Clone)]
    pub struct Tag {
        pub code: String = Field::varchar(16).primary_key(),
        pub label: Option<String> = Field::string(),
        pub active: Option<bool> = Field::boolean().default(true),
    }
}

model! {
    #[derive(Debug, Clone)]
    pub struct Event {
        pub title: String = Field::string().not_null(),
        pub at: Option<DateTime<Utc>> = Field::timestamp(),
        pub score: Option<f64> = Field::float(),
    }
}

/// Install a `fmt` subscriber honouring `RUST_LOG`. Safe to call from every
/// test.
pub fn init_tracing() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// A fresh private in-memory database.
pub async fn database() -> Database {
    init_tracing();
    let sqlite = Sqlite::memory().expect("open in-memory database");
    Database::new(sqlite).await.expect("wrap connection")
}

/// Save a person with the given name and age.
pub async fn person(db: &Database, name: &str, age: Option<i64>) -> Person {
    use mangrove::Model;

    let mut person = Person {
        name: Some(name.to_string()),
        age,
        ..Person::default()
    };
    person.save(db).await.expect("save person");
    person
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {}
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Identifier quotes and whitespace are normalized on both sides, so fragments
/// can be written unquoted.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
