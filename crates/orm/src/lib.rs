//! ActiveRecord-style models over `SeaQuery` and SQLite.
//!
//! A model is a struct whose fields carry typed declarations. The declarations
//! determine the table, its primary key and foreign keys; the [`Model`] trait
//! then offers the basic CRUD operations. Statement building is delegated to
//! ``SeaQuery`` and execution to a [`Connection`].
//!
//! # Quick Start
//!
//! ## Define models
//!
//! ```ignore
//! use mangrove::{Field, Reference, ReferenceField, model};
//!
//! model! {
//!     #[derive(Debug, Clone)]
//!     pub struct Person {
//!         pub name: Option<String> = Field::string(),
//!         pub age: Option<i64> = Field::integer(),
//!     }
//! }
//!
//! model! {
//!     table = "pets",
//!     #[derive(Debug, Clone)]
//!     pub struct Pet {
//!         pub name: String = Field::varchar(50).primary_key(),
//!         pub owner: Reference<Person> = ReferenceField::to::<Person>(),
//!     }
//! }
//! ```
//!
//! `Person` has no declared key, so an integer `id` column is added and kept
//! in `auto_id`. `Pet` gets a `fk_person_id` column and a foreign key named
//! `fk_owner`.
//!
//! ## CRUD Operations
//!
//! ```ignore
//! use mangrove::{Database, Filter, Model};
//!
//! let db = Database::connect().await?;
//!
//! let mut jon = Person { name: Some("Jon Doe".into()), age: Some(32), ..Person::default() };
//! jon.save(&db).await?;                 // INSERT, `auto_id` is filled in
//!
//! jon.age = Some(33);
//! jon.update(&db, &[]).await?;          // UPDATE by key
//!
//! let people = Person::select()
//!     .r#where(Filter::gt("age", 18))
//!     .order_by_desc("age")
//!     .limit(10)
//!     .fetchall(&db)
//!     .await?;
//!
//! jon.delete(&db).await?;
//! ```
//!
//! ## References
//!
//! ```ignore
//! let pet = Pet { name: "Rex".into(), owner: Reference::to(&jon)?, ..Pet::default() };
//! let owner = pet.owner.get(&db).await?;   // queried once, then cached
//! ```
//!
//! ## Filtering
//!
//! ```ignore
//! Filter::eq("status", "active")
//! Filter::like("title", "%rust%")
//! Filter::r#in("id", vec![1, 2, 3])
//! Filter::or(vec![Filter::eq("featured", true), Filter::gt("views", 5000)])
//! Filter::raw("name = 'Jon Doe'")
//! ```

mod database;
mod delete;
mod error;
mod field;
mod filter;
mod insert;
mod model;
mod reference;
mod schema;
mod select;
mod update;
mod value;

pub use database::{Database, connection, install_connection, require_connection};
pub use delete::DeleteBuilder;
pub use error::Error;
pub use field::{Declaration, Field, FieldKind, FieldValue, ReferenceField};
pub use filter::Filter;
pub use insert::InsertBuilder;
// Re-export the connection boundary so models and custom backends need a single import.
pub use mangrove_sql::{Backend, ConnectOptions, Connection, DataType, FromEnv, Row, Sqlite, Statement};
pub use model::{Model, ModelValues};
pub use reference::Reference;
pub use schema::{AUTO_KEY, Attribute, Column, ForeignKey, TableSchema};
// Column values as read with `Model::get` and given to `Model::get_by_key`.
pub use sea_query::Value;
pub use select::Query;
pub use update::UpdateBuilder;
pub use value::FromValue;

// Re-exports for ``model`` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use {anyhow, sea_query::Value};
}
