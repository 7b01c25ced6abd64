//! Errors raised by the ORM itself.
//!
//! Engine failures (integrity violations and the like) are passed through
//! from the connection untouched. These variants cover the checks the ORM
//! performs on its own and are carried inside [`anyhow::Error`]; use
//! `downcast_ref::<Error>()` to inspect them.

use thiserror::Error;

/// ORM error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No primary key was declared and `id` is taken by another column.
    #[error(
        "`id` already defined on `{model}` and therefore cannot be used for automatic primary \
         key creation. Please either define a primary key or rename `id`."
    )]
    InvalidKeyField {
        /// Model whose schema could not be built.
        model: &'static str,
    },

    /// A value of the wrong type was assigned to a column.
    #[error("`{column}` should be of type `{expected}`, it was found to be of type `{found}`")]
    FieldType {
        /// Column name.
        column: String,
        /// Kind declared for the column.
        expected: &'static str,
        /// Kind of the rejected value.
        found: &'static str,
    },

    /// The model has no column or attribute with this name.
    #[error("`{model}` has no field named `{name}`")]
    UnknownField {
        /// Model name.
        model: &'static str,
        /// Requested name.
        name: String,
    },

    /// No default connection has been installed.
    #[error("no connection installed")]
    NoConnection,

    /// The value cannot be bound as a statement parameter.
    #[error("unsupported value `{0}` requires explicit conversion before building the query")]
    UnsupportedValue(String),
}
