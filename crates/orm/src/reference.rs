use std::sync::OnceLock;

use anyhow::{Result, bail};
use sea_query::Value;

use crate::database::Database;
use crate::field::FieldValue;
use crate::model::Model;
use crate::value::is_null;

/// Value of a [`ReferenceField`](crate::ReferenceField): the referenced key
/// and, once resolved, the referenced row.
///
/// Resolution happens at most once; assigning a new key clears the cache.
#[derive(Clone, Debug)]
pub struct Reference<M: Model> {
    key: Vec<Value>,
    cache: OnceLock<Option<M>>,
}

impl<M: Model> Default for Reference<M> {
    fn default() -> Self {
        Self {
            key: Vec::new(),
            cache: OnceLock::new(),
        }
    }
}

impl<M: Model> Reference<M> {
    /// Reference `target` by its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the target's schema is invalid.
    pub fn to(target: &M) -> Result<Self> {
        let mut reference = Self::default();
        reference.set(target)?;
        Ok(reference)
    }

    /// Point the reference at `target`. A target without a key leaves the
    /// reference empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the target's schema is invalid.
    pub fn set(&mut self, target: &M) -> Result<()> {
        self.key = target.key()?.unwrap_or_default();
        self.cache = OnceLock::new();
        Ok(())
    }

    /// Referenced key values, empty while unset.
    #[must_use]
    pub fn key(&self) -> &[Value] {
        &self.key
    }

    /// Whether the referenced row has been resolved.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Resolve the referenced row, querying on first use only. An unset
    /// reference resolves to `None` without a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, db: &Database) -> Result<Option<&M>> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached.as_ref());
        }

        let target = if self.key.is_empty() || self.key.iter().any(is_null) {
            None
        } else {
            let key_name = M::key_name()?;
            let pairs: Vec<(&str, Value)> =
                key_name.iter().map(String::as_str).zip(self.key.iter().cloned()).collect();
            tracing::debug!(model = M::NAME, "resolving reference");
            M::get_by_key(db, &pairs).await?
        };

        // another caller may have resolved it meanwhile
        Ok(self.cache.get_or_init(|| target).as_ref())
    }
}

impl<M: Model> FieldValue for Reference<M> {
    fn to_values(&self) -> Vec<Value> {
        if !self.key.is_empty() {
            return self.key.clone();
        }

        // typed nulls, one per referenced key column
        M::schema().map_or_else(
            |_| Vec::new(),
            |schema| {
                schema
                    .key_name()
                    .iter()
                    .filter_map(|key| schema.column(key))
                    .map(|column| column.kind.null())
                    .collect()
            },
        )
    }

    fn load(&mut self, values: Vec<Value>) -> Result<()> {
        let expected = M::schema()?.key_name().len();
        if values.len() != expected {
            bail!("`{}` reference expects {expected} key values, found {}", M::NAME, values.len());
        }

        self.key = if values.iter().all(is_null) { Vec::new() } else { values };
        self.cache = OnceLock::new();
        Ok(())
    }
}
