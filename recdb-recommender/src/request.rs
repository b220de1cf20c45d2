//! Create/drop requests and their validation.

use recdb_gateway::QueryGateway;
use recdb_result::{Error, Result};
use rustc_hash::FxHashSet;

use crate::catalog::RecommenderCatalog;
use crate::method::RecommendationMethod;

/// A parsed `CREATE RECOMMENDER` request, not yet validated.
#[derive(Clone, Debug, Default)]
pub struct CreateRecommenderRequest {
    pub name: String,
    pub user_table: String,
    pub item_table: String,
    pub rating_table: String,
    pub user_key: String,
    pub item_key: String,
    pub rating_value: String,
    pub method: String,
    pub context_attributes: Vec<String>,
}

impl CreateRecommenderRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: RecommendationMethod::ItemCosCF.token().to_string(),
            ..Self::default()
        }
    }

    pub fn users(mut self, table: impl Into<String>, key: impl Into<String>) -> Self {
        self.user_table = table.into();
        self.user_key = key.into();
        self
    }

    pub fn items(mut self, table: impl Into<String>, key: impl Into<String>) -> Self {
        self.item_table = table.into();
        self.item_key = key.into();
        self
    }

    pub fn ratings(mut self, table: impl Into<String>, value: impl Into<String>) -> Self {
        self.rating_table = table.into();
        self.rating_value = value.into();
        self
    }

    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_context_attribute(mut self, column: impl Into<String>) -> Self {
        self.context_attributes.push(column.into());
        self
    }

    /// Check the request against the gateway and catalog.
    ///
    /// Nothing is created here. Identifiers are folded to lower case; the
    /// recommender must not be registered yet and its index table name must be
    /// free; every source table must exist.
    pub fn validate(
        &self,
        gateway: &dyn QueryGateway,
        catalog: &RecommenderCatalog,
    ) -> Result<RecommenderDefinition> {
        let name = identifier("recommender name", &self.name)?;
        let method: RecommendationMethod = self.method.parse()?;

        let definition = RecommenderDefinition {
            user_table: identifier("user table", &self.user_table)?,
            item_table: identifier("item table", &self.item_table)?,
            rating_table: identifier("rating table", &self.rating_table)?,
            user_key: identifier("user key", &self.user_key)?,
            item_key: identifier("item key", &self.item_key)?,
            rating_value: identifier("rating value", &self.rating_value)?,
            context_attributes: context_attributes(&self.context_attributes)?,
            name,
            method,
        };

        if definition.user_key == definition.item_key {
            return Err(Error::InvalidArgumentError(format!(
                "user key and item key must differ, both are '{}'",
                definition.user_key
            )));
        }

        for table in [
            &definition.user_table,
            &definition.item_table,
            &definition.rating_table,
        ] {
            if !gateway.table_exists(table)? {
                return Err(Error::CatalogError(format!(
                    "Catalog Error: Table '{table}' does not exist"
                )));
            }
        }

        if catalog.recommender_exists(gateway, &definition.name)? {
            return Err(Error::RecommenderExists(definition.name));
        }
        let index_table = catalog.index_table_name(&definition.name);
        if gateway.table_exists(&index_table)? {
            return Err(Error::CatalogError(format!(
                "Catalog Error: Table '{index_table}' already exists"
            )));
        }

        Ok(definition)
    }
}

/// A parsed `DROP RECOMMENDER` request.
#[derive(Clone, Debug)]
pub struct DropRecommenderRequest {
    pub name: String,
}

impl DropRecommenderRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Canonical recommender name.
    pub fn canonical_name(&self) -> Result<String> {
        identifier("recommender name", &self.name)
    }
}

/// A validated recommender, every identifier in canonical form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommenderDefinition {
    pub name: String,
    pub user_table: String,
    pub item_table: String,
    pub rating_table: String,
    pub user_key: String,
    pub item_key: String,
    pub rating_value: String,
    pub method: RecommendationMethod,
    pub context_attributes: Vec<String>,
}

impl RecommenderDefinition {
    pub fn is_context_free(&self) -> bool {
        self.context_attributes.is_empty()
    }
}

fn identifier(what: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let well_formed = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !well_formed {
        return Err(Error::InvalidArgumentError(format!(
            "{what} '{raw}' is not a valid identifier"
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn context_attributes(raw: &[String]) -> Result<Vec<String>> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(raw.len());
    for column in raw {
        let name = identifier("context attribute", column)?;
        if !seen.insert(name.clone()) {
            return Err(Error::InvalidArgumentError(format!(
                "context attribute '{name}' listed more than once"
            )));
        }
        out.push(name);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_folded_and_checked() {
        assert_eq!(identifier("x", " Movies ").expect("valid"), "movies");
        assert_eq!(identifier("x", "_r2").expect("valid"), "_r2");
        assert!(identifier("x", "2fast").is_err());
        assert!(identifier("x", "drop table;").is_err());
        assert!(identifier("x", "").is_err());
    }

    #[test]
    fn repeated_context_attribute_is_rejected() {
        let err = context_attributes(&["Season".into(), "season".into()])
            .expect_err("duplicate attribute");
        assert!(matches!(err, Error::InvalidArgumentError(ref msg) if msg.contains("season")));
    }
}
