//! Configuration for the recommender catalog.

/// Tunable parameters stored in the properties singleton.
#[derive(Clone, Debug, PartialEq)]
pub struct RecommenderProperties {
    pub update_threshold: f64,
    pub tail_length: i64,
    pub verbose_queries: bool,
}

impl Default for RecommenderProperties {
    fn default() -> Self {
        Self {
            update_threshold: 0.5,
            tail_length: 0,
            verbose_queries: true,
        }
    }
}

/// Names of the shared catalog tables and the defaults written into them.
#[derive(Clone, Debug)]
pub struct RecommenderOptions {
    pub directory_table: String,
    pub properties_table: String,
    /// Appended to a recommender's name to form its index table name.
    pub index_suffix: String,
    pub default_properties: RecommenderProperties,
}

impl Default for RecommenderOptions {
    fn default() -> Self {
        Self {
            directory_table: "RecModelsCatalogue".to_string(),
            properties_table: "RecathonProperties".to_string(),
            index_suffix: "Index".to_string(),
            default_properties: RecommenderProperties::default(),
        }
    }
}

impl RecommenderOptions {
    pub fn with_directory_table(mut self, name: impl Into<String>) -> Self {
        self.directory_table = name.into();
        self
    }

    pub fn with_properties_table(mut self, name: impl Into<String>) -> Self {
        self.properties_table = name.into();
        self
    }

    pub fn with_default_properties(mut self, properties: RecommenderProperties) -> Self {
        self.default_properties = properties;
        self
    }

    /// Index table name for the recommender `name`, canonical form.
    pub fn index_table_name(&self, name: &str) -> String {
        format!("{}{}", name, self.index_suffix).to_ascii_lowercase()
    }
}
