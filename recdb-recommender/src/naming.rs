//! Physical names for cell artifacts.
//!
//! Names combine the recommender name, a role suffix, the recommender's
//! directory id ("generation"), and the cell's enumeration ordinal. Directory
//! ids come from a serial sequence and are never reused, so two live cells can
//! never share a name, regardless of clock resolution.

use crate::method::{ModelRole, RecommendationMethod};

/// Model table(s) owned by one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelNames {
    Similarity(String),
    Factors { user: String, item: String },
}

impl ModelNames {
    /// Table names in creation and drop order.
    pub fn tables(&self) -> Vec<&str> {
        match self {
            ModelNames::Similarity(name) => vec![name.as_str()],
            ModelNames::Factors { user, item } => vec![user.as_str(), item.as_str()],
        }
    }

    /// `(role, table)` pairs in creation and drop order.
    pub fn by_role(&self) -> Vec<(ModelRole, &str)> {
        match self {
            ModelNames::Similarity(name) => vec![(ModelRole::Similarity, name.as_str())],
            ModelNames::Factors { user, item } => vec![
                (ModelRole::UserFactors, user.as_str()),
                (ModelRole::ItemFactors, item.as_str()),
            ],
        }
    }
}

/// The physical tables of one cell: its model table(s) and its view table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellArtifacts {
    pub models: ModelNames,
    pub view_name: String,
}

impl CellArtifacts {
    /// Every table of the cell in drop order: models first, then the view.
    pub fn tables(&self) -> Vec<&str> {
        let mut tables = self.models.tables();
        tables.push(self.view_name.as_str());
        tables
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactNamer {
    recommender: String,
    generation: i64,
}

impl ArtifactNamer {
    pub fn new(recommender: impl Into<String>, generation: i64) -> Self {
        Self {
            recommender: recommender.into(),
            generation,
        }
    }

    fn name(&self, suffix: &str, ordinal: usize) -> String {
        format!("{}{}{}_{}", self.recommender, suffix, self.generation, ordinal)
            .to_ascii_lowercase()
    }

    pub fn cell(&self, method: RecommendationMethod, ordinal: usize) -> CellArtifacts {
        let models = if method.is_factorization() {
            ModelNames::Factors {
                user: self.name(ModelRole::UserFactors.name_suffix(), ordinal),
                item: self.name(ModelRole::ItemFactors.name_suffix(), ordinal),
            }
        } else {
            ModelNames::Similarity(self.name(ModelRole::Similarity.name_suffix(), ordinal))
        };
        CellArtifacts {
            models,
            view_name: self.name("View", ordinal),
        }
    }
}
