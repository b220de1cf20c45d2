//! Recommendation methods and the artifact roles each one produces.

use std::fmt;
use std::str::FromStr;

use recdb_result::{Error, Result};

/// Which side of the rating matrix a similarity model compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Item,
}

impl Entity {
    /// Column names of a similarity model table for this entity.
    pub fn pair_columns(self) -> (&'static str, &'static str) {
        match self {
            Entity::User => ("user1", "user2"),
            Entity::Item => ("item1", "item2"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimilarityMeasure {
    Cosine,
    Pearson,
}

/// The closed set of model-building strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecommendationMethod {
    ItemCosCF,
    ItemPearCF,
    UserCosCF,
    UserPearCF,
    Svd,
}

/// Physical role of a model table inside a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelRole {
    Similarity,
    UserFactors,
    ItemFactors,
}

impl ModelRole {
    /// Role suffix placed between the recommender name and the unique part of
    /// a generated table name.
    pub fn name_suffix(self) -> &'static str {
        match self {
            ModelRole::Similarity => "Model",
            ModelRole::UserFactors => "UserModel",
            ModelRole::ItemFactors => "ItemModel",
        }
    }

    /// Index-table column that records the model table for this role.
    pub fn index_column(self) -> &'static str {
        match self {
            ModelRole::Similarity => "recModelName",
            ModelRole::UserFactors => "recUserModelName",
            ModelRole::ItemFactors => "recItemModelName",
        }
    }
}

const SIMILARITY_ROLES: &[ModelRole] = &[ModelRole::Similarity];
const FACTOR_ROLES: &[ModelRole] = &[ModelRole::UserFactors, ModelRole::ItemFactors];

impl RecommendationMethod {
    pub const ALL: [RecommendationMethod; 5] = [
        RecommendationMethod::ItemCosCF,
        RecommendationMethod::ItemPearCF,
        RecommendationMethod::UserCosCF,
        RecommendationMethod::UserPearCF,
        RecommendationMethod::Svd,
    ];

    /// Token stored in the directory's `method` column.
    pub fn token(self) -> &'static str {
        match self {
            RecommendationMethod::ItemCosCF => "itemcoscf",
            RecommendationMethod::ItemPearCF => "itempearcf",
            RecommendationMethod::UserCosCF => "usercoscf",
            RecommendationMethod::UserPearCF => "userpearcf",
            RecommendationMethod::Svd => "svd",
        }
    }

    /// Entity and measure for the collaborative-filtering methods, `None` for SVD.
    pub fn similarity(self) -> Option<(Entity, SimilarityMeasure)> {
        match self {
            RecommendationMethod::ItemCosCF => Some((Entity::Item, SimilarityMeasure::Cosine)),
            RecommendationMethod::ItemPearCF => Some((Entity::Item, SimilarityMeasure::Pearson)),
            RecommendationMethod::UserCosCF => Some((Entity::User, SimilarityMeasure::Cosine)),
            RecommendationMethod::UserPearCF => Some((Entity::User, SimilarityMeasure::Pearson)),
            RecommendationMethod::Svd => None,
        }
    }

    pub fn is_factorization(self) -> bool {
        matches!(self, RecommendationMethod::Svd)
    }

    /// Model tables each cell owns, in creation and drop order.
    pub fn model_roles(self) -> &'static [ModelRole] {
        if self.is_factorization() {
            FACTOR_ROLES
        } else {
            SIMILARITY_ROLES
        }
    }
}

impl FromStr for RecommendationMethod {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_lowercase();
        RecommendationMethod::ALL
            .into_iter()
            .find(|method| method.token() == normalized)
            .ok_or_else(|| Error::UnknownMethod(token.to_string()))
    }
}

impl fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_case_insensitively() {
        for method in RecommendationMethod::ALL {
            let upper = method.token().to_ascii_uppercase();
            assert_eq!(upper.parse::<RecommendationMethod>().expect("parse"), method);
        }
    }

    #[test]
    fn unknown_token_is_reported_verbatim() {
        let err = "knn".parse::<RecommendationMethod>().expect_err("unknown");
        assert!(matches!(err, Error::UnknownMethod(ref token) if token == "knn"));
        assert_eq!(err.to_string(), "recommendation method knn not recognized");
    }

    #[test]
    fn only_svd_owns_two_models() {
        assert_eq!(
            RecommendationMethod::Svd.model_roles(),
            &[ModelRole::UserFactors, ModelRole::ItemFactors]
        );
        assert_eq!(
            RecommendationMethod::UserPearCF.model_roles(),
            &[ModelRole::Similarity]
        );
    }
}
