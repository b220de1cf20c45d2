//! Table descriptors for every physical object a recommender owns.
//!
//! Shared catalog tables:
//! - directory: one row per recommender
//! - properties: at most one row of tunables
//!
//! Per recommender: an index table with one row per cell. Per cell: one
//! similarity table (CF methods) or a user/item factor pair (SVD), plus a view
//! table seeded with a sentinel row.

use arrow::datatypes::DataType;
use recdb_plan::{ColumnSpec, CreateTablePlan, NotNull, PlanValue, timestamp_type};

use crate::method::{Entity, RecommendationMethod};
use crate::naming::ModelNames;
use crate::options::RecommenderOptions;
use crate::request::RecommenderDefinition;

pub mod directory {
    pub const ID: &str = "recommenderId";
    pub const INDEX_NAME: &str = "recommenderIndexName";
    pub const USER_TABLE: &str = "userTable";
    pub const ITEM_TABLE: &str = "itemTable";
    pub const RATING_TABLE: &str = "ratingTable";
    pub const USER_KEY: &str = "userKey";
    pub const ITEM_KEY: &str = "itemKey";
    pub const RATING_VALUE: &str = "ratingVal";
    pub const METHOD: &str = "method";
    pub const CONTEXT_ATTRIBUTES: &str = "contextattributes";
}

pub mod properties {
    pub const UPDATE_THRESHOLD: &str = "update_threshold";
    pub const TAIL_LENGTH: &str = "tail_length";
    pub const VERBOSE_QUERIES: &str = "verbose_queries";
}

pub mod index {
    pub const SYSTEM_ID: &str = "systemId";
    pub const VIEW_NAME: &str = "recViewName";
    pub const UPDATE_COUNTER: &str = "updateCounter";
    pub const RATING_TOTAL: &str = "ratingTotal";
    pub const QUERY_COUNTER: &str = "queryCounter";
    pub const UPDATE_RATE: &str = "updateRate";
    pub const QUERY_RATE: &str = "queryRate";
    pub const CREATED_AT: &str = "levelone_timestamp";
}

/// Score column of a view table.
pub const VIEW_SCORE: &str = "recscore";

/// Key and score written into a freshly created view so it is never empty.
pub const SENTINEL_KEY: i64 = -1;
pub const SENTINEL_SCORE: f64 = -1.0;

fn text(name: &str) -> ColumnSpec {
    ColumnSpec::new(name, DataType::Utf8, false)
}

pub fn directory_table(options: &RecommenderOptions) -> CreateTablePlan {
    CreateTablePlan::new(&options.directory_table)
        .if_not_exists()
        .with_column(ColumnSpec::serial_primary_key(directory::ID))
        .with_columns([
            text(directory::INDEX_NAME),
            text(directory::USER_TABLE),
            text(directory::ITEM_TABLE),
            text(directory::RATING_TABLE),
            text(directory::USER_KEY),
            text(directory::ITEM_KEY),
            text(directory::RATING_VALUE),
            text(directory::METHOD),
        ])
        .with_column((directory::CONTEXT_ATTRIBUTES, DataType::Int32, NotNull))
}

/// Directory row values, in column order after the serial id.
pub fn directory_row(
    options: &RecommenderOptions,
    definition: &RecommenderDefinition,
) -> Vec<PlanValue> {
    vec![
        options.index_table_name(&definition.name).into(),
        (&definition.user_table).into(),
        (&definition.item_table).into(),
        (&definition.rating_table).into(),
        (&definition.user_key).into(),
        (&definition.item_key).into(),
        (&definition.rating_value).into(),
        definition.method.token().into(),
        definition.context_attributes.len().into(),
    ]
}

pub const DIRECTORY_INSERT_COLUMNS: [&str; 9] = [
    directory::INDEX_NAME,
    directory::USER_TABLE,
    directory::ITEM_TABLE,
    directory::RATING_TABLE,
    directory::USER_KEY,
    directory::ITEM_KEY,
    directory::RATING_VALUE,
    directory::METHOD,
    directory::CONTEXT_ATTRIBUTES,
];

pub fn properties_table(options: &RecommenderOptions) -> CreateTablePlan {
    CreateTablePlan::new(&options.properties_table)
        .with_column((properties::UPDATE_THRESHOLD, DataType::Float32, NotNull))
        .with_column((properties::TAIL_LENGTH, DataType::Int32, NotNull))
        .with_column((properties::VERBOSE_QUERIES, DataType::Boolean, NotNull))
}

/// Index table: one model-name column per model role of the method, then the
/// view name, counters, timestamp, and one text column per context attribute.
pub fn index_table(
    options: &RecommenderOptions,
    definition: &RecommenderDefinition,
) -> CreateTablePlan {
    let mut plan = CreateTablePlan::new(options.index_table_name(&definition.name))
        .with_column(ColumnSpec::serial_primary_key(index::SYSTEM_ID))
        .with_columns(
            definition
                .method
                .model_roles()
                .iter()
                .map(|role| text(role.index_column())),
        )
        .with_column(text(index::VIEW_NAME))
        .with_column((index::UPDATE_COUNTER, DataType::Int32, NotNull))
        .with_column((index::RATING_TOTAL, DataType::Int32, NotNull))
        .with_column((index::QUERY_COUNTER, DataType::Int32, NotNull))
        .with_column((index::UPDATE_RATE, DataType::Float32, NotNull))
        .with_column((index::QUERY_RATE, DataType::Float32, NotNull))
        .with_column((index::CREATED_AT, timestamp_type(), NotNull));
    for attribute in &definition.context_attributes {
        plan = plan.with_column(text(attribute));
    }
    plan
}

/// Number of fixed (non-context) columns in an index table for `method`.
pub fn index_fixed_columns(method: RecommendationMethod) -> usize {
    // systemId + model names + view + 5 counters/rates + timestamp
    1 + method.model_roles().len() + 1 + 5 + 1
}

/// Model table(s) for one cell, in creation order.
pub fn model_tables(method: RecommendationMethod, models: &ModelNames) -> Vec<CreateTablePlan> {
    match models {
        ModelNames::Similarity(name) => {
            let entity = method.similarity().map_or(Entity::Item, |(entity, _)| entity);
            vec![similarity_table(name, entity)]
        }
        ModelNames::Factors { user, item } => vec![
            factor_table(user, "users"),
            factor_table(item, "items"),
        ],
    }
}

fn similarity_table(name: &str, entity: Entity) -> CreateTablePlan {
    let (first, second) = entity.pair_columns();
    CreateTablePlan::new(name)
        .with_column((first, DataType::Int32, NotNull))
        .with_column((second, DataType::Int32, NotNull))
        .with_column(("similarity", DataType::Float32, NotNull))
}

fn factor_table(name: &str, entity_column: &str) -> CreateTablePlan {
    CreateTablePlan::new(name)
        .with_column((entity_column, DataType::Int32, NotNull))
        .with_column(("feature", DataType::Int32, NotNull))
        .with_column(("value", DataType::Float32, NotNull))
}

/// View table with a composite primary key on (user key, item key).
pub fn view_table(definition: &RecommenderDefinition, view_name: &str) -> CreateTablePlan {
    CreateTablePlan::new(view_name)
        .with_column(
            ColumnSpec::new(&definition.user_key, DataType::Int32, false).with_primary_key(true),
        )
        .with_column(
            ColumnSpec::new(&definition.item_key, DataType::Int32, false).with_primary_key(true),
        )
        .with_column((VIEW_SCORE, DataType::Float32, NotNull))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(method: RecommendationMethod, context: &[&str]) -> RecommenderDefinition {
        RecommenderDefinition {
            name: "movies".into(),
            user_table: "users".into(),
            item_table: "items".into(),
            rating_table: "ratings".into(),
            user_key: "uid".into(),
            item_key: "iid".into(),
            rating_value: "score".into(),
            method,
            context_attributes: context.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn column_names(plan: &CreateTablePlan) -> Vec<&str> {
        plan.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn svd_index_has_two_model_columns_and_context_tail() {
        let options = RecommenderOptions::default();
        let plan = index_table(&options, &definition(RecommendationMethod::Svd, &["season"]));
        assert_eq!(plan.name, "moviesindex");
        assert_eq!(
            column_names(&plan),
            vec![
                "systemId",
                "recUserModelName",
                "recItemModelName",
                "recViewName",
                "updateCounter",
                "ratingTotal",
                "queryCounter",
                "updateRate",
                "queryRate",
                "levelone_timestamp",
                "season",
            ]
        );
        assert_eq!(index_fixed_columns(RecommendationMethod::Svd), 10);
        assert!(plan.columns.iter().all(|c| !c.nullable));
    }

    #[test]
    fn cf_index_has_one_model_column() {
        let options = RecommenderOptions::default();
        let plan = index_table(&options, &definition(RecommendationMethod::ItemCosCF, &[]));
        assert_eq!(plan.columns.len(), index_fixed_columns(RecommendationMethod::ItemCosCF));
        assert_eq!(plan.columns[1].name, "recModelName");
    }

    #[test]
    fn user_similarity_table_uses_user_columns() {
        let plans = model_tables(
            RecommendationMethod::UserPearCF,
            &ModelNames::Similarity("m".into()),
        );
        assert_eq!(column_names(&plans[0]), vec!["user1", "user2", "similarity"]);
    }

    #[test]
    fn view_table_keys_on_user_and_item() {
        let plan = view_table(&definition(RecommendationMethod::ItemCosCF, &[]), "v");
        assert_eq!(plan.primary_key(), vec!["uid", "iid"]);
    }
}
