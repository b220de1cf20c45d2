mod common;

use std::sync::Arc;

use arrow::datatypes::DataType;
use common::{CountingKernels, RecordingGateway};
use recdb_gateway::{MemGateway, QueryGateway};
use recdb_plan::{ColumnSpec, CreateTablePlan, InsertPlan, NotNull, PlanValue, timestamp_type};
use recdb_recommender::{CreateRecommenderRequest, RecommenderManager};
use recdb_result::Error;
use recdb_test_utils::init_tracing_for_tests;

type Manager = RecommenderManager<RecordingGateway, CountingKernels>;

const ITEMS: i64 = 2;

/// Users and ratings that share the nullable `columns`; each user rates every
/// item once with the user's own context values.
fn manager_over(columns: &[(&str, DataType)], users: &[Vec<PlanValue>]) -> Manager {
    init_tracing_for_tests();
    let gateway = RecordingGateway::new(MemGateway::new());

    let mut user_table = CreateTablePlan::new("Users")
        .with_column(ColumnSpec::new("uid", DataType::Int32, false).with_primary_key(true));
    let mut rating_table = CreateTablePlan::new("Ratings")
        .with_column(("uid", DataType::Int32, NotNull))
        .with_column(("iid", DataType::Int32, NotNull))
        .with_column(("score", DataType::Float32, NotNull));
    for (name, data_type) in columns {
        user_table = user_table.with_column((*name, data_type.clone()));
        rating_table = rating_table.with_column((*name, data_type.clone()));
    }
    let item_table = CreateTablePlan::new("Items")
        .with_column(ColumnSpec::new("iid", DataType::Int32, false).with_primary_key(true));
    for plan in [user_table, rating_table, item_table] {
        gateway.execute(plan.into()).expect("create source table");
    }

    let mut items = InsertPlan::new("items");
    for iid in 1..=ITEMS {
        items = items.with_row(vec![iid.into()]);
    }
    gateway.execute(items.into()).expect("insert items");

    for (uid, context) in (1_i64..).zip(users) {
        let mut user = vec![PlanValue::from(uid)];
        user.extend(context.iter().cloned());
        gateway
            .execute(InsertPlan::new("users").with_row(user).into())
            .expect("insert user");

        let mut ratings = InsertPlan::new("ratings");
        for iid in 1..=ITEMS {
            let mut rating = vec![uid.into(), iid.into(), 3.0.into()];
            rating.extend(context.iter().cloned());
            ratings = ratings.with_row(rating);
        }
        gateway.execute(ratings.into()).expect("insert ratings");
    }

    gateway.clear_log();
    RecommenderManager::new(Arc::new(gateway), Arc::new(CountingKernels::new()))
}

fn request() -> CreateRecommenderRequest {
    CreateRecommenderRequest::new("movies")
        .users("Users", "uid")
        .items("Items", "iid")
        .ratings("Ratings", "score")
        .using("itemcoscf")
}

fn totals(manager: &Manager) -> Vec<i64> {
    manager
        .cells("movies")
        .expect("read cells")
        .iter()
        .map(|cell| cell.rating_total)
        .collect()
}

#[test]
fn float_context_cells_select_their_ratings() {
    let manager = manager_over(
        &[("tier", DataType::Float64)],
        &[vec![1.0.into()], vec![2.5.into()], vec![1.0.into()]],
    );
    let created = manager
        .create(&request().with_context_attribute("tier"))
        .expect("create recommender");

    let tiers: Vec<&str> = created
        .cells
        .iter()
        .map(|cell| cell.context.value("tier").expect("tier value"))
        .collect();
    assert_eq!(tiers, vec!["1.0", "2.5"]);
    assert_eq!(totals(&manager), vec![4, 2]);
}

#[test]
fn timestamp_context_cells_select_their_ratings() {
    let opened = PlanValue::Timestamp(1_709_294_400_000_000);
    let closed = PlanValue::Timestamp(1_709_380_800_250_000);
    let manager = manager_over(
        &[("opened", timestamp_type())],
        &[vec![opened.clone()], vec![closed], vec![opened]],
    );
    let created = manager
        .create(&request().with_context_attribute("opened"))
        .expect("create recommender");

    assert_eq!(created.cells.len(), 2);
    assert_eq!(totals(&manager), vec![4, 2]);
}

#[test]
fn two_context_attributes_split_on_observed_combinations() {
    let users: Vec<Vec<PlanValue>> = [
        ("winter", "eu"),
        ("winter", "us"),
        ("summer", "eu"),
        ("winter", "eu"),
    ]
    .into_iter()
    .map(|(season, region)| vec![season.into(), region.into()])
    .collect();
    let manager = manager_over(
        &[("season", DataType::Utf8), ("region", DataType::Utf8)],
        &users,
    );
    manager
        .create(
            &request()
                .with_context_attribute("Season")
                .with_context_attribute("Region"),
        )
        .expect("create recommender");

    let cells = manager.cells("movies").expect("read cells");
    let combinations: Vec<(&str, &str)> = cells
        .iter()
        .map(|cell| {
            (
                cell.context.value("season").expect("season value"),
                cell.context.value("region").expect("region value"),
            )
        })
        .collect();
    assert_eq!(
        combinations,
        vec![("winter", "eu"), ("winter", "us"), ("summer", "eu")]
    );
    assert_eq!(totals(&manager), vec![4, 2, 2]);

    let columns = manager
        .gateway()
        .inner()
        .column_names("moviesindex")
        .expect("index columns");
    assert_eq!(columns[columns.len() - 2..], ["season", "region"]);
}

#[test]
fn null_context_value_rejects_the_create() {
    let manager = manager_over(
        &[("season", DataType::Utf8), ("region", DataType::Utf8)],
        &[
            vec!["winter".into(), "eu".into()],
            vec!["winter".into(), PlanValue::Null],
        ],
    );
    let before = manager.gateway().inner().table_names().expect("tables");

    let err = manager
        .create(
            &request()
                .with_context_attribute("season")
                .with_context_attribute("region"),
        )
        .expect_err("NULL context value");
    assert!(matches!(err, Error::InvalidArgumentError(ref msg) if msg.contains("region")));
    assert_eq!(manager.gateway().inner().table_names().expect("tables"), before);
    assert!(!manager.recommender_exists("movies").expect("exists"));
}
