//! Context partitioning: which cells a recommender is split into.

use recdb_gateway::QueryGateway;
use recdb_plan::{ColumnFilter, SelectPlan};
use recdb_result::Result;

use crate::request::RecommenderDefinition;

/// Assignment of values to a recommender's context attributes.
///
/// Empty for the single cell of a context-free recommender.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellContext {
    pairs: Vec<(String, String)>,
}

impl CellContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(attribute, value)` pairs in attribute declaration order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn value(&self, attribute: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, value)| value.as_str())
    }

    /// Equality filter selecting the rows that belong to this cell.
    pub fn to_filter(&self) -> ColumnFilter {
        self.pairs
            .iter()
            .fold(ColumnFilter::new(), |filter, (name, value)| {
                filter.and_eq(name.as_str(), value.as_str())
            })
    }
}

/// Enumerate the cells of `definition`.
///
/// A context-free recommender has exactly one cell with an empty context.
/// Otherwise a `DISTINCT` projection of the context attributes over the user
/// table yields one cell per observed combination, in the order the gateway
/// returns them. The query session is closed before this returns.
pub fn partition(
    gateway: &dyn QueryGateway,
    definition: &RecommenderDefinition,
) -> Result<Vec<CellContext>> {
    if definition.is_context_free() {
        return Ok(vec![CellContext::empty()]);
    }

    let plan = SelectPlan::new(&definition.user_table)
        .with_projections(definition.context_attributes.iter().cloned())
        .distinct();
    tracing::debug!(
        "partitioning recommender '{}' on {:?} from '{}'",
        definition.name,
        definition.context_attributes,
        definition.user_table
    );

    let mut cursor = gateway.open_cursor(&plan)?;
    let mut cells = Vec::new();
    while let Some(row) = cursor.next_row()? {
        let pairs = definition
            .context_attributes
            .iter()
            .map(|attribute| Ok((attribute.clone(), row.string_value(attribute)?)))
            .collect::<Result<Vec<_>>>()?;
        cells.push(CellContext { pairs });
    }
    tracing::debug!(
        "recommender '{}' partitions into {} cell(s)",
        definition.name,
        cells.len()
    );
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recdb_plan::PlanValue;

    #[test]
    fn filter_preserves_attribute_order() {
        let context = CellContext::from_pairs([("season", "winter"), ("region", "eu")]);
        let filter = context.to_filter();
        assert_eq!(
            filter.predicates,
            vec![
                ("season".to_string(), PlanValue::from("winter")),
                ("region".to_string(), PlanValue::from("eu")),
            ]
        );
        assert_eq!(context.value("REGION"), Some("eu"));
    }

    #[test]
    fn empty_context_has_empty_filter() {
        assert!(CellContext::empty().to_filter().is_empty());
    }
}
