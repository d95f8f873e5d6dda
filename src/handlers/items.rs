//! Item CRUD handlers

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    extract::{Json, Path, Query},
    models::{CreateItem, Item, UpdateItem},
    pagination::{PageParams, Paginated},
    query::{FilterConfig, FilterOperator, FilterType, QueryCriteria, SortConfig, SortOrder},
    responses::{Created, NoContent},
    state::AppState,
};

const NOT_FOUND_MESSAGE: &str = "item not found";

/// Columns callers may sort items by; everything else falls back to the
/// default of newest first
const ITEM_SORT: SortConfig = SortConfig {
    allowed_fields: &["name", "stock", "price", "created_at"],
    default_field: "created_at",
    default_order: SortOrder::Desc,
};

const ITEM_FILTERS: &[FilterConfig] = &[
    FilterConfig {
        query_param: "name",
        column: "name",
        operator: FilterOperator::ILike,
        value_type: FilterType::Text,
    },
    FilterConfig {
        query_param: "min_stock",
        column: "stock",
        operator: FilterOperator::Gte,
        value_type: FilterType::Int,
    },
];

/// Query parameters accepted by the list endpoint
///
/// `limit` is an alias for `page_size`; `page_size` wins when both are set.
/// Filter values arrive as raw strings and are parsed against the filter
/// table so a bad `min_stock` is a 400, not a store error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    page: Option<u32>,
    page_size: Option<u32>,
    limit: Option<u32>,
    sort_by: Option<String>,
    order: Option<String>,
    name: Option<String>,
    min_stock: Option<String>,
}

impl ListParams {
    fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.page_size.or(self.limit))
    }

    fn raw_filter_value(&self, query_param: &str) -> Option<&str> {
        match query_param {
            "name" => self.name.as_deref(),
            "min_stock" => self.min_stock.as_deref(),
            _ => None,
        }
    }

    fn criteria(&self) -> Result<QueryCriteria> {
        let mut criteria =
            QueryCriteria::new(&ITEM_SORT, self.sort_by.as_deref(), self.order.as_deref());

        for filter in ITEM_FILTERS {
            if let Some(applied) = filter.bind(self.raw_filter_value(filter.query_param))? {
                criteria = criteria.with_filter(applied);
            }
        }

        Ok(criteria)
    }
}

/// GET /inventory
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Item>>> {
    let criteria = params.criteria()?;
    let page = state.items().list(&criteria, &params.page_params()).await?;

    Ok(Json(page))
}

/// GET /inventory/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>> {
    let item = state
        .items()
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound(NOT_FOUND_MESSAGE.to_string()))?;

    Ok(Json(item))
}

/// POST /inventory
pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateItem>,
) -> Result<Created<Item>> {
    if input.name.is_empty() {
        return Err(Error::BadRequest("name must not be empty".to_string()));
    }

    let item = state.items().create(input).await?;
    let location = format!("/inventory/{}", item.id);

    Ok(Created::new(item).with_location(location))
}

/// PUT /inventory/{id}
///
/// Partial update: only fields present in the body are written. The target
/// is checked before any write.
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UpdateItem>,
) -> Result<Json<Item>> {
    let item = state
        .items()
        .update(id, changes)
        .await?
        .ok_or_else(|| Error::NotFound(NOT_FOUND_MESSAGE.to_string()))?;

    Ok(Json(item))
}

/// DELETE /inventory/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<NoContent> {
    if !state.items().delete(id).await? {
        return Err(Error::NotFound(NOT_FOUND_MESSAGE.to_string()));
    }

    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> ListParams {
        serde_urlencoded::from_str(query).unwrap()
    }

    #[test]
    fn test_limit_is_page_size_alias() {
        let params = params("limit=25");
        assert_eq!(params.page_params().page_size(), 25);
    }

    #[test]
    fn test_page_size_wins_over_limit() {
        let params = params("page_size=30&limit=25");
        assert_eq!(params.page_params().page_size(), 30);
    }

    #[test]
    fn test_empty_name_filter_matches_no_filter() {
        let with_empty = params("name=").criteria().unwrap();
        let without = params("").criteria().unwrap();
        assert_eq!(with_empty.filter_count(), 0);
        assert_eq!(without.filter_count(), 0);
    }

    #[test]
    fn test_both_filters_applied() {
        let criteria = params("name=lap&min_stock=5").criteria().unwrap();
        assert_eq!(criteria.filter_count(), 2);
    }

    #[test]
    fn test_bad_min_stock_is_rejected() {
        let err = params("min_stock=plenty").criteria().unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        let criteria = params("sort_by=secret_column").criteria().unwrap();
        assert_eq!(criteria.sort_column(), "created_at");
        assert_eq!(criteria.sort_order(), SortOrder::Desc);
    }

    #[test]
    fn test_allowed_sort_is_used() {
        let criteria = params("sort_by=price&order=asc").criteria().unwrap();
        assert_eq!(criteria.sort_column(), "price");
        assert_eq!(criteria.sort_order(), SortOrder::Asc);
    }
}
