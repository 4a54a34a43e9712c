use axum::{extract::State, Json};
use axum_macros::debug_handler;
use sea_orm::{DbErr, Order};
use serde::Deserialize;
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::axumext::extractors::ValidatedQueryParams;

use super::{
    data_service::SchoolStore,
    db::SchoolFilter,
    dto::SchoolsPage,
    types::{Pagination, PaginationMeta},
    ApiContext, ApiErrors, ErrorBody,
};

#[derive(Debug, Deserialize, Validate, utoipa::IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub(crate) struct ListSchoolsParams {
    /// Page number, starting at 1
    #[validate(range(min = 1, message = "page must be at least 1"))]
    #[param(minimum = 1, example = 1, default = 1)]
    page: u32,

    /// Page size
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, example = 10, default = 10)]
    limit: u32,

    /// Case-insensitive substring of name, address, city or state
    #[validate(custom(function = "validate_search"))]
    #[param(max_length = 200, example = "delhi")]
    search: Option<String>,

    /// Exact city
    city: Option<String>,

    /// Exact state
    state: Option<String>,
}

const MAX_SEARCH_CHARS: usize = 200;

/// The cap applies to the trimmed term, surrounding blanks are free.
fn validate_search(search: &String) -> Result<(), ValidationError> {
    if search.trim().chars().count() > MAX_SEARCH_CHARS {
        return Err(ValidationError::new("length")
            .with_message("search must not exceed 200 characters".into()));
    }
    Ok(())
}

impl Default for ListSchoolsParams {
    fn default() -> Self {
        Self {
            page: Pagination::DEFAULT_PAGE,
            limit: Pagination::DEFAULT_LIMIT,
            search: None,
            city: None,
            state: None,
        }
    }
}

/// Normalized listing request handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SchoolQuery {
    pagination: Pagination,
    filter: SchoolFilter,
}

impl SchoolQuery {
    pub(crate) fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub(crate) fn filter(&self) -> &SchoolFilter {
        &self.filter
    }
}

/// Expects parameters already checked by [`ValidatedQueryParams`].
impl From<ListSchoolsParams> for SchoolQuery {
    fn from(params: ListSchoolsParams) -> Self {
        Self {
            pagination: Pagination::new(params.page, params.limit),
            filter: SchoolFilter::new(
                params.search.as_deref(),
                params.city.as_deref(),
                params.state.as_deref(),
            ),
        }
    }
}

/// Count and page are read concurrently; a write landing in between is tolerated.
pub(crate) async fn list_schools(
    store: &dyn SchoolStore,
    query: &SchoolQuery,
) -> Result<SchoolsPage, DbErr> {
    let pagination = query.pagination();
    let (total_count, schools) = tokio::try_join!(
        store.count(query.filter()),
        store.find(
            query.filter(),
            pagination.skip(),
            u64::from(pagination.limit()),
            Order::Desc,
        ),
    )?;
    debug!(
        "Page {} of schools: {} of {} matching",
        pagination.page(),
        schools.len(),
        total_count
    );

    Ok(SchoolsPage {
        schools,
        pagination: PaginationMeta::new(total_count, pagination),
    })
}

/// List schools
///
/// One page of schools, newest first, optionally narrowed by a search term.
#[debug_handler]
#[utoipa::path(
    get,
    path = "/api/schools",
    operation_id = "listSchools",
    params(ListSchoolsParams),
    responses(
        (status = OK, description = "Page of schools", body = SchoolsPage),
        (status = BAD_REQUEST, description = "Invalid paging or search parameters", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Internal server error", body = ErrorBody),
    ),
    tag = super::TAG_SCHOOLS,
)]
pub(crate) async fn api_list_schools(
    State(ctx): State<ApiContext>,
    ValidatedQueryParams(params): ValidatedQueryParams<ListSchoolsParams>,
) -> Result<Json<SchoolsPage>, ApiErrors> {
    let query = SchoolQuery::from(params);
    let filter = query.filter();
    if !filter.is_match_all() {
        debug!(
            "Filtering schools by search {:?}, city {:?}, state {:?}",
            filter.search(),
            filter.city(),
            filter.state()
        );
    }

    let page = list_schools(ctx.store.as_ref(), &query).await?;
    Ok(Json(page))
}
