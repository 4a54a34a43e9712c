use axum::{extract::State, Json};
use axum_macros::debug_handler;

use super::{dto::SchoolFacets, ApiContext, ApiErrors, ErrorBody};

/// List filter values
///
/// Distinct cities and states of all registered schools, sorted ascending.
#[debug_handler]
#[utoipa::path(
    get,
    path = "/api/schools/facets",
    operation_id = "listSchoolFacets",
    responses(
        (status = OK, description = "Distinct cities and states", body = SchoolFacets),
        (status = INTERNAL_SERVER_ERROR, description = "Internal server error", body = ErrorBody),
    ),
    tag = super::TAG_SCHOOLS,
)]
pub(crate) async fn api_list_facets(
    State(ctx): State<ApiContext>,
) -> Result<Json<SchoolFacets>, ApiErrors> {
    Ok(Json(ctx.store.facets().await?))
}
