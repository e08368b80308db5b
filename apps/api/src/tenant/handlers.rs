use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::tenant::bundle::TenantBundle;
use crate::tenant::links::{company_from_path, PageLinks};
use crate::tenant::source::DEFAULT_TENANT;
use crate::tenant::views::{ContactPage, HomePage, PortfolioPage, ResumePage};

#[derive(Serialize)]
pub struct TenantListResponse {
    pub tenants: Vec<String>,
    /// Key served at the site root.
    pub default: String,
}

/// Unknown, malformed and unreadable tenants all look the same to a visitor.
pub(crate) async fn load_or_not_found(
    state: &AppState,
    key: &str,
) -> Result<TenantBundle, AppError> {
    state
        .resolver
        .load_tenant(key)
        .await
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))
}

/// GET /api/v1/tenants
pub async fn handle_list_tenants(State(state): State<AppState>) -> Json<TenantListResponse> {
    let tenants = state.resolver.list_tenants().await;
    let default = state.resolver.default_tenant_key().await;
    Json(TenantListResponse { tenants, default })
}

/// GET /api/v1/tenants/:key/home
pub async fn handle_home(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<HomePage>, AppError> {
    let bundle = load_or_not_found(&state, &key).await?;
    Ok(Json(HomePage::build(&bundle)))
}

/// GET /api/v1/tenants/:key/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ResumePage>, AppError> {
    let bundle = load_or_not_found(&state, &key).await?;
    Ok(Json(ResumePage::build(&bundle)))
}

/// GET /api/v1/tenants/:key/portfolio
pub async fn handle_portfolio(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PortfolioPage>, AppError> {
    let bundle = load_or_not_found(&state, &key).await?;
    Ok(Json(PortfolioPage::build(&bundle)))
}

/// GET /api/v1/tenants/:key/contact
pub async fn handle_contact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ContactPage>, AppError> {
    let bundle = load_or_not_found(&state, &key).await?;
    Ok(Json(ContactPage::build(&bundle)))
}

#[derive(Deserialize)]
pub struct LinksQuery {
    pub path: String,
}

#[derive(Serialize)]
pub struct LinksResponse {
    pub company: Option<String>,
    pub links: PageLinks,
}

/// GET /api/v1/links?path=/acme/resume
/// Navigation links for whatever company the current page belongs to.
pub async fn handle_links(Query(params): Query<LinksQuery>) -> Json<LinksResponse> {
    let company = company_from_path(&params.path);
    Json(LinksResponse {
        company: company.map(str::to_string),
        links: PageLinks::for_tenant(company.unwrap_or(DEFAULT_TENANT)),
    })
}
