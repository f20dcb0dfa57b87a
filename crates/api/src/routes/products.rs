//! Retail product CRUD and bulk import.
//!
//! SKUs are unique within a business when present.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use reservio_core::domain::{Product, ProductDraft, ProductPatch};
use reservio_core::types::ProductId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{ProductRepository, RepositoryError, Tenant};
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::BusinessAuth;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/import", post(import))
        .route("/{id}", get(show).patch(update).delete(destroy))
}

fn check_sku(
    tenant: &Tenant,
    sku: Option<&str>,
    except: Option<ProductId>,
) -> std::result::Result<(), RepositoryError> {
    let Some(sku) = sku else {
        return Ok(());
    };
    let taken = tenant
        .products
        .iter()
        .any(|p| Some(p.id) != except && p.sku.as_deref() == Some(sku));
    if taken {
        return Err(RepositoryError::Conflict(format!("SKU {sku} is already in use")));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let repo = ProductRepository::new(state.db(), auth.business_id);
    let products = match query.category {
        Some(category) => {
            repo.filter(|p| {
                p.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&category))
            })
            .await?
        }
        None => repo.list().await?,
    };
    Ok(Json(products))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = Product::create(draft, Utc::now())?;
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    check_sku(tenant, product.sku.as_deref(), None)?;
    tenant.products.insert(product.clone())?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(product))
}

/// Update a product. A `variants` list replaces the existing variants.
#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    check_sku(tenant, patch.sku.as_deref(), Some(id))?;
    let stored = tenant.products.find_mut(id)?;
    let mut updated = stored.clone();
    updated.apply(patch, Utc::now())?;
    *stored = updated.clone();
    Ok(Json(updated))
}

#[instrument(skip_all, fields(%id))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.db(), auth.business_id)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk import body.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub products: Vec<ProductDraft>,
}

/// One rejected import row.
#[derive(Debug, Serialize)]
pub struct ImportFailure {
    /// Position of the row in the request.
    pub index: usize,
    pub name: String,
    pub error: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<ImportFailure>,
    pub products: Vec<Product>,
}

/// Import products one by one. Valid rows are kept even when others fail.
#[instrument(skip_all, fields(rows = request.products.len()))]
pub async fn import(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportReport>> {
    let now = Utc::now();
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;

    let mut report = ImportReport {
        created: 0,
        failed: 0,
        errors: Vec::new(),
        products: Vec::new(),
    };
    for (index, draft) in request.products.into_iter().enumerate() {
        let name = draft.name.clone();
        let outcome = Product::create(draft, now)
            .map_err(RepositoryError::from)
            .and_then(|product| {
                check_sku(tenant, product.sku.as_deref(), None)?;
                tenant.products.insert(product.clone())?;
                Ok(product)
            });
        match outcome {
            Ok(product) => {
                report.created += 1;
                report.products.push(product);
            }
            Err(err) => {
                report.failed += 1;
                report.errors.push(ImportFailure {
                    index,
                    name,
                    error: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        created = report.created,
        failed = report.failed,
        "Product import finished"
    );
    Ok(Json(report))
}
