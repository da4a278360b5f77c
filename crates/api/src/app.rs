use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use labstock_catalog::{ProductPageQuery, ProductSpec};
use labstock_core::{DomainError, Page, ProductId};
use labstock_infra::{CatalogService, InventoryStore, LedgerService, ServiceError, StoreError};
use labstock_ledger::TimeRange;

use crate::dto::{
    AdjustRequest, CreateProductRequest, LowStockQuery, OperationDto, OperationsQuery,
    PagedOperationsQuery, PagedOperationsResponse, PagedProductsResponse, ProductDto,
    ProductsPagedQuery, SearchQuery, StatusDto, UpdateProductRequest,
};

/// Shared handler state: both services over one store.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub ledger: LedgerService,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            ledger: LedgerService::new(store),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/products", products_router())
        .nest("/api/inventory", inventory_router())
        .with_state(state)
}

fn products_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/paged", get(products_paged))
        .route("/search", get(search_products))
        .route("/by-type/:kind", get(products_by_kind))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/adjust", axum::routing::post(adjust_inventory))
        .route("/status", get(inventory_status))
        .route("/lowstock", get(low_stock))
        .route("/operations", get(operations))
        .route("/operations/paged", get(operations_paged))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Response {
    let spec = match ProductSpec::new(body.name, body.kind, body.size, body.material) {
        Ok(spec) => spec,
        Err(e) => return service_error_response(e.into()),
    };

    match state.catalog.create_product(spec, body.initial_quantity).await {
        Ok(product) => (StatusCode::CREATED, Json(ProductDto::from(product))).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn list_products(State(state): State<AppState>) -> Response {
    match state.catalog.products().await {
        Ok(products) => Json(
            products
                .into_iter()
                .map(ProductDto::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.catalog.product(ProductId::new(id)).await {
        Ok(product) => Json(ProductDto::from(product)).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductRequest>,
) -> Response {
    if body.id != id {
        return json_error(StatusCode::BAD_REQUEST, "id_mismatch", "id mismatch");
    }

    let spec = match ProductSpec::new(body.name, body.kind, body.size, body.material) {
        Ok(spec) => spec,
        Err(e) => return service_error_response(e.into()),
    };

    match state.catalog.update_product(ProductId::new(id), spec).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.catalog.delete_product(ProductId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match state.catalog.search_by_name(&query.name).await {
        Ok(products) => Json(
            products
                .into_iter()
                .map(ProductDto::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn products_by_kind(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    match state.catalog.products_by_kind(&kind).await {
        Ok(products) => Json(
            products
                .into_iter()
                .map(ProductDto::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn products_paged(
    State(state): State<AppState>,
    Query(query): Query<ProductsPagedQuery>,
) -> Response {
    let page_query = ProductPageQuery {
        page: Page::new(query.page, query.page_size),
        sort_by: query.sort_by,
        descending: query.descending,
    };

    match state.catalog.products_page(page_query).await {
        Ok(page) => Json(PagedProductsResponse {
            products: page.products.into_iter().map(ProductDto::from).collect(),
            total_count: page.total_count,
        })
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn adjust_inventory(
    State(state): State<AppState>,
    Json(body): Json<AdjustRequest>,
) -> Response {
    match state
        .ledger
        .adjust_quantity(ProductId::new(body.product_id), body.quantity_change)
        .await
    {
        Ok(status) => Json(StatusDto::from(status)).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn inventory_status(State(state): State<AppState>) -> Response {
    match state.ledger.statuses().await {
        Ok(statuses) => Json(
            statuses
                .into_iter()
                .map(StatusDto::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn low_stock(State(state): State<AppState>, Query(query): Query<LowStockQuery>) -> Response {
    match state.ledger.low_stock(query.threshold).await {
        Ok(statuses) => Json(
            statuses
                .into_iter()
                .map(StatusDto::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn operations(
    State(state): State<AppState>,
    Query(query): Query<OperationsQuery>,
) -> Response {
    let range = TimeRange::new(query.start_time, query.end_time);
    match state.ledger.operations(range).await {
        Ok(ops) => {
            Json(ops.into_iter().map(OperationDto::from).collect::<Vec<_>>()).into_response()
        }
        Err(e) => service_error_response(e),
    }
}

async fn operations_paged(
    State(state): State<AppState>,
    Query(query): Query<PagedOperationsQuery>,
) -> Response {
    let range = TimeRange::new(query.start_time, query.end_time);
    let page = Page::new(query.page, query.page_size);

    match state.ledger.operations_page(page, range).await {
        Ok(result) => Json(PagedOperationsResponse {
            operations: result
                .operations
                .into_iter()
                .map(OperationDto::from)
                .collect(),
            total_count: result.total_count,
        })
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

fn service_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(DomainError::NotFound) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "not found")
        }
        ServiceError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        ServiceError::Domain(DomainError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        ServiceError::Store(StoreError::Unavailable(msg)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        ServiceError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
