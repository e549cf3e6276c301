use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockpos_core::{ExpectedVersion, ProductId};
use stockpos_infra::ProductStore;

use crate::app::dto::{ProductCreateRequest, ProductResponse, ProductUpdateRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}")))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list() {
        Ok(products) => Json(products.iter().map(ProductResponse::from).collect::<Vec<_>>())
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.products.get(id) {
        Ok(product) => Json(ProductResponse::from(&product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ProductCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.products.insert(req.into()) {
        Ok(product) => (StatusCode::CREATED, Json(ProductResponse::from(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdateRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_body(rejection),
    };
    let expected = req.version.map_or(ExpectedVersion::Any, ExpectedVersion::Exact);

    match services.products.update(id, req.to_patch(), expected) {
        Ok(product) => Json(ProductResponse::from(&product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.products.delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
