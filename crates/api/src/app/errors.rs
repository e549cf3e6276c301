use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use stockpos_infra::StoreError;
use stockpos_sales::SaleError;

use crate::app::dto::ApiError;

pub fn sale_error_to_response(err: SaleError) -> axum::response::Response {
    match err {
        SaleError::InvalidQuantity(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_quantity", err.to_string())
        }
        SaleError::ProductNotFound(_) => {
            json_error(StatusCode::BAD_REQUEST, "product_not_found", "Producto no existe")
        }
        SaleError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", "Stock insuficiente")
        }
        SaleError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "Database unavailable",
        ),
    }
}

/// Catalog/ledger read and edit errors. Here a missing product is the
/// resource itself, so it is a 404 rather than a bad request.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "Producto no encontrado")
        }
        StoreError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        StoreError::InsufficientStock { .. } => json_error(
            StatusCode::BAD_REQUEST,
            "insufficient_stock",
            "Stock insuficiente",
        ),
        StoreError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "Database unavailable",
        ),
    }
}

/// Malformed or mistyped JSON bodies are all 400s, whatever axum would pick.
pub fn invalid_body(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn invalid_query(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(ApiError {
            status: status.as_u16(),
            error: code.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use stockpos_core::ProductId;

    use super::*;

    #[test]
    fn client_sale_errors_are_bad_requests() {
        for err in [
            SaleError::InvalidQuantity(0),
            SaleError::ProductNotFound(ProductId::new(1)),
            SaleError::InsufficientStock {
                requested: 2,
                available: 1,
            },
        ] {
            assert_eq!(sale_error_to_response(err).status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn unavailable_is_503() {
        let response = sale_error_to_response(SaleError::unavailable("contention"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound(ProductId::new(3)), StatusCode::NOT_FOUND),
            (StoreError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (StoreError::Concurrency("stale".into()), StatusCode::CONFLICT),
            (
                StoreError::Unavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(store_error_to_response(err).status(), status);
        }
    }
}
