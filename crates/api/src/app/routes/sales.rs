use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, NaiveDateTime, Utc};

use stockpos_core::{ProductId, SaleId};
use stockpos_infra::SaleLedger;
use stockpos_sales::{SaleFilter, SalesSummary, SummaryPeriod};

use crate::app::dto::{
    MetricsQuery, PeriodSummaryResponse, SaleCreateRequest, SaleResponse, SalesQuery,
    SalesSummaryResponse,
};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/summary", get(sales_summary))
        .route("/metrics", get(sales_metrics))
        .route("/:id", get(get_sale))
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<SaleCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services
        .sales
        .create_sale(ProductId::new(req.producto_id), req.cantidad)
    {
        Ok(sale) => (StatusCode::CREATED, Json(SaleResponse::from(&sale))).into_response(),
        Err(e) => errors::sale_error_to_response(e),
    }
}

/// `?start=&end=` (ISO-8601, inclusive) and `?producto_id=`.
pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<SalesQuery>, QueryRejection>,
) -> axum::response::Response {
    let filter = match query
        .map_err(errors::invalid_query)
        .and_then(|Query(q)| sale_filter(&q))
    {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    match services.ledger.list(&filter) {
        Ok(sales) => Json(sales.iter().map(SaleResponse::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SaleId = match id.parse() {
        Ok(id) => id,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}"));
        }
    };

    match services.ledger.get(id) {
        Ok(Some(sale)) => Json(SaleResponse::from(&sale)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Venta no encontrada"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Revenue, cost and profit per product over the filtered sales.
pub async fn sales_summary(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<SalesQuery>, QueryRejection>,
) -> axum::response::Response {
    let filter = match query
        .map_err(errors::invalid_query)
        .and_then(|Query(q)| sale_filter(&q))
    {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    match services.ledger.list(&filter) {
        Ok(sales) => {
            Json(SalesSummaryResponse::from(&SalesSummary::from_sales(&sales))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Totals per day, ISO week or month (`?period=`, default `day`).
pub async fn sales_metrics(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<MetricsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::invalid_query(rejection),
    };
    let period = match query.period.as_deref().map(str::parse::<SummaryPeriod>).transpose() {
        Ok(period) => period.unwrap_or_default(),
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", format!("{e}")),
    };
    let filter = match sale_filter(&query.filter) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    match services.ledger.list(&filter) {
        Ok(sales) => Json(
            SalesSummary::by_period(&sales, period)
                .iter()
                .map(PeriodSummaryResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn sale_filter(query: &SalesQuery) -> Result<SaleFilter, axum::response::Response> {
    let mut filter = SaleFilter::all();
    if let Some(raw) = query.start.as_deref() {
        filter = filter.since(parse_timestamp("start", raw)?);
    }
    if let Some(raw) = query.end.as_deref() {
        filter = filter.until(parse_timestamp("end", raw)?);
    }
    if let Some(raw) = query.producto_id.as_deref() {
        let id: ProductId = raw.parse().map_err(|e| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", format!("producto_id: {e}"))
        })?;
        filter = filter.for_product(id);
    }
    Ok(filter)
}

/// RFC 3339, or a naive ISO date-time / date taken as UTC.
fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(t.and_utc());
    }
    if let Some(t) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(t.and_utc());
    }
    Err(errors::json_error(
        StatusCode::BAD_REQUEST,
        "invalid_query",
        format!("{name} must be an ISO-8601 timestamp, got '{raw}'"),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_accept_rfc3339_naive_and_date() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("start", "2025-03-01T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("start", "2025-03-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("start", "2025-03-01").unwrap(), expected);
        assert_eq!(
            parse_timestamp("start", "yesterday").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn filter_rejects_malformed_product_id() {
        let query = SalesQuery {
            producto_id: Some("uno".to_string()),
            ..SalesQuery::default()
        };
        assert_eq!(
            sale_filter(&query).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
