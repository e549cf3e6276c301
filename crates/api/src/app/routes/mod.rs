use axum::Router;

pub mod products;
pub mod sales;
pub mod system;

/// Router for everything under `/api`.
///
/// ```text
/// GET    /products            POST /products
/// GET    /products/:id        PUT  /products/:id    DELETE /products/:id
/// GET    /sales?start=&end=&producto_id=
/// POST   /sales
/// GET    /sales/summary?start=&end=&producto_id=
/// GET    /sales/metrics?period=day|week|month&start=&end=&producto_id=
/// GET    /sales/:id
/// ```
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/sales", sales::router())
}
