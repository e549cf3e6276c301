use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpos_core::{AggregateRoot, Money};
use stockpos_products::{NewProduct, Product, ProductPatch};
use stockpos_sales::{PeriodSummary, ProductSummary, Sale, SalesSummary, SummaryTotals};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub error: String,
    pub message: String,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCreateRequest {
    pub producto_id: i64,
    pub cantidad: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreateRequest {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub precio_venta: Money,
    #[serde(default)]
    pub costo_unitario: Money,
    #[serde(default)]
    pub stock: u64,
}

/// `GET /api/sales` and `/api/sales/summary` filters. Timestamps are
/// ISO-8601 and inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SalesQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub producto_id: Option<String>,
}

/// `GET /api/sales/metrics`: the sales filters plus the bucket width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetricsQuery {
    #[serde(flatten)]
    pub filter: SalesQuery,
    #[serde(default)]
    pub period: Option<String>,
}

impl From<ProductCreateRequest> for NewProduct {
    fn from(req: ProductCreateRequest) -> Self {
        NewProduct {
            name: req.nombre,
            description: req.descripcion,
            price: req.precio_venta,
            unit_cost: req.costo_unitario,
            stock: req.stock,
        }
    }
}

/// Catalog edit. Omitted fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdateRequest {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub precio_venta: Option<Money>,
    #[serde(default)]
    pub costo_unitario: Option<Money>,
    #[serde(default)]
    pub stock: Option<u64>,
    /// Version the client last saw; the update fails on mismatch.
    #[serde(default)]
    pub version: Option<u64>,
}

impl ProductUpdateRequest {
    pub fn to_patch(&self) -> ProductPatch {
        ProductPatch {
            name: self.nombre.clone(),
            description: self.descripcion.clone().map(Some),
            price: self.precio_venta,
            unit_cost: self.costo_unitario,
            stock: self.stock,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleResponse {
    pub id: i64,
    pub producto_id: i64,
    pub nombre: String,
    pub cantidad: u64,
    pub precio_unitario: Money,
    pub costo_unitario: Money,
    pub total: Money,
    pub hora: DateTime<Utc>,
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id_typed().get(),
            producto_id: sale.product_id().get(),
            nombre: sale.product_name().to_string(),
            cantidad: sale.quantity(),
            precio_unitario: sale.unit_price(),
            costo_unitario: sale.unit_cost(),
            total: sale.total(),
            hora: sale.occurred_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio_venta: Money,
    pub costo_unitario: Money,
    pub stock: u64,
    pub version: u64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id_typed().get(),
            nombre: product.name().to_string(),
            descripcion: product.description().map(str::to_string),
            precio_venta: product.price(),
            costo_unitario: product.unit_cost(),
            stock: product.stock(),
            version: product.version(),
        }
    }
}

fn profit(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsResponse {
    pub ventas: usize,
    pub items: u64,
    pub ingresos: Money,
    pub costos: Money,
    /// Revenue minus cost; negative when sold below cost.
    pub ganancia: f64,
}

impl From<&SummaryTotals> for TotalsResponse {
    fn from(t: &SummaryTotals) -> Self {
        Self {
            ventas: t.sales,
            items: t.quantity,
            ingresos: t.revenue,
            costos: t.cost,
            ganancia: profit(t.profit_cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummaryResponse {
    pub producto_id: i64,
    pub nombre: String,
    pub ventas: usize,
    pub items: u64,
    pub ingresos: Money,
    pub costos: Money,
    pub ganancia: f64,
    pub primera_venta: DateTime<Utc>,
    pub ultima_venta: DateTime<Utc>,
}

impl From<&ProductSummary> for ProductSummaryResponse {
    fn from(p: &ProductSummary) -> Self {
        Self {
            producto_id: p.product_id.get(),
            nombre: p.product_name.clone(),
            ventas: p.sales,
            items: p.quantity,
            ingresos: p.revenue,
            costos: p.cost,
            ganancia: profit(p.profit_cents),
            primera_venta: p.first_sale_at,
            ultima_venta: p.last_sale_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummaryResponse {
    pub productos: Vec<ProductSummaryResponse>,
    pub totales: TotalsResponse,
}

impl From<&SalesSummary> for SalesSummaryResponse {
    fn from(s: &SalesSummary) -> Self {
        Self {
            productos: s.products.iter().map(ProductSummaryResponse::from).collect(),
            totales: TotalsResponse::from(&s.totals),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummaryResponse {
    pub periodo: String,
    #[serde(flatten)]
    pub totales: TotalsResponse,
}

impl From<&PeriodSummary> for PeriodSummaryResponse {
    fn from(p: &PeriodSummary) -> Self {
        Self {
            periodo: p.period.clone(),
            totales: TotalsResponse::from(&p.totals),
        }
    }
}
