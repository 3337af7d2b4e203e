use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use bazaar_db::models::{NewProduct, ProductRow};
use bazaar_types::api::{CreateProductRequest, OwnedProduct, ProductEnvelope, ProductList};
use bazaar_types::models::{Principal, Product, SellerSummary};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{parse_timestamp, parse_uuid, run_blocking};

const MAX_NAME_LEN: usize = 200;

const PRODUCT_NOT_FOUND: &str = "Product not found";
const FETCH_FAILED: &str = "Cannot fetch products at the moment";
const FETCH_ONE_FAILED: &str = "Cannot fetch this product";
const CREATE_FAILED: &str = "Cannot add a product at the moment";
const FETCH_MINE_FAILED: &str = "Cannot fetch seller's products";

/// GET /product — public catalog, newest first.
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<ProductList>> {
    let rows = run_blocking(&state, |s| s.db.list_products())
        .await
        .map_err(ApiError::internal(FETCH_FAILED))?;

    Ok(Json(ProductList {
        products: rows.into_iter().map(product_from_row).collect(),
    }))
}

/// GET /product/{id} — public. Malformed and unknown ids are both 404.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductEnvelope>> {
    let row = run_blocking(&state, move |s| s.db.get_product(&id))
        .await
        .map_err(ApiError::internal(FETCH_ONE_FAILED))?
        .ok_or(ApiError::NotFound(PRODUCT_NOT_FOUND))?;

    Ok(Json(ProductEnvelope {
        message: "Product fetched successfully".into(),
        product: product_from_row(row),
    }))
}

/// POST /product — seller only. The owner is always the caller.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    WithRejection(Json(req), _): WithRejection<Json<CreateProductRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ProductEnvelope>)> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Product name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest("Product name must be at most 200 characters"));
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(ApiError::BadRequest("Price must be a non-negative number"));
    }

    let product_id = Uuid::new_v4().to_string();
    let seller_id = seller.id.to_string();
    let description = req.description.trim().to_string();
    let image_url = req.image.trim().to_string();
    let price = req.price;

    let row = run_blocking(&state, move |s| {
        s.db.insert_product(&NewProduct {
            id: &product_id,
            seller_id: &seller_id,
            name: &name,
            description: &description,
            price,
            image_url: &image_url,
        })?;
        s.db.get_product(&product_id)?
            .ok_or_else(|| anyhow::anyhow!("product {} vanished after insert", product_id))
    })
    .await
    .map_err(ApiError::internal(CREATE_FAILED))?;

    info!("Seller {} created product {} ({})", seller.id, row.name, row.id);

    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            message: "Product created successfully".into(),
            product: product_from_row(row),
        }),
    ))
}

/// GET /seller/my-product — the caller's own listings.
pub async fn list_my_products(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
) -> ApiResult<Json<ProductList>> {
    let seller_id = seller.id.to_string();
    let rows = run_blocking(&state, move |s| s.db.list_products_by_seller(&seller_id))
        .await
        .map_err(ApiError::internal(FETCH_MINE_FAILED))?;

    Ok(Json(ProductList {
        products: rows.into_iter().map(product_from_row).collect(),
    }))
}

/// GET /seller/my-product/{id} — another seller's product is reported as
/// missing rather than forbidden.
pub async fn get_my_product(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<OwnedProduct>> {
    let seller_id = seller.id.to_string();
    let row = run_blocking(&state, move |s| s.db.get_product_for_seller(&seller_id, &id))
        .await
        .map_err(ApiError::internal(FETCH_MINE_FAILED))?
        .ok_or(ApiError::NotFound(PRODUCT_NOT_FOUND))?;

    Ok(Json(OwnedProduct {
        product: product_from_row(row),
    }))
}

fn product_from_row(row: ProductRow) -> Product {
    Product {
        id: parse_uuid("product id", &row.id),
        seller: SellerSummary {
            id: parse_uuid("seller_id", &row.seller_id),
            email: row.seller_email,
        },
        created_at: parse_timestamp(&row.created_at),
        name: row.name,
        description: row.description,
        price: row.price,
        image_url: row.image_url,
    }
}
