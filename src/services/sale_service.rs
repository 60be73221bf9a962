use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::sales::{CreateSaleRequest, SaleItemInput, SaleList, SaleWithItems, UpdateSaleRequest},
    entity::{
        products::{Column as ProdCol, Entity as Products},
        sale_items::{
            ActiveModel as SaleItemActive, Column as SaleItemCol, Entity as SaleItems,
            Model as SaleItemModel,
        },
        sales::{ActiveModel as SaleActive, Column as SaleCol, Entity as Sales, Model as SaleModel},
    },
    error::{AppError, AppResult},
    models::{Sale, SaleItem},
    response::{ApiResponse, Meta},
    routes::params::{SaleListQuery, SortOrder},
    state::AppState,
};

const VALID_ORDER_STATUSES: [&str; 5] =
    ["pending", "processing", "shipped", "completed", "cancelled"];
const DEFAULT_TAX_RATE: f64 = 18.0;

pub async fn list_sales(state: &AppState, query: SaleListQuery) -> AppResult<ApiResponse<SaleList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(SaleCol::OrderStatus.eq(status.clone()));
    }
    if let Some(from) = query.from {
        condition = condition.add(SaleCol::SaleDate.gte(from));
    }
    if let Some(to) = query.to {
        condition = condition.add(SaleCol::SaleDate.lt(to));
    }

    let mut finder = Sales::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(SaleCol::SaleDate),
        SortOrder::Desc => finder.order_by_desc(SaleCol::SaleDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(sale_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Sales", SaleList { items }, Some(meta)))
}

pub async fn get_sale(state: &AppState, id: Uuid) -> AppResult<ApiResponse<SaleWithItems>> {
    let sale = Sales::find_by_id(id).one(&state.orm).await?;
    let sale = match sale {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let items = SaleItems::find()
        .filter(SaleItemCol::SaleId.eq(sale.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(sale_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Sale",
        SaleWithItems {
            sale: sale_from_entity(sale),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Create a sale and decrement stock for every line in one transaction.
/// Any failed check rolls the whole thing back, so a rejected request never
/// leaves partial stock mutations behind.
pub async fn create_sale(
    state: &AppState,
    payload: CreateSaleRequest,
) -> AppResult<ApiResponse<SaleWithItems>> {
    validate_sale_request(&payload)?;

    let txn = state.orm.begin().await?;

    let (lines, subtotal) = price_and_decrement(&txn, &payload.items).await?;

    let discount = payload.discount_amount.unwrap_or(0.0);
    let tax_rate = payload.tax_rate.unwrap_or(DEFAULT_TAX_RATE);
    let (lines, tax_amount, total_amount) = finalize_amounts(lines, subtotal, discount, tax_rate);

    let sale_id = Uuid::new_v4();
    let sale = SaleActive {
        id: Set(sale_id),
        customer_name: Set(payload.customer_name),
        customer_phone: Set(payload.customer_phone),
        customer_email: Set(payload.customer_email),
        discount_amount: Set(discount),
        tax_rate: Set(tax_rate),
        tax_amount: Set(tax_amount),
        total_amount: Set(total_amount),
        payment_method: Set(payload.payment_method.unwrap_or_else(|| "cash".into())),
        sale_date: Set(payload.sale_date.unwrap_or_else(Utc::now).into()),
        invoice_number: Set(build_invoice_number(sale_id)),
        order_status: Set(payload.order_status.unwrap_or_else(|| "pending".into())),
        payment_status: Set(payload.payment_status),
        notes: Set(payload.notes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let items = insert_lines(&txn, sale.id, lines).await?;

    txn.commit().await?;

    tracing::info!(sale_id = %sale.id, total = total_amount, "sale recorded");

    Ok(ApiResponse::success(
        "Sale recorded",
        SaleWithItems {
            sale: sale_from_entity(sale),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Replace a sale: restore the previously decremented stock, then re-price
/// every line against the current catalog and decrement again. Runs in one
/// transaction so stock never drifts from the recorded lines.
pub async fn update_sale(
    state: &AppState,
    id: Uuid,
    payload: UpdateSaleRequest,
) -> AppResult<ApiResponse<SaleWithItems>> {
    validate_sale_request(&payload)?;

    let txn = state.orm.begin().await?;

    let existing = Sales::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let old_items = SaleItems::find()
        .filter(SaleItemCol::SaleId.eq(existing.id))
        .all(&txn)
        .await?;

    // Give back the old reservations first so an unchanged line re-prices
    // against its own stock. A line whose product was deleted is skipped.
    for item in &old_items {
        if let Some(product_id) = item.product_id {
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
                .filter(ProdCol::Id.eq(product_id))
                .exec(&txn)
                .await?;
        }
    }

    SaleItems::delete_many()
        .filter(SaleItemCol::SaleId.eq(existing.id))
        .exec(&txn)
        .await?;

    let (lines, subtotal) = price_and_decrement(&txn, &payload.items).await?;

    let discount = payload.discount_amount.unwrap_or(0.0);
    let tax_rate = payload.tax_rate.unwrap_or(DEFAULT_TAX_RATE);
    let (lines, tax_amount, total_amount) = finalize_amounts(lines, subtotal, discount, tax_rate);

    let mut active: SaleActive = existing.into();
    active.customer_name = Set(payload.customer_name);
    active.customer_phone = Set(payload.customer_phone);
    active.customer_email = Set(payload.customer_email);
    active.discount_amount = Set(discount);
    active.tax_rate = Set(tax_rate);
    active.tax_amount = Set(tax_amount);
    active.total_amount = Set(total_amount);
    if let Some(payment_method) = payload.payment_method {
        active.payment_method = Set(payment_method);
    }
    if let Some(sale_date) = payload.sale_date {
        active.sale_date = Set(sale_date.into());
    }
    if let Some(order_status) = payload.order_status {
        active.order_status = Set(order_status);
    }
    if let Some(payment_status) = payload.payment_status {
        active.payment_status = Set(Some(payment_status));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(Utc::now().into());
    let sale = active.update(&txn).await?;

    let items = insert_lines(&txn, sale.id, lines).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Sale updated",
        SaleWithItems {
            sale: sale_from_entity(sale),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Removes the sale record only. Stock is deliberately not restored.
pub async fn delete_sale(state: &AppState, id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    SaleItems::delete_many()
        .filter(SaleItemCol::SaleId.eq(id))
        .exec(&txn)
        .await?;
    let result = Sales::delete_by_id(id).exec(&txn).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[derive(Debug)]
struct PricedLine {
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: f64,
    line_total: f64,
}

/// Lock each referenced product, check stock, snapshot name/price and apply
/// the decrement. Caller's transaction scope makes the whole pass atomic.
async fn price_and_decrement(
    txn: &DatabaseTransaction,
    items: &[SaleItemInput],
) -> AppResult<(Vec<PricedLine>, f64)> {
    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = 0.0;

    for item in items {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(txn)
            .await?;
        let product = match product {
            Some(p) => p,
            None => return Err(AppError::ProductNotFound(item.product_id)),
        };

        if product.stock < item.quantity {
            return Err(AppError::InsufficientStock {
                name: product.name,
                available: product.stock,
                requested: item.quantity,
            });
        }

        let unit_price = product.sale_price;
        let line_total = unit_price * item.quantity as f64;
        subtotal += line_total;
        lines.push(PricedLine {
            product_id: item.product_id,
            product_name: product.name,
            quantity: item.quantity,
            unit_price,
            line_total,
        });

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(txn)
            .await?;
    }

    Ok((lines, subtotal))
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
    lines: Vec<PricedLine>,
) -> AppResult<Vec<SaleItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = SaleItemActive {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale_id),
            product_id: Set(Some(line.product_id)),
            product_name: Set(line.product_name),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line.line_total),
        }
        .insert(txn)
        .await?;
        items.push(sale_item_from_entity(item));
    }
    Ok(items)
}

/// Tax and grand total. Corrupt price data that produces a non-finite total
/// zeroes every derived amount instead of persisting NaN.
fn finalize_amounts(
    mut lines: Vec<PricedLine>,
    subtotal: f64,
    discount: f64,
    tax_rate: f64,
) -> (Vec<PricedLine>, f64, f64) {
    let tax_amount = (subtotal - discount) * tax_rate / 100.0;
    let total_amount = subtotal - discount + tax_amount;

    if !total_amount.is_finite() {
        for line in &mut lines {
            line.unit_price = 0.0;
            line.line_total = 0.0;
        }
        return (lines, 0.0, 0.0);
    }

    (lines, tax_amount, total_amount.max(0.0))
}

fn validate_sale_request(payload: &CreateSaleRequest) -> AppResult<()> {
    let mut missing = Vec::new();
    if payload.customer_name.trim().is_empty() {
        missing.push("customer_name");
    }
    if payload.items.is_empty() {
        missing.push("items");
    }
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing.join(", ")));
    }

    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::InvalidQuantity);
    }

    if let Some(discount) = payload.discount_amount {
        if !discount.is_finite() || discount < 0.0 {
            return Err(AppError::InvalidInput("discount_amount must be >= 0".into()));
        }
    }
    if let Some(tax_rate) = payload.tax_rate {
        if !tax_rate.is_finite() || tax_rate < 0.0 {
            return Err(AppError::InvalidInput("tax_rate must be >= 0".into()));
        }
    }
    if let Some(status) = payload.order_status.as_ref() {
        if !VALID_ORDER_STATUSES.contains(&status.as_str()) {
            return Err(AppError::InvalidInput("invalid order_status".into()));
        }
    }

    Ok(())
}

fn build_invoice_number(sale_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = sale_id.to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short)
}

pub(crate) fn sale_from_entity(model: SaleModel) -> Sale {
    Sale {
        id: model.id,
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        customer_email: model.customer_email,
        discount_amount: model.discount_amount,
        tax_rate: model.tax_rate,
        tax_amount: model.tax_amount,
        total_amount: model.total_amount,
        payment_method: model.payment_method,
        sale_date: model.sale_date.with_timezone(&Utc),
        invoice_number: model.invoice_number,
        order_status: model.order_status,
        payment_status: model.payment_status,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn sale_item_from_entity(model: SaleItemModel) -> SaleItem {
    SaleItem {
        id: model.id,
        sale_id: model.sale_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        line_total: model.line_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price: f64) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            product_name: "Ring".into(),
            quantity,
            unit_price,
            line_total: unit_price * quantity as f64,
        }
    }

    #[test]
    fn totals_follow_discount_then_tax() {
        let lines = vec![line(2, 100.0), line(1, 50.0)];
        let subtotal: f64 = lines.iter().map(|l| l.line_total).sum();

        let (_, tax, total) = finalize_amounts(lines, subtotal, 50.0, 18.0);
        assert!((tax - 36.0).abs() < 1e-9);
        assert!((total - 236.0).abs() < 1e-9);
    }

    #[test]
    fn zero_tax_rate_means_no_tax() {
        let lines = vec![line(1, 100.0)];
        let (_, tax, total) = finalize_amounts(lines, 100.0, 0.0, 0.0);
        assert_eq!(tax, 0.0);
        assert_eq!(total, 100.0);
    }

    #[test]
    fn nan_input_zeroes_all_derived_amounts() {
        let lines = vec![line(1, f64::NAN)];
        let (lines, tax, total) = finalize_amounts(lines, f64::NAN, 0.0, 18.0);
        assert_eq!(tax, 0.0);
        assert_eq!(total, 0.0);
        assert_eq!(lines[0].unit_price, 0.0);
        assert_eq!(lines[0].line_total, 0.0);
    }

    #[test]
    fn oversized_discount_clamps_total_at_zero() {
        let lines = vec![line(1, 100.0)];
        let (_, _, total) = finalize_amounts(lines, 100.0, 500.0, 0.0);
        assert_eq!(total, 0.0);
    }

    fn base_request() -> CreateSaleRequest {
        CreateSaleRequest {
            customer_name: "Ayşe Yılmaz".into(),
            customer_phone: None,
            customer_email: None,
            items: vec![SaleItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
            discount_amount: None,
            tax_rate: None,
            payment_method: None,
            sale_date: None,
            order_status: None,
            payment_status: None,
            notes: None,
        }
    }

    #[test]
    fn rejects_empty_customer_and_items() {
        let mut request = base_request();
        request.customer_name = "  ".into();
        request.items.clear();
        match validate_sale_request(&request) {
            Err(AppError::MissingFields(fields)) => {
                assert!(fields.contains("customer_name"));
                assert!(fields.contains("items"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut request = base_request();
        request.items[0].quantity = 0;
        assert!(matches!(
            validate_sale_request(&request),
            Err(AppError::InvalidQuantity)
        ));
    }

    #[test]
    fn rejects_unknown_order_status() {
        let mut request = base_request();
        request.order_status = Some("delivered".into());
        assert!(matches!(
            validate_sale_request(&request),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn invoice_number_embeds_date_and_short_id() {
        let id = Uuid::new_v4();
        let invoice = build_invoice_number(id);
        assert!(invoice.starts_with("INV-"));
        assert!(invoice.ends_with(&id.to_string()[..8]));
    }
}
