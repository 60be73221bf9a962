use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::customers::{CreateCustomerRequest, CustomerList, UpdateCustomerRequest},
    entity::customers::{ActiveModel, Column, Entity as Customers, Model as CustomerModel},
    error::{AppError, AppResult},
    models::Customer,
    response::{ApiResponse, Meta},
    routes::params::CustomerQuery,
    state::AppState,
};

pub async fn list_customers(
    state: &AppState,
    query: CustomerQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Email).ilike(pattern.clone()))
                .add(Expr::col(Column::Phone).ilike(pattern)),
        );
    }

    let finder = Customers::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(customer_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Customers", CustomerList { items }, Some(meta)))
}

pub async fn get_customer(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Customer>> {
    let result = Customers::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(customer_from_entity);
    let result = match result {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Customer", result, None))
}

pub async fn create_customer(
    state: &AppState,
    payload: CreateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    validate_required(&payload.name, &payload.email, &payload.phone, &payload.address)?;
    ensure_email_unique(state, &payload.email, None).await?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        email: Set(payload.email),
        phone: Set(payload.phone),
        address: Set(payload.address),
        company_name: Set(payload.company_name),
        tax_number: Set(payload.tax_number),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let customer = active.insert(&state.orm).await?;

    tracing::info!(customer_id = %customer.id, "customer created");

    Ok(ApiResponse::success(
        "Customer created",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

pub async fn update_customer(
    state: &AppState,
    id: Uuid,
    payload: UpdateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    for (value, field) in [
        (&payload.name, "name"),
        (&payload.email, "email"),
        (&payload.phone, "phone"),
        (&payload.address, "address"),
    ] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                return Err(AppError::MissingFields(field.into()));
            }
        }
    }

    if let Some(email) = payload.email.as_ref() {
        ensure_email_unique(state, email, Some(id)).await?;
    }

    let existing = Customers::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(email) = payload.email {
        active.email = Set(email);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    if let Some(company_name) = payload.company_name {
        active.company_name = Set(Some(company_name));
    }
    if let Some(tax_number) = payload.tax_number {
        active.tax_number = Set(Some(tax_number));
    }
    active.updated_at = Set(Utc::now().into());

    let customer = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

pub async fn delete_customer(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Customers::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Indexed equality lookup; the UNIQUE constraint on `customers.email` is the
/// backstop against writers racing past this check.
async fn ensure_email_unique(
    state: &AppState,
    email: &str,
    exclude_id: Option<Uuid>,
) -> AppResult<()> {
    let mut condition = Condition::all().add(Column::Email.eq(email));
    if let Some(id) = exclude_id {
        condition = condition.add(Column::Id.ne(id));
    }

    let existing = Customers::find().filter(condition).one(&state.orm).await?;
    if existing.is_some() {
        return Err(AppError::DuplicateEmail);
    }
    Ok(())
}

fn validate_required(name: &str, email: &str, phone: &str, address: &str) -> AppResult<()> {
    let mut missing = Vec::new();
    for (value, field) in [
        (name, "name"),
        (email, "email"),
        (phone, "phone"),
        (address, "address"),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing.join(", ")))
    }
}

pub(crate) fn customer_from_entity(model: CustomerModel) -> Customer {
    Customer {
        id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        address: model.address,
        company_name: model.company_name,
        tax_number: model.tax_number,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
