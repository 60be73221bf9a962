use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::subscribers::{
        BulkTagRequest, CreateSubscriberRequest, SubscriberList, TagAction,
        UpdateSubscriberRequest,
    },
    entity::subscribers::{ActiveModel, Column, Entity as Subscribers, Model as SubscriberModel},
    error::{AppError, AppResult},
    models::Subscriber,
    phone::is_valid_subscriber_phone,
    response::{ApiResponse, Meta},
    routes::params::SubscriberQuery,
    state::AppState,
};

pub async fn list_subscribers(
    state: &AppState,
    query: SubscriberQuery,
) -> AppResult<ApiResponse<SubscriberList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Phone).ilike(pattern.clone()))
                .add(Expr::col(Column::AddressCity).ilike(pattern)),
        );
    }
    if let Some(active) = query.active {
        condition = condition.add(Column::Active.eq(active));
    }
    if let Some(tag) = query.tag.as_ref().filter(|t| !t.is_empty()) {
        condition = condition.add(tag_contains(tag));
    }

    let finder = Subscribers::find()
        .filter(condition)
        .order_by_desc(Column::SubscriptionDate);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(subscriber_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Subscribers",
        SubscriberList { items },
        Some(meta),
    ))
}

pub async fn get_subscriber(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Subscriber>> {
    let result = Subscribers::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(subscriber_from_entity);
    let result = match result {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Subscriber", result, None))
}

pub async fn find_by_phone(state: &AppState, phone: &str) -> AppResult<Option<Subscriber>> {
    let found = Subscribers::find()
        .filter(Column::Phone.eq(phone))
        .one(&state.orm)
        .await?
        .map(subscriber_from_entity);
    Ok(found)
}

pub async fn create_subscriber(
    state: &AppState,
    payload: CreateSubscriberRequest,
) -> AppResult<ApiResponse<Subscriber>> {
    validate_required(&payload.name, &payload.phone, &payload.address_city)?;
    if !is_valid_subscriber_phone(&payload.phone) {
        return Err(AppError::InvalidInput("phone must be 10-11 digits".into()));
    }
    if find_by_phone(state, &payload.phone).await?.is_some() {
        return Err(AppError::DuplicatePhone);
    }

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        // Stored as submitted; normalization happens only on outbound sends.
        phone: Set(payload.phone),
        name: Set(payload.name),
        address_city: Set(payload.address_city),
        email: Set(payload.email),
        company_name: Set(payload.company_name),
        address_detail: Set(payload.address_detail),
        tax_number: Set(payload.tax_number),
        tags: Set(tags_to_json(payload.tags.unwrap_or_default())),
        notes: Set(payload.notes),
        active: Set(true),
        whatsapp_enabled: Set(payload.whatsapp_enabled.unwrap_or(true)),
        subscription_date: Set(Utc::now().into()),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let subscriber = active.insert(&state.orm).await?;

    tracing::info!(subscriber_id = %subscriber.id, "subscriber created");

    Ok(ApiResponse::success(
        "Subscriber created",
        subscriber_from_entity(subscriber),
        Some(Meta::empty()),
    ))
}

pub async fn update_subscriber(
    state: &AppState,
    id: Uuid,
    payload: UpdateSubscriberRequest,
) -> AppResult<ApiResponse<Subscriber>> {
    if let Some(phone) = payload.phone.as_ref() {
        if !is_valid_subscriber_phone(phone) {
            return Err(AppError::InvalidInput("phone must be 10-11 digits".into()));
        }
        let clash = Subscribers::find()
            .filter(Condition::all().add(Column::Phone.eq(phone.clone())).add(Column::Id.ne(id)))
            .one(&state.orm)
            .await?;
        if clash.is_some() {
            return Err(AppError::DuplicatePhone);
        }
    }

    let existing = Subscribers::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(address_city) = payload.address_city {
        active.address_city = Set(address_city);
    }
    if let Some(email) = payload.email {
        active.email = Set(Some(email));
    }
    if let Some(company_name) = payload.company_name {
        active.company_name = Set(Some(company_name));
    }
    if let Some(address_detail) = payload.address_detail {
        active.address_detail = Set(Some(address_detail));
    }
    if let Some(tax_number) = payload.tax_number {
        active.tax_number = Set(Some(tax_number));
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(tags_to_json(tags));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    if let Some(whatsapp_enabled) = payload.whatsapp_enabled {
        active.whatsapp_enabled = Set(whatsapp_enabled);
    }
    active.updated_at = Set(Utc::now().into());

    let subscriber = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        subscriber_from_entity(subscriber),
        Some(Meta::empty()),
    ))
}

pub async fn delete_subscriber(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Subscribers::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Set-union or set-difference of tags applied to each listed subscriber.
pub async fn bulk_update_tags(
    state: &AppState,
    payload: BulkTagRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.ids.is_empty() || payload.tags.is_empty() {
        return Err(AppError::MissingFields("ids, tags".into()));
    }

    let mut updated = 0usize;
    for id in &payload.ids {
        let Some(subscriber) = Subscribers::find_by_id(*id).one(&state.orm).await? else {
            continue;
        };

        let current = tags_from_json(&subscriber.tags);
        let next = apply_tag_action(current, &payload.tags, payload.action);

        let mut active: ActiveModel = subscriber.into();
        active.tags = Set(tags_to_json(next));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;
        updated += 1;
    }

    Ok(ApiResponse::success(
        "Tags updated",
        serde_json::json!({ "updated": updated }),
        Some(Meta::empty()),
    ))
}

/// Segment for bulk messaging: active, WhatsApp-enabled, and matching any of
/// the given tags (no tags selects the whole enabled base).
pub async fn segment_for_dispatch(
    state: &AppState,
    tags: &[String],
) -> AppResult<Vec<Subscriber>> {
    let mut condition = Condition::all()
        .add(Column::Active.eq(true))
        .add(Column::WhatsappEnabled.eq(true));

    if !tags.is_empty() {
        let mut any_tag = Condition::any();
        for tag in tags {
            any_tag = any_tag.add(tag_contains(tag));
        }
        condition = condition.add(any_tag);
    }

    let subscribers = Subscribers::find()
        .filter(condition)
        .order_by_asc(Column::SubscriptionDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(subscriber_from_entity)
        .collect();
    Ok(subscribers)
}

// JSONB containment on the tags array.
fn tag_contains(tag: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::cust_with_values("tags @> ?", [serde_json::json!([tag])])
}

fn apply_tag_action(current: Vec<String>, tags: &[String], action: TagAction) -> Vec<String> {
    match action {
        TagAction::Add => {
            let mut next = current;
            for tag in tags {
                if !next.contains(tag) {
                    next.push(tag.clone());
                }
            }
            next
        }
        TagAction::Remove => current
            .into_iter()
            .filter(|tag| !tags.contains(tag))
            .collect(),
    }
}

fn validate_required(name: &str, phone: &str, address_city: &str) -> AppResult<()> {
    let mut missing = Vec::new();
    for (value, field) in [(name, "name"), (phone, "phone"), (address_city, "address_city")] {
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

fn tags_to_json(tags: Vec<String>) -> serde_json::Value {
    serde_json::Value::from(tags)
}

fn tags_from_json(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn subscriber_from_entity(model: SubscriberModel) -> Subscriber {
    let tags = tags_from_json(&model.tags);
    Subscriber {
        id: model.id,
        phone: model.phone,
        name: model.name,
        address_city: model.address_city,
        email: model.email,
        company_name: model.company_name,
        address_detail: model.address_detail,
        tax_number: model.tax_number,
        tags,
        notes: model.notes,
        active: model.active,
        whatsapp_enabled: model.whatsapp_enabled,
        subscription_date: model.subscription_date.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn add_is_a_set_union() {
        let next = apply_tag_action(tags(&["vip"]), &tags(&["vip", "istanbul"]), TagAction::Add);
        assert_eq!(next, tags(&["vip", "istanbul"]));
    }

    #[test]
    fn remove_is_a_set_difference() {
        let next = apply_tag_action(
            tags(&["vip", "istanbul", "wholesale"]),
            &tags(&["istanbul"]),
            TagAction::Remove,
        );
        assert_eq!(next, tags(&["vip", "wholesale"]));
    }

    #[test]
    fn tag_json_round_trip_drops_non_strings() {
        let value = serde_json::json!(["vip", 7, "retail"]);
        assert_eq!(tags_from_json(&value), tags(&["vip", "retail"]));
    }
}
