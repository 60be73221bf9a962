use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    dto::whatsapp::{BulkSendRequest, DispatchReport, TestSendRequest},
    entity::whatsapp_messages::{ActiveModel as MessageActive, Model as MessageModel},
    error::{AppError, AppResult},
    models::Subscriber,
    phone::normalize_phone,
    response::{ApiResponse, Meta},
    services::subscriber_service,
    state::AppState,
    whatsapp::{Pacer, ordered_body_params, render_template},
};

const DEFAULT_LANGUAGE: &str = "tr";

/// Bulk dispatch to the tag-filtered segment. Sends are sequential and paced
/// to the configured interval; the token cancels between sends, never mid-send.
pub async fn send_bulk(
    state: &AppState,
    payload: BulkSendRequest,
    cancel: CancellationToken,
) -> AppResult<ApiResponse<DispatchReport>> {
    if payload.template_name.trim().is_empty() || payload.body.trim().is_empty() {
        return Err(AppError::MissingFields("template_name, body".into()));
    }

    let tags = payload.tags.unwrap_or_default();
    let segment = subscriber_service::segment_for_dispatch(state, &tags).await?;
    let language = payload.language.unwrap_or_else(|| DEFAULT_LANGUAGE.into());
    let base_params = payload.parameters.unwrap_or_default();

    let mut pacer = Pacer::new(state.whatsapp_config.send_interval);
    // The closure captures only owned (`'static`) values; rustc's leak check
    // cannot prove the handler future `Send` for a lending `AsyncFnMut`
    // closure that borrows from this stack frame.
    let owned_state = state.clone();
    let template_name = payload.template_name;
    let body = payload.body;
    let report = run_dispatch(&segment, &mut pacer, &cancel, async move |subscriber: Subscriber| {
        let params = recipient_params(&base_params, &subscriber);
        dispatch_one(
            &owned_state,
            &subscriber.phone,
            &template_name,
            &language,
            &body,
            &params,
        )
        .await
        .map(|_| ())
    })
    .await;

    tracing::info!(
        success = report.success_count,
        failed = report.failed_count,
        "bulk dispatch finished"
    );

    Ok(ApiResponse::success(
        "Dispatch finished",
        report,
        Some(Meta::empty()),
    ))
}

/// Sequential paced loop over the segment, with the per-recipient send step
/// injected. Every attempted send lands in exactly one tally; a cancelled
/// token stops the loop between sends, so the counts cover only attempts.
async fn run_dispatch<F>(
    segment: &[Subscriber],
    pacer: &mut Pacer,
    cancel: &CancellationToken,
    mut send: F,
) -> DispatchReport
where
    F: AsyncFnMut(Subscriber) -> AppResult<()>,
{
    let mut report = DispatchReport {
        success_count: 0,
        failed_count: 0,
        failed_recipients: Vec::new(),
    };

    for subscriber in segment {
        if cancel.is_cancelled() {
            tracing::warn!(
                sent = report.success_count,
                failed = report.failed_count,
                remaining = segment.len() - report.success_count - report.failed_count,
                "bulk dispatch cancelled"
            );
            break;
        }
        pacer.ready().await;

        match send(subscriber.clone()).await {
            Ok(()) => report.success_count += 1,
            Err(err) => {
                tracing::warn!(recipient = %subscriber.phone, error = %err, "send failed");
                report.failed_count += 1;
                report.failed_recipients.push(subscriber.phone.clone());
            }
        }
    }

    report
}

/// Single templated send to one phone. Unlike bulk dispatch, failures
/// propagate so the caller sees the exact rejection.
pub async fn send_test(
    state: &AppState,
    payload: TestSendRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.phone.trim().is_empty() {
        return Err(AppError::MissingFields("phone".into()));
    }

    let language = payload.language.unwrap_or_else(|| DEFAULT_LANGUAGE.into());
    let params = payload.parameters.unwrap_or_default();
    let record = dispatch_one(
        state,
        &payload.phone,
        &payload.template_name,
        &language,
        &payload.body,
        &params,
    )
    .await?;

    Ok(ApiResponse::success(
        "Message sent",
        serde_json::json!({
            "message_id": record.id,
            "provider_message_id": record.provider_message_id,
        }),
        Some(Meta::empty()),
    ))
}

/// Render, record as pending, send, then mark sent/failed. The render step
/// runs before anything is persisted so an incomplete parameter map rejects
/// the message without a send record in `pending` limbo.
async fn dispatch_one(
    state: &AppState,
    raw_phone: &str,
    template_name: &str,
    language: &str,
    body: &str,
    params: &HashMap<String, String>,
) -> AppResult<MessageModel> {
    let content = render_template(body, params)?;
    let body_params = ordered_body_params(body, params)?;
    let recipient = normalize_phone(raw_phone, &state.whatsapp_config.country_code);

    let record = MessageActive {
        id: Set(Uuid::new_v4()),
        template_name: Set(template_name.to_string()),
        recipient: Set(recipient.clone()),
        parameters: Set(serde_json::to_value(params).unwrap_or_default()),
        content: Set(content),
        status: Set("pending".into()),
        error: Set(None),
        provider_message_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let outcome = state
        .whatsapp
        .send_template(&recipient, template_name, language, &body_params)
        .await;

    let mut active: MessageActive = record.into();
    active.updated_at = Set(Utc::now().into());
    match outcome {
        Ok(provider_id) => {
            active.status = Set("sent".into());
            active.provider_message_id = Set(Some(provider_id));
            Ok(active.update(&state.orm).await?)
        }
        Err(err) => {
            active.status = Set("failed".into());
            active.error = Set(Some(err.to_string()));
            active.update(&state.orm).await?;
            Err(err)
        }
    }
}

/// Campaign-level parameters with per-recipient fields layered on top.
fn recipient_params(
    base: &HashMap<String, String>,
    subscriber: &Subscriber,
) -> HashMap<String, String> {
    let mut params = base.clone();
    params.insert("name".into(), subscriber.name.clone());
    params.insert("city".into(), subscriber.address_city.clone());
    if let Some(company) = subscriber.company_name.as_ref() {
        params.insert("company".into(), company.clone());
    }
    params
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chrono::Utc;

    fn subscriber(phone: &str) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            phone: phone.into(),
            name: "Ayşe".into(),
            address_city: "İzmir".into(),
            email: None,
            company_name: Some("Atölye".into()),
            address_detail: None,
            tax_number: None,
            tags: vec!["vip".into()],
            notes: None,
            active: true,
            whatsapp_enabled: true,
            subscription_date: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn recipient_fields_override_campaign_params() {
        let mut base = HashMap::new();
        base.insert("name".into(), "generic".into());
        base.insert("offer".into(), "%20".into());

        let params = recipient_params(&base, &subscriber("05551234567"));
        assert_eq!(params.get("name").map(String::as_str), Some("Ayşe"));
        assert_eq!(params.get("city").map(String::as_str), Some("İzmir"));
        assert_eq!(params.get("company").map(String::as_str), Some("Atölye"));
        assert_eq!(params.get("offer").map(String::as_str), Some("%20"));
    }

    #[tokio::test]
    async fn every_recipient_lands_in_exactly_one_tally() {
        let segment = vec![
            subscriber("05551110001"),
            subscriber("05551110002"),
            subscriber("05551110003"),
        ];
        let mut pacer = Pacer::new(Duration::from_millis(1));
        let cancel = CancellationToken::new();

        let report = run_dispatch(&segment, &mut pacer, &cancel, async |s| {
            if s.phone.ends_with('2') {
                Err(AppError::Provider("rejected".into()))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.success_count + report.failed_count, segment.len());
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failed_recipients, vec!["05551110002".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_send() {
        let segment = vec![subscriber("05551110001"), subscriber("05551110002")];
        let mut pacer = Pacer::new(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut calls = 0usize;
        let report = run_dispatch(&segment, &mut pacer, &cancel, async |_s| {
            calls += 1;
            Ok(())
        })
        .await;

        assert_eq!(calls, 0);
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failed_count, 0);
        assert!(report.failed_recipients.is_empty());
    }

    #[tokio::test]
    async fn cancellation_between_sends_counts_only_attempts() {
        let segment = vec![
            subscriber("05551110001"),
            subscriber("05551110002"),
            subscriber("05551110003"),
        ];
        let mut pacer = Pacer::new(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let report = run_dispatch(&segment, &mut pacer, &cancel, async |_s| {
            trigger.cancel();
            Ok(())
        })
        .await;

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 0);
    }
}
