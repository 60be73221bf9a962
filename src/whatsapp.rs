use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::WhatsAppConfig,
    error::{AppError, AppResult},
};

/// Thin client for the WhatsApp Cloud API `/{phone_number_id}/messages`
/// endpoint. Only pre-approved template sends are supported.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: Client,
    api_base_url: String,
    access_token: String,
    phone_number_id: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Option<Vec<ProviderMessage>>,
}

#[derive(Debug, Deserialize)]
struct ProviderMessage {
    id: String,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            http: Client::new(),
            api_base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }

    /// Send one template message. `body_params` must already be in the
    /// template's placeholder order. Returns the provider message id.
    pub async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language: &str,
        body_params: &[String],
    ) -> AppResult<String> {
        let url = format!("{}/{}/messages", self.api_base_url, self.phone_number_id);

        let mut template = json!({
            "name": template_name,
            "language": { "code": language },
        });
        if !body_params.is_empty() {
            let parameters: Vec<_> = body_params
                .iter()
                .map(|text| json!({ "type": "text", "text": text }))
                .collect();
            template["components"] = json!([{ "type": "body", "parameters": parameters }]);
        }

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "template",
            "template": template,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Keep the provider body for diagnostics.
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("{status}: {body}")));
        }

        let body: SendResponse = response.json().await?;
        Ok(body
            .messages
            .and_then(|mut m| m.pop())
            .map(|m| m.id)
            .unwrap_or_default())
    }
}

/// Fill `{{key}}` placeholders from the parameter map. A message with any
/// placeholder left unresolved is rejected rather than sent half-rendered.
pub fn render_template(content: &str, params: &HashMap<String, String>) -> AppResult<String> {
    let mut rendered = content.to_string();
    for (key, value) in params {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }

    let unresolved = placeholder_keys(&rendered);
    if !unresolved.is_empty() {
        return Err(AppError::IncompleteParameters(unresolved));
    }
    Ok(rendered)
}

/// Placeholder keys in order of first appearance. Also used to build the
/// positional parameter list the provider expects.
pub fn placeholder_keys(content: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let key = after[..end].trim().to_string();
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
        rest = &after[end + 2..];
    }
    keys
}

/// Values for the provider's positional body parameters, in template order.
pub fn ordered_body_params(
    content: &str,
    params: &HashMap<String, String>,
) -> AppResult<Vec<String>> {
    let keys = placeholder_keys(content);
    let mut missing = Vec::new();
    let mut values = Vec::new();
    for key in keys {
        match params.get(&key) {
            Some(value) => values.push(value.clone()),
            None => missing.push(key),
        }
    }
    if !missing.is_empty() {
        return Err(AppError::IncompleteParameters(missing));
    }
    Ok(values)
}

/// Fixed-rate pacer for bulk dispatch. One tick per configured interval keeps
/// outbound volume under the provider limit; the first tick fires immediately.
pub struct Pacer {
    interval: tokio::time::Interval,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        // tokio::time::interval panics on a zero period.
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn ready(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_all_placeholders() {
        let rendered = render_template(
            "Merhaba {{name}}, {{city}} mağazamız açıldı.",
            &params(&[("name", "Ayşe"), ("city", "İzmir")]),
        )
        .unwrap();
        assert_eq!(rendered, "Merhaba Ayşe, İzmir mağazamız açıldı.");
    }

    #[test]
    fn rejects_unresolved_placeholders() {
        let err = render_template("Merhaba {{name}} {{code}}", &params(&[("name", "Ayşe")]))
            .unwrap_err();
        match err {
            AppError::IncompleteParameters(keys) => assert_eq!(keys, vec!["code".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn placeholder_keys_preserve_order_and_dedupe() {
        let keys = placeholder_keys("{{b}} then {{a}} then {{b}} again");
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn ordered_params_follow_template_order() {
        let values = ordered_body_params(
            "{{second}} {{first}}",
            &params(&[("first", "1"), ("second", "2")]),
        )
        .unwrap();
        assert_eq!(values, vec!["2".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn zero_period_pacer_still_ticks() {
        let mut pacer = Pacer::new(Duration::ZERO);
        pacer.ready().await;
        pacer.ready().await;
    }

    #[test]
    fn ordered_params_report_every_missing_key() {
        let err = ordered_body_params("{{a}} {{b}}", &params(&[])).unwrap_err();
        match err {
            AppError::IncompleteParameters(keys) => {
                assert_eq!(keys, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
