//! Stripe PaymentIntents adapter for [`PaymentGateway`]

use crate::{
    config::StripeConfig,
    error::{ApiError, Result},
    services::payment_gateway::{Authorization, PaymentGateway},
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

const DESCRIPTION: &str = "Add credits to your account";

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    fn intents_url(&self) -> String {
        format!(
            "{}/v1/payment_intents",
            self.config.api_base.trim_end_matches('/')
        )
    }

    async fn send_form(
        &self,
        url: String,
        form: &[(&str, String)],
        action: &str,
    ) -> Result<PaymentIntentResponse> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| ApiError::Gateway(format!("Stripe {} request failed: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<StripeErrorResponse>(&error_text)
                .ok()
                .map(|e| {
                    format!(
                        "{} ({})",
                        e.error.message.unwrap_or_default(),
                        e.error.code.unwrap_or_else(|| "no code".to_string())
                    )
                })
                .unwrap_or(error_text);
            return Err(ApiError::Gateway(format!(
                "Stripe {} failed with {}: {}",
                action, status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Gateway(format!("Failed to parse Stripe {} response: {}", action, e)))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn create_authorization(&self, amount: i64, currency: &str) -> Result<Authorization> {
        let form = [
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
            ("description", DESCRIPTION.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let intent = self.send_form(self.intents_url(), &form, "create").await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            ApiError::Gateway(format!("Payment intent {} has no client secret", intent.id))
        })?;

        info!("Created payment intent {} for {} {}", intent.id, intent.amount, intent.currency);

        Ok(Authorization {
            id: intent.id,
            client_secret,
            amount: intent.amount,
            currency: intent.currency,
        })
    }

    #[instrument(skip(self))]
    async fn update_authorization(
        &self,
        id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Authorization> {
        let form = [
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
        ];

        let url = format!("{}/{}", self.intents_url(), id);
        let intent = self.send_form(url, &form, "update").await?;

        info!(
            "Updated payment intent {} to {} {} (status: {:?})",
            intent.id, intent.amount, intent.currency, intent.status
        );

        Ok(Authorization {
            id: intent.id,
            client_secret: intent.client_secret.unwrap_or_default(),
            amount: intent.amount,
            currency: intent.currency,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_authorization(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}/cancel", self.intents_url(), id);
        let intent = self.send_form(url, &[], "cancel").await?;

        info!("Canceled payment intent {} (status: {:?})", intent.id, intent.status);
        Ok(())
    }
}
