use crate::domain::bank::{Bank, ResolvedAccount};
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::domain::withdrawal::{TransferOrder, TransferReceipt};
use crate::error::{ExchangeError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.flutterwave.com/v3";

/// Payment aggregator adapter for the Flutterwave v3 API.
///
/// Covers the four calls the engine needs: account resolution, transfer
/// fee lookup, transfer initiation, and the Nigerian bank directory. The
/// transfer reference generated by the engine is passed through unchanged
/// and acts as the idempotency key on the aggregator side.
pub struct FlutterwaveGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL)
    }

    /// Overrides the API host, for sandbox keys and tests.
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        }
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await
            .map_err(gateway_err)?;
        Self::unwrap_envelope(response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(gateway_err)?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T> {
        let envelope: Envelope<T> = response.json().await.map_err(gateway_err)?;
        if envelope.status != "success" {
            return Err(ExchangeError::ExternalServiceFailure(format!(
                "flutterwave: {}",
                envelope.message
            )));
        }
        envelope.data.ok_or_else(|| {
            ExchangeError::ExternalServiceFailure("flutterwave: empty response data".to_string())
        })
    }
}

fn gateway_err(err: reqwest::Error) -> ExchangeError {
    ExchangeError::ExternalServiceFailure(format!("flutterwave: {err}"))
}

/// Every Flutterwave response wraps its payload in this envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Serialize)]
struct ResolvePayload<'a> {
    account_number: &'a str,
    account_bank: &'a str,
}

#[derive(Deserialize)]
struct ResolveData {
    account_number: String,
    account_name: String,
}

#[derive(Serialize)]
struct TransferPayload<'a> {
    account_bank: &'a str,
    account_number: &'a str,
    amount: Decimal,
    currency: &'a str,
    reference: &'a str,
    narration: &'a str,
}

#[derive(Deserialize)]
struct TransferData {
    reference: String,
    id: Option<u64>,
}

#[derive(Deserialize)]
struct FeeData {
    fee: Decimal,
}

#[derive(Deserialize)]
struct BankData {
    code: String,
    name: String,
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount> {
        let data: ResolveData = self
            .post(
                "/accounts/resolve",
                &ResolvePayload {
                    account_number,
                    account_bank: bank_code,
                },
            )
            .await
            .map_err(|err| match err {
                // A resolution the aggregator rejects is a bad account, not
                // an outage.
                ExchangeError::ExternalServiceFailure(message)
                    if message.contains("no account") || message.contains("invalid") =>
                {
                    ExchangeError::AccountVerificationFailed(message)
                }
                other => other,
            })?;
        Ok(ResolvedAccount {
            account_number: data.account_number,
            account_name: data.account_name,
            bank_code: bank_code.to_string(),
        })
    }

    async fn transfer_fee(&self, amount: Amount) -> Result<Decimal> {
        let fees: Vec<FeeData> = self
            .get(&format!(
                "/transfers/fee?amount={}&currency=NGN",
                amount.value()
            ))
            .await?;
        fees.first().map(|data| data.fee).ok_or_else(|| {
            ExchangeError::ExternalServiceFailure("flutterwave: no fee quoted".to_string())
        })
    }

    async fn initiate_transfer(&self, order: &TransferOrder) -> Result<TransferReceipt> {
        let data: TransferData = self
            .post(
                "/transfers",
                &TransferPayload {
                    account_bank: &order.bank_code,
                    account_number: &order.account_number,
                    amount: order.amount,
                    currency: &order.currency,
                    reference: &order.reference,
                    narration: &order.narration,
                },
            )
            .await?;
        Ok(TransferReceipt {
            reference: data.reference,
            provider_reference: data.id.map(|id| id.to_string()),
        })
    }

    async fn banks(&self) -> Result<Vec<Bank>> {
        let data: Vec<BankData> = self.get("/banks/NG").await?;
        Ok(data
            .into_iter()
            .map(|bank| Bank {
                code: bank.code,
                name: bank.name,
            })
            .collect())
    }
}
