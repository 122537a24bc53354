//! HTTP payout gateway.
//!
//! The ledger has already committed the flag guarding a payout when it calls
//! [`Transfer::transfer`], so this client makes exactly one attempt. Any
//! transport error or non-2xx status is reported back as a [`TransferError`].

use std::time::Duration;

use async_trait::async_trait;
use milestone_escrow::{Amount, Identity, Transfer, TransferError};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::Result;

#[derive(Debug, Serialize)]
struct PayoutRequest<'a> {
    to: &'a str,
    amount: Amount,
}

pub struct HttpPayoutGateway {
    client: Client,
    url: String,
}

impl HttpPayoutGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Transfer for HttpPayoutGateway {
    async fn transfer(&self, to: &Identity, amount: Amount) -> std::result::Result<(), TransferError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PayoutRequest {
                to: to.as_str(),
                amount,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(payee = %to, amount, "Payout request failed: {e}");
                TransferError::new(to, amount, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(payee = %to, amount, %status, "Payout rejected");
            return Err(TransferError::new(
                to,
                amount,
                format!("payout endpoint returned {status}"),
            ));
        }

        debug!(payee = %to, amount, "Payout accepted");
        Ok(())
    }
}
