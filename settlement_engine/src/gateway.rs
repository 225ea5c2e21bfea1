//! # Mobile-money gateway contract
//!
//! The engine does not talk to mobile-money providers itself. It only consumes the request/response contract defined
//! here. Deployments plug in a concrete [`MobileMoneyGateway`]; [`OfflineGateway`] is used when no provider is
//! configured (e.g. by the expiry worker, which never initiates payments).
use serde::{Deserialize, Serialize};
use settlement_common::Ugx;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileMoneyRequest {
    pub amount: Ugx,
    /// The mobile-money provider, e.g. `mtn` or `airtel`
    pub payment_method: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileMoneyResponse {
    pub transaction_id: Option<String>,
}

impl MobileMoneyResponse {
    pub fn new<S: Into<String>>(transaction_id: S) -> Self {
        Self { transaction_id: Some(transaction_id.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The payment request was rejected by the provider: {0}")]
    Rejected(String),
    #[error("The gateway response did not include a transaction id")]
    IncompleteResponse,
    #[error("The gateway could not be reached: {0}")]
    Unreachable(String),
    #[error("No mobile-money gateway has been configured")]
    NotConfigured,
}

#[allow(async_fn_in_trait)]
pub trait MobileMoneyGateway: Clone {
    /// Ask the provider to collect `request.amount` from the given phone number.
    ///
    /// Implementations return the raw provider response. Use [`initiate_payment`] to get the transaction id, since a
    /// response without one counts as a failure.
    async fn request_payment(&self, request: MobileMoneyRequest) -> Result<MobileMoneyResponse, GatewayError>;
}

/// Calls the gateway and extracts the transaction id from the response.
pub async fn initiate_payment<G: MobileMoneyGateway>(
    gateway: &G,
    request: MobileMoneyRequest,
) -> Result<String, GatewayError> {
    let response = gateway.request_payment(request).await?;
    match response.transaction_id {
        Some(txid) if !txid.trim().is_empty() => Ok(txid),
        _ => Err(GatewayError::IncompleteResponse),
    }
}

/// A gateway that refuses every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

impl MobileMoneyGateway for OfflineGateway {
    async fn request_payment(&self, _request: MobileMoneyRequest) -> Result<MobileMoneyResponse, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
