use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

use crate::error::ProxyError;
use crate::identity::require_email;
use crate::models::RedeemRequest;

pub const INVALID_AMOUNT: &str = "Valor inválido: informe um valor maior que zero";

const NOT_SUPPORTED: &str =
    "Resgate manual não suportado. O Store Credit é usado automaticamente no checkout do Shopify.";
const NOT_SUPPORTED_INFO: &str =
    "Para usar o crédito, o cliente deve fazer uma compra e selecionar Store Credit como forma de pagamento.";

#[derive(Debug, Default, Deserialize)]
pub struct RedeemBody {
    pub customer_email: Option<String>,
    /// Number or numeric string.
    pub amount: Option<Value>,
}

/// Positive, finite amount from a JSON number or string. Accepts a decimal comma.
pub fn parse_redeem_amount(raw: Option<&Value>) -> Option<Decimal> {
    let amount = match raw? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(&s.trim().replace(',', ".")).ok(),
        _ => None,
    }?;
    (amount > Decimal::ZERO).then_some(amount)
}

/// First failing check wins: identity, then amount.
pub fn validate(body: &RedeemBody) -> Result<RedeemRequest, ProxyError> {
    let email = require_email(body.customer_email.as_deref())?;
    let amount =
        parse_redeem_amount(body.amount.as_ref()).ok_or_else(|| ProxyError::validation(INVALID_AMOUNT))?;
    Ok(RedeemRequest {
        customer_email: email.to_string(),
        amount,
    })
}

/// The platform exposes no store-credit debit mutation, so a valid request
/// ends as NotSupported. Credit is spent at checkout instead.
pub fn apply(request: &RedeemRequest) -> Result<(), ProxyError> {
    info!(
        "Redeem of {} requested by {}, no debit capability upstream",
        request.amount, request.customer_email
    );
    Err(ProxyError::NotSupported {
        message: NOT_SUPPORTED.to_string(),
        info: Some(NOT_SUPPORTED_INFO.to_string()),
    })
}
