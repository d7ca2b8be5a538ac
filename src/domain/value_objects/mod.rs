//! Value Objects for orders

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{OrderError, Result};

/// Postal address attached to an order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(custom = "not_blank")]
    pub full_name: String,
    #[validate(length(min = 7, max = 20, message = "phone must be 7 to 20 characters"))]
    pub phone: String,
    #[validate(custom = "not_blank")]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[validate(custom = "not_blank")]
    pub state: String,
    #[validate(custom = "not_blank")]
    pub postal_code: String,
    #[validate(custom = "not_blank")]
    pub country: String,
}

impl Address {
    /// Runs the required-field checks, mapping failures to `InvalidAddress`.
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()
            .map_err(|e| OrderError::InvalidAddress(e.to_string()))
    }
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Who performed an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Customer,
    Merchant,
    Admin,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Merchant => "merchant",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for ActorType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "merchant" => Ok(Self::Merchant),
            "admin" => Ok(Self::Admin),
            _ => Err(OrderError::Unauthenticated),
        }
    }
}

/// Authenticated caller of an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub kind: ActorType,
}

impl Actor {
    pub fn customer(id: Uuid) -> Self { Self { id, kind: ActorType::Customer } }
    pub fn merchant(id: Uuid) -> Self { Self { id, kind: ActorType::Merchant } }
    pub fn admin(id: Uuid) -> Self { Self { id, kind: ActorType::Admin } }
    pub fn is_admin(&self) -> bool { self.kind == ActorType::Admin }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    #[serde(rename = "phonepe")]
    PhonePe,
    CashOnDelivery,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    PartiallyRefunded,
    Refunded,
}

/// One entry of an append-only status log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
    pub timestamp: DateTime<Utc>,
    pub updated_by: Uuid,
    pub updated_by_type: ActorType,
    pub notes: Option<String>,
}

impl<S> StatusChange<S> {
    pub fn new(status: S, actor: &Actor, notes: Option<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            updated_by: actor.id,
            updated_by_type: actor.kind,
            notes,
        }
    }
}

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds `<PREFIX>-<unix millis>-<9 random uppercase alphanumerics>`.
pub fn generate_reference(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::address;

    #[test]
    fn test_valid_address() { assert!(address().ensure_valid().is_ok()); }

    #[test]
    fn test_blank_city_rejected() {
        let mut a = address();
        a.city = "   ".into();
        assert!(matches!(a.ensure_valid(), Err(OrderError::InvalidAddress(_))));
    }

    #[test]
    fn test_short_phone_rejected() {
        let mut a = address();
        a.phone = "123".into();
        assert!(matches!(a.ensure_valid(), Err(OrderError::InvalidAddress(_))));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(Decimal::new(5100, 3)), Decimal::new(510, 2));
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
    }

    #[test]
    fn test_reference_format() {
        let r = generate_reference("ORD");
        let parts: Vec<&str> = r.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_actor_type_parse() {
        assert_eq!("Merchant".parse::<ActorType>().unwrap(), ActorType::Merchant);
        assert!("guest".parse::<ActorType>().is_err());
    }
}
