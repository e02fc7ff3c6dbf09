//! Payment records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Status of a simulated payment.
///
/// Serialized with the Portuguese labels the stored JSON uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "pago")]
    Paid,
    /// Accepted from storage, never produced by the ledger.
    #[serde(rename = "falhou")]
    Failed,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
    ];

    /// Stored label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pendente",
            PaymentStatus::Paid => "pago",
            PaymentStatus::Failed => "falhou",
        }
    }

    /// Returns true if moving from self to `next` keeps the status monotonic.
    ///
    /// Re-applying the current status is allowed so repeated confirmations
    /// are idempotent.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Pending)
                | (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Paid)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" | "pending" => Ok(PaymentStatus::Pending),
            "pago" | "paid" => Ok(PaymentStatus::Paid),
            "falhou" | "failed" => Ok(PaymentStatus::Failed),
            other => Err(Error::ValidationError(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// A simulated PIX payment.
///
/// Field names on the wire match the stored JSON:
/// `id, plano, valor, restaurante, status, dataCriacao, dataVencimento, pixCode`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(rename = "plano")]
    pub plan: String,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "restaurante")]
    pub restaurant: String,
    pub status: PaymentStatus,
    #[serde(rename = "dataCriacao", with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "dataVencimento", with = "iso8601")]
    pub due_at: DateTime<Utc>,
    #[serde(rename = "pixCode")]
    pub pix_code: String,
}

impl PaymentRecord {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Past due and still pending. Nothing acts on this; it is informational.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now > self.due_at
    }
}

/// Issues timestamp-derived ids that never repeat within one generator.
///
/// The id is the creation instant in epoch milliseconds. When the clock has
/// not moved past the last issued value, the last value plus one is used.
/// Once that would overflow, ids fall back to uuid v7 strings.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing ids so new ones sort after them.
    pub fn seeded<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let last = existing
            .into_iter()
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        IdGenerator { last }
    }

    /// Last value handed out (or seeded), 0 for a fresh generator.
    pub fn last_issued(&self) -> i64 {
        self.last
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        if millis > self.last {
            self.last = millis;
            return self.last.to_string();
        }
        match self.last.checked_add(1) {
            Some(next) => {
                self.last = next;
                next.to_string()
            }
            None => {
                warn!("⚠ Numeric payment ids exhausted at {}, issuing uuid", self.last);
                uuid::Uuid::now_v7().to_string()
            }
        }
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
