//! Contract DTOs
//!
//! The token hash never crosses the API boundary; a contract is
//! addressed either by its ID (staff) or by the raw token (signer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Contract;

/// What an anonymous signer sees when opening their signing link
#[derive(Debug, Serialize, ToSchema)]
pub struct ContractViewResponse {
    pub contract_number: String,
    pub renter_name: String,
    pub vehicle_plate: String,
    /// Full agreement text to be signed
    pub content: String,
    pub status: String,
    pub token_expires_at: DateTime<Utc>,
}

impl From<Contract> for ContractViewResponse {
    fn from(c: Contract) -> Self {
        Self {
            contract_number: c.contract_number,
            renter_name: c.renter_name,
            vehicle_plate: c.vehicle_plate,
            content: c.content,
            status: c.status.as_str().to_string(),
            token_expires_at: c.token_expires_at,
        }
    }
}

/// Full contract record for staff
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContractDto {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub contract_number: String,
    pub renter_name: String,
    pub vehicle_plate: String,
    pub content: String,
    /// SHA-256 of `content`, proving what was signed
    pub content_hash: String,
    pub status: String,
    pub token_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contract> for ContractDto {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id,
            booking_id: c.booking_id,
            contract_number: c.contract_number,
            renter_name: c.renter_name,
            vehicle_plate: c.vehicle_plate,
            content: c.content,
            content_hash: c.content_hash,
            status: c.status.as_str().to_string(),
            token_expires_at: c.token_expires_at,
            signed_at: c.signed_at,
            signed_ip: c.signed_ip,
            signed_user_agent: c.signed_user_agent,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
