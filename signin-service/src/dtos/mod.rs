use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sign-in request body. Only the listed fields select the trust level;
/// every field, listed or not, is forwarded as a bound variable to the
/// scope's signin statement.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SigninRequest {
    #[serde(rename = "NS")]
    #[schema(example = "acme")]
    pub ns: Option<String>,

    #[serde(rename = "DB")]
    #[schema(example = "crm")]
    pub db: Option<String>,

    #[serde(rename = "SC")]
    #[schema(example = "account")]
    pub sc: Option<String>,

    #[schema(example = "admin")]
    pub user: Option<String>,

    #[schema(example = "password123")]
    pub pass: Option<String>,
}

/// Failure body: a human-readable message plus the identifiers that were
/// recognised in the request (`du` = database user, `nu` = namespace user).
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Authentication scope does not exist")]
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub du: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nu: Option<String>,
}
