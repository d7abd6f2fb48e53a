// Administrator accounts, provisioned on first SSO login

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    /// Subject identifier assigned by the SSO provider
    pub external_subject: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}
