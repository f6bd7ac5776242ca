use serde::Deserialize;

/// Registration / admin-create payload.
#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Self-service partial update. Absent fields keep their stored values.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Admin partial update: the self-service fields plus the two account flags.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}
