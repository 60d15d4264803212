use crate::auth::Role;

/// Stored login credential for one staff member.
#[derive(Debug, Clone)]
pub struct StaffCredential {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
    pub password_change_required: bool,
    pub active: bool,
}

/// Input for provisioning a staff account.
#[derive(Debug, Clone)]
pub struct NewStaffAccount {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
}
