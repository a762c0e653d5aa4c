//! Well-known role name constants carried in the JWT `role` claim.

/// Back-office staff. May read every record and move submitted records
/// through review.
pub const ROLE_ADMIN: &str = "admin";

/// Field salesperson. Owns the records they create.
pub const ROLE_SALES: &str = "sales";

/// Whether `role` grants the admin override.
pub fn is_admin(role: &str) -> bool {
    role == ROLE_ADMIN
}
