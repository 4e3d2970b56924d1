use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: u64, // BIGINT UNSIGNED
    pub username: String,
    /// argon2 PHC string
    pub password: String,
    pub role_id: u8,
    pub is_active: bool,
}
