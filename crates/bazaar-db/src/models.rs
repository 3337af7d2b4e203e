/// Database row types — these map directly to SQLite rows.
/// Distinct from bazaar-types API models to keep the DB layer independent.

/// A buyer or seller account. Which one depends on the table it was read from.
pub struct PrincipalRow {
    pub id: String,
    pub email: String,
    pub password: String,
}

/// Product joined with its owning seller's email.
pub struct ProductRow {
    pub id: String,
    pub seller_id: String,
    pub seller_email: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub created_at: String,
}

pub struct NewProduct<'a> {
    pub id: &'a str,
    pub seller_id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub price: f64,
    pub image_url: &'a str,
}

pub struct ConversationRow {
    pub id: String,
    pub product_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub created_at: String,
}
