use serde::{Deserialize, Serialize};

use crate::models::{Conversation, Product, Role};

// -- Token claims --

/// JWT payload. `sub` is the principal id; `role` selects the account table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: uuid::Uuid,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Products --

/// Unknown fields (including any client-supplied owner) are ignored;
/// the owner is always the authenticated seller.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnedProduct {
    pub product: Product,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub product_id: String,
    pub seller_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelRef {
    #[serde(rename = "channelId")]
    pub channel_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartConversationResponse {
    pub convo: ChannelRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationList {
    pub convos: Vec<Conversation>,
}
