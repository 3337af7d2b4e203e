use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use rand::{Rng, distr::Alphanumeric};
use tracing::info;

use bazaar_db::models::ConversationRow;
use bazaar_types::api::{
    ChannelRef, ConversationList, StartConversationRequest, StartConversationResponse,
};
use bazaar_types::models::{Conversation, Principal};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{parse_timestamp, parse_uuid, run_blocking};

/// Channel ids are handed to the chat provider as channel names, so they stay
/// within `[A-Za-z0-9]`. 21 characters gives ~125 bits of entropy.
const CHANNEL_ID_LEN: usize = 21;

const START_FAILED: &str = "Unable to start a conversation at the moment";
const FETCH_FAILED: &str = "Unable to fetch conversations at the moment";

pub fn new_channel_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CHANNEL_ID_LEN)
        .map(char::from)
        .collect()
}

/// POST /conversation — buyer only.
///
/// Returns the channel for (product, seller, caller), creating it on first
/// use. Safe to repeat: every call for the same triple yields the same id.
pub async fn start_conversation(
    State(state): State<AppState>,
    Extension(buyer): Extension<Principal>,
    WithRejection(Json(req), _): WithRejection<Json<StartConversationRequest>, ApiError>,
) -> ApiResult<Json<StartConversationResponse>> {
    let product_id = req.product_id.trim().to_string();
    let seller_id = req.seller_id.trim().to_string();
    let buyer_id = buyer.id.to_string();
    let candidate = new_channel_id();

    let outcome = run_blocking(&state, move |s| {
        // The triple must name a real product owned by that seller.
        if s.db.get_product_for_seller(&seller_id, &product_id)?.is_none() {
            return Ok(None);
        }
        s.db.find_or_create_conversation(&candidate, &product_id, &seller_id, &buyer_id)
            .map(Some)
    })
    .await
    .map_err(ApiError::internal(START_FAILED))?;

    let (channel_id, created) = outcome.ok_or(ApiError::NotFound("Product not found"))?;

    if created {
        info!(
            "Buyer {} opened conversation {} on product {}",
            buyer.id, channel_id, req.product_id
        );
    }

    Ok(Json(StartConversationResponse {
        convo: ChannelRef { channel_id },
    }))
}

/// GET /conversation/{product_id} — seller only.
///
/// Filtered on the caller's id from the token, never on anything the client
/// sends. No conversations is an empty list, not an error.
pub async fn list_product_conversations(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<ConversationList>> {
    let seller_id = seller.id.to_string();
    let rows = run_blocking(&state, move |s| {
        s.db.list_conversations_for_product(&seller_id, &product_id)
    })
    .await
    .map_err(ApiError::internal(FETCH_FAILED))?;

    Ok(Json(ConversationList {
        convos: rows.into_iter().map(conversation_from_row).collect(),
    }))
}

/// GET /buyer/conversations — every channel the caller has opened.
pub async fn list_buyer_conversations(
    State(state): State<AppState>,
    Extension(buyer): Extension<Principal>,
) -> ApiResult<Json<ConversationList>> {
    let buyer_id = buyer.id.to_string();
    let rows = run_blocking(&state, move |s| s.db.list_conversations_for_buyer(&buyer_id))
        .await
        .map_err(ApiError::internal(FETCH_FAILED))?;

    Ok(Json(ConversationList {
        convos: rows.into_iter().map(conversation_from_row).collect(),
    }))
}

fn conversation_from_row(row: ConversationRow) -> Conversation {
    Conversation {
        product_id: parse_uuid("product_id", &row.product_id),
        seller_id: parse_uuid("seller_id", &row.seller_id),
        buyer_id: parse_uuid("buyer_id", &row.buyer_id),
        created_at: parse_timestamp(&row.created_at),
        id: row.id,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn channel_ids_are_alphanumeric_and_fixed_length() {
        for _ in 0..100 {
            let id = new_channel_id();
            assert_eq!(id.len(), CHANNEL_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn channel_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| new_channel_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
