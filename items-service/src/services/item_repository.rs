use chrono::Utc;

use crate::models::{CreateItemRequest, Item, UpdateItemRequest, ITEMS_COLLECTION};
use crate::supabase::{AccessToken, DataResult, Scope, SupabaseClient};

/// Item persistence over the data service. Every call runs with the
/// caller's token so row-level security applies.
#[derive(Clone)]
pub struct ItemRepository {
    client: SupabaseClient,
}

impl ItemRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Inserts a new item and returns the stored row.
    pub async fn create(
        &self,
        user_id: &str,
        request: CreateItemRequest,
        token: &AccessToken,
    ) -> DataResult<Option<Item>> {
        let payload = request.into_payload(user_id, Utc::now());
        let rows: Vec<Item> = self
            .client
            .insert_returning(ITEMS_COLLECTION, payload, Some(token))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Fails with `NotFound` when no row has this id.
    pub async fn get_by_id(&self, id: &str, token: &AccessToken) -> DataResult<Item> {
        self.client
            .from(ITEMS_COLLECTION)
            .eq("id", id)
            .single()
            .with_token(token)
            .execute()
            .await
    }

    /// Newest first.
    pub async fn list_by_user(&self, user_id: &str, token: &AccessToken) -> DataResult<Vec<Item>> {
        self.client
            .from(ITEMS_COLLECTION)
            .eq("user_id", user_id)
            .order("created_at", false)
            .with_token(token)
            .execute()
            .await
    }

    /// Applies a partial update. `None` when no row matched.
    pub async fn update(
        &self,
        id: &str,
        request: UpdateItemRequest,
        token: &AccessToken,
    ) -> DataResult<Option<Item>> {
        let rows: Vec<Item> = self
            .client
            .update_returning(
                ITEMS_COLLECTION,
                request.into_payload(Utc::now()),
                Scope::by_id(id),
                Some(token),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn delete(&self, id: &str, token: &AccessToken) -> DataResult<()> {
        self.client
            .delete(ITEMS_COLLECTION, Scope::by_id(id), Some(token))
            .await
    }
}
