use super::*;

use rolegate_domain::{Item, ItemId, ItemInput, Provenance};
use tracing::info;

impl AccessAdminService {
    /// Creates a user-provenance item.
    pub async fn create_item(&self, actor: &Actor, input: ItemInput) -> AppResult<Item> {
        self.require(actor, ApiOperation::CreateItem, None).await?;

        let item = Item::new(
            ItemId::generate(),
            input,
            Provenance::User,
            history_entry(actor, "created item"),
        )?;
        let item = self.stores.items.insert(item).await?;

        info!(item_id = %item.id(), name = item.name(), actor = actor.user_id(), "item created");
        Ok(item)
    }

    /// Replaces an item's descriptive fields.
    pub async fn update_item(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        input: ItemInput,
    ) -> AppResult<Item> {
        self.require(actor, ApiOperation::UpdateItem, Some(item_id.as_str()))
            .await?;

        let mut item = self
            .stores
            .items
            .find_by_id(item_id.as_str())
            .await?
            .ok_or_else(|| not_found("item", item_id))?;
        ensure_rename_allowed(item.lifecycle(), "item", item.name(), input.name.as_str())?;

        item.apply_update(input, history_entry(actor, "updated item"))?;
        self.stores.items.update(item).await
    }

    /// Soft-deletes an item; permissions keep referencing its id.
    pub async fn delete_item(&self, actor: &Actor, item_id: &ItemId) -> AppResult<Item> {
        self.require(actor, ApiOperation::DeleteItem, Some(item_id.as_str()))
            .await?;

        let mut item = self
            .stores
            .items
            .find_by_id(item_id.as_str())
            .await?
            .ok_or_else(|| not_found("item", item_id))?;
        ensure_not_system(item.lifecycle(), "item", item_id)?;

        item.lifecycle_mut()
            .mark_deleted(history_entry(actor, "deleted item"))?;
        let item = self.stores.items.update(item).await?;

        info!(item_id = %item_id, actor = actor.user_id(), "item deleted");
        Ok(item)
    }

    /// Returns an item, including soft-deleted ones.
    pub async fn get_item(&self, actor: &Actor, item_id: &ItemId) -> AppResult<Option<Item>> {
        self.require(actor, ApiOperation::GetItem, Some(item_id.as_str()))
            .await?;
        self.stores.items.find_by_id(item_id.as_str()).await
    }

    /// Returns one page of items matching the query.
    pub async fn search_items(
        &self,
        actor: &Actor,
        query: &DocumentQuery,
    ) -> AppResult<Page<Item>> {
        self.require(actor, ApiOperation::SearchItems, None).await?;
        search(&self.stores.items, query).await
    }
}
