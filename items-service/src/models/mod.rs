pub mod item;

pub use item::{CreateItemRequest, Item, ItemResponse, UpdateItemRequest, ITEMS_COLLECTION};
