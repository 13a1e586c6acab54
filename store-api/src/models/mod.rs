//! Persistent entities: users, stores, and the items that belong to stores.

mod item;
mod store;
mod user;

pub use item::ItemModel;
pub use store::StoreModel;
pub use user::UserModel;
