pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError, constraints};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{Cart, CartLine, Order, OrderLine, Product, User};
pub use store::{Store, StoreExt};
