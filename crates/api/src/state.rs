use domain::{
    AccountService, Argon2Hasher, CartService, CatalogService, OrderService, PasswordHasher,
    SessionAuthenticator,
};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, H: PasswordHasher = Argon2Hasher> {
    pub accounts: AccountService<S, H>,
    pub authenticator: SessionAuthenticator<S>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store + Clone, H: PasswordHasher> AppState<S, H> {
    /// Wires every service to the same store.
    pub fn new(store: S, hasher: H) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), hasher),
            authenticator: SessionAuthenticator::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }
}
