//! Concrete capabilities behind the `aos` engine: the JWK wallet, the
//! `.load` / `.load-blueprint` loaders and the HTTP gateway client.

pub mod gateway;
pub mod loader;
pub mod wallet;

pub use gateway::GatewayClient;
pub use loader::BlueprintLoader;
pub use loader::FileLoader;
pub use loader::export_blueprints;
pub use wallet::WalletProvider;
pub use wallet::owner_address;
