//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod gateway;
pub mod notify;
pub mod render;
pub mod storage;

pub use database::{init_database, SeaOrmRepositoryProvider, SeaOrmUserRepository};
pub use gateway::{PayGateGateway, SimulatedGateway};
pub use notify::TracingNotifier;
pub use render::TemplateRenderer;
pub use storage::InMemoryRepositoryProvider;
