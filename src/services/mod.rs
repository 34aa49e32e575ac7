// Vidmarks services
// Services provide the engine: session gate, bookmark store, navigation, messaging, settings.

pub mod host_page;
pub mod lifecycle_guard;
pub mod message_bus;
pub mod message_router;
pub mod navigation_watcher;
pub mod settings_engine;
pub mod timestamp_store;
