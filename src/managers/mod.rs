// Vidmarks per-context controllers
// One controller per execution context: the page-embedded component, the companion panel, the background coordinator.

pub mod coordinator;
pub mod page_controller;
pub mod panel;
