pub mod agents;
pub mod audit;
pub mod config;
pub mod errors;
pub mod event;
pub mod executor;
pub mod ledger;
pub mod logging;
pub mod orchestrator;
pub mod permission;
pub mod phase;
pub mod session;
pub mod stream;
pub mod ui;
pub mod verify;
pub mod workflows;
