//! WebSocket adapters for pushing live snapshots to viewers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Notification channel (pub/sub)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ match id
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Broadcaster                               │
//! │   - Re-reads the snapshot from the shared store                     │
//! │   - Hands it to the registry unchanged                              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ broadcast
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         ViewerRegistry                              │
//! │   ├── viewer-a        ├── viewer-b        ├── viewer-c              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`registry`] - Set of connected viewers and their outbound queues
//! - [`handler`] - Axum WebSocket upgrade handler and health route

pub mod handler;
pub mod registry;

pub use handler::{health_handler, viewer_router, ws_handler, ViewerState};
pub use registry::{Frame, ViewerRegistry};
