//! HTTP routes.
//!
//! | Method | Path            | Handler                          |
//! |--------|-----------------|----------------------------------|
//! | GET    | `/sync`         | [`sync::trigger_sync`]           |
//! | GET    | `/sync/logs`    | [`sync::list_logs`]              |
//! | POST   | `/webhooks/erp` | [`webhook::receive_event`]       |
//! | GET    | `/webhooks/erp` | [`webhook::verify_subscription`] |
//! | GET    | `/health`       | [`health::health_check`]         |

pub mod health;
pub mod sync;
pub mod webhook;
