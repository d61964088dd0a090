//! Wire protocol of the Foxops incarnation API.
//!
//! | Operation | Method | Path | Expected status |
//! |-----------|--------|------|-----------------|
//! | Get | `GET` | `/api/incarnations/{id}` | `200` |
//! | Create | `POST` | `/api/incarnations` | `201` |
//! | Update | `PUT` | `/api/incarnations/{id}` | `200` |
//! | Delete | `DELETE` | `/api/incarnations/{id}` | `204` |
//!
//! Any other status comes with a `{"message": "..."}` body.
//!
//! - **[endpoints]** - URL construction
//! - **[wire]** - JSON documents and their mapping to [`crate::types`]

pub mod endpoints;
pub mod wire;

pub use endpoints::{Endpoints, INCARNATIONS_PATH};
