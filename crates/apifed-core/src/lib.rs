// SPDX-License-Identifier: Apache-2.0

//! apifed-core
//!
//! Boundary abstraction shared between the federation engine and its host:
//! values, variables, rows, outbound requests, the transport trait and the
//! unified error type.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FederationError, FederationResult};
pub use traits::ApiTransport;
pub use types::*;
