// SPDX-License-Identifier: Apache-2.0

//! API Templates
//!
//! Declarative descriptions of how to call an external API for one row and
//! how to read result rows back from its response.

pub mod definition;
pub mod model;
pub mod registry;

pub use definition::{Entries, OutputDefinition, TemplateDefinition};
pub use model::{ApiTemplate, InputParam, OutputParam};
pub use registry::TemplateRegistry;
