//! The engine's public API: the per-tenant matching pass and document-number issuance.

pub mod numbering_api;
pub mod recon_flow_api;
pub mod recon_objects;
