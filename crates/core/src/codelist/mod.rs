//! Codelist module - coded value identities, resolution ports and the batch resolver.

mod codelist_model;
mod codelist_service;
mod codelist_traits;

pub use codelist_model::{CodeKey, CodelistEntry, ResolvedMeanings};
pub use codelist_service::{CodelistResolver, CODELIST_DOWNSTREAM};
pub use codelist_traits::{CodelistService, CodelistSource};
