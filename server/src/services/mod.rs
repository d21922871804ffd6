//! Operations spanning more than one repository.

pub mod pages;

pub use pages::{PageService, PageUpdate, ResolvedAlias, slugify};
