//! Core types shared across pagebuf.

mod page;

pub use page::{PageNumber, PageSize};
