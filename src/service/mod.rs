//! Domain services: the entry lifecycle and the link graph

mod entry;
mod link;

pub use entry::EntryService;
pub use link::LinkService;
