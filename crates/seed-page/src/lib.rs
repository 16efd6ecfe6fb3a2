pub mod archive;
pub mod buffer;
pub mod document;
pub mod modal;
pub mod render;

pub use archive::{load_listing, ArchivePage, LoadMoreOutcome, LoadStatus, PageVariant};
pub use modal::{ModalBinding, ModalLoader, ModalOutcome};
