//! Inverted full-text engine (C5/C6/C7/C8/C9, spec §1/§4.5-§4.9). `posting`
//! holds the per-term document postings; `iter` is the scan-cursor layer
//! over them; `store` ties both to a term dictionary and a backing pager.

pub mod iter;
pub mod posting;
pub mod store;

pub use iter::{DummyListIterator, ListIterator, MultiListIterator, TermListIterator};
pub use posting::{LocationList, Posting, PostingList};
pub use store::InvertedFile;
