//! Draft-composite record management
//!
//! Lets a clinician attach vital signs, prescriptions and clinical studies
//! to a consultation before the consultation exists on the backend, then
//! persists everything in the right order once it does.
//!
//! ## Architecture
//!
//! ```text
//! DraftSession ──► StagingStore<P> (one per child kind) ──► PromotionSequencer
//!       │                                                          ▲
//!       └── commit_parent() ─────────── PromotionTicket ───────────┘
//! SelectionSet<T> + CatalogProvider + DebouncedSearch (diagnoses)
//! ```
//!
//! ## Rules
//! - A staged entry is either a local draft or bound to a committed parent id
//! - Drafts are promoted only after the parent id is known, one at a time
//! - A child failure never rolls back the parent; the entry stays a draft
//! - Closing the dialog discards every staged entry

pub mod catalog;
pub mod consultation;
pub mod error;
pub mod ids;
pub mod promotion;
pub mod remote;
pub mod search;
pub mod selection;
pub mod session;
pub mod staging;

#[cfg(test)]
pub(crate) mod mock;

pub use catalog::CatalogProvider;
pub use consultation::{ConsultationDraft, ExistingConsultation};
pub use error::{DraftError, PartialPromotionError, PromotionFailure, RemoteError};
pub use ids::{LocalId, ParentRef, RemoteId, SelectionId};
pub use promotion::{
    Promotable, PromotionEvent, PromotionEventFn, PromotionReport, PromotionSequencer,
    StorePromotion,
};
pub use remote::{CatalogApi, ChildApi, ParentApi, RemoteApis};
pub use search::{DebouncedSearch, SearchOutcome, SearchSequencer, SearchTicket};
pub use selection::{DiagnosisSet, SelectionEntry, SelectionSet};
pub use session::{DraftSession, PromotionTicket};
pub use staging::{StagingEntry, StagingStore};
