//! Portal tasks. Each one implements [`Operation`](crate::operation::Operation).

pub mod demand;
pub mod documents;
pub mod grades;
pub mod login;
pub mod messages;
pub mod pages;
pub mod pipeline;

pub use demand::{CreateDemandOperation, LoadDemandOffersOperation};
pub use documents::{DocumentOperation, DownloadedDocument};
pub use grades::GradesOperation;
pub use login::{ConnectedState, LoginMarkers, LoginOperation};
pub use messages::{MeOperation, MessagesOperation};
pub use pages::PageOperation;
pub use pipeline::{Attachments, DisciplinePipeline, ListingSource, SectionFilter};
