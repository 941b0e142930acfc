// Copyright 2026 Sagres Navigator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sagres Navigator: a session engine for the Sagres academic portal.
//!
//! The portal is an ASP.NET WebForms application. Driving it means keeping
//! cookies, echoing hidden view-state fields back on every postback, getting
//! through a login that may ask for device approval, and chaining several
//! postbacks to reach one class page. This crate does that and returns every
//! task as a single typed [`OperationResult`].
//!
//! ```no_run
//! use sagres_navigator::{Navigator, NavigatorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let navigator = Navigator::new(NavigatorConfig::from_env()?)?;
//! let login = navigator.login("student", "secret").await;
//! if login.is_success() {
//!     let grades = navigator.current_grades().await;
//!     println!("{}", grades.status());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod executor;
pub mod form;
pub mod institution;
pub mod linked;
pub mod model;
pub mod navigator;
pub mod operation;
pub mod operations;
pub mod pagination;
pub mod parsers;
pub mod session;
pub mod transport;

pub use config::NavigatorConfig;
pub use cookies::{CookiePersistor, JsonFileCookiePersistor, MemoryCookiePersistor, PersistentCookieJar};
pub use error::{SagresError, SagresResult};
pub use executor::TaskExecutor;
pub use form::FormSnapshot;
pub use institution::{Endpoint, Institution, InstitutionRegistry};
pub use navigator::Navigator;
pub use operation::{Operation, OperationResult, Status};
pub use operations::SectionFilter;
pub use session::Session;
pub use transport::{Credential, Page};
