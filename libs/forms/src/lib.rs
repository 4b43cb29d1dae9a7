//! Form handling for the mentor dashboard
//!
//! This crate holds the pure, synchronous logic that sits between raw form
//! input and the upstream REST backend: the time-slot date/time parser, the
//! declarative validation engine, the profile and password schemas built on
//! top of it, and the read-only views (certificates, invoices, dashboard
//! overview) mapped from upstream records. Nothing in here performs I/O.

pub mod certificate;
pub mod error;
pub mod invoice;
pub mod overview;
pub mod password;
pub mod profile;
pub mod record;
pub mod schema;
pub mod slot;
pub mod state;

pub use certificate::{CertificateView, certificate_views};
pub use error::{ErrorMap, FieldError, FieldErrorKind, RecordError, SchemaError, SlotError};
pub use invoice::{InvoicePage, InvoiceView, invoice_views};
pub use overview::DashboardOverview;
pub use schema::{Constraint, FieldSpec, FormValues, Schema, SchemaBuilder};
pub use slot::{SessionSelection, SessionSummary, TimeSlotInput, TimeSlotRange};
pub use state::{FeedbackPolicy, FormState};
