//! External collaborators
//!
//! Narrow interfaces to everything the core does not own: the base interest
//! rate feed and the user notification channel. Both are time-bounded by the
//! callers and injected as trait objects.

pub mod notify;
pub mod rate;

pub use notify::{EventKind, LogNotificationSink, NotificationSink, NotifyError};
pub use rate::{RateError, RateSource, StaticRateSource, UnavailableRateSource};
