//! Typed entities shared by every stage of the pipeline.
//!
//! - [`Program`]: a tracked grant scheme and its scoring attributes
//! - [`WindowRecord`]: a confirmed application window with its lifecycle
//! - [`ForecastWindow`]: a derived, non-authoritative prediction
//! - [`Alert`]: a deadline or opportunity notice for the consuming layer

mod alert;
mod forecast;
mod program;
mod window;

pub use alert::{Alert, AlertKey, AlertPriority, AlertType, UserProfile};
pub use forecast::{ForecastBasis, ForecastWindow};
pub use program::{Program, ProgramId};
pub use window::{WindowKey, WindowRecord, WindowStatus};
