//! Layout-driven order sheets.
//!
//! An [`Overprinter`] loads a layout description for a template id, draws an
//! order's header and line items as text at the configured positions, and
//! stacks the resulting pages onto a preprinted template PDF.
//!
//! ```no_run
//! use overprint::{EngineConfig, OrderDocument, Overprinter};
//!
//! let engine = Overprinter::new(EngineConfig::from_env());
//! let order = OrderDocument::from_json(r#"{"header": {}, "items": []}"#)?;
//! let pdf = engine.build(&order.header, &order.items, "default")?;
//! # Ok::<(), overprint::OverprintError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod format;
pub mod layout;
pub mod merge;
pub mod order;
pub mod overlay;

pub use config::{EngineConfig, PageSize};
pub use engine::{DEFAULT_TEMPLATE_ID, Overprinter};
pub use error::OverprintError;
pub use layout::{FieldSpec, LayoutConfig};
pub use order::{DateValue, FieldValue, OrderDocument, OrderHeader, OrderItem};
pub use overlay::{OverlayPage, TextRun};
