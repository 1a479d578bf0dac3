//! # Keystroke-driven filter predicate builder
//!
//! `query-composer` accumulates a boolean filter predicate (fields,
//! comparison operators, values, AND/OR connectives and bracket groups) one
//! UI action at a time, suggests what may come next, and re-emits the
//! serialized query string after every change.
//!
//! ## Example
//! ```
//! use query_composer::{
//!     ComposerConfig, FieldSpec, FilterSchema, InputController, OperatorSpec, OptionItem,
//!     ValueType,
//! };
//!
//! let schema = FilterSchema::new(
//!     vec![
//!         FieldSpec::new("age", "Age", ValueType::Number),
//!         FieldSpec::new("status", "Status", ValueType::Select)
//!             .with_options(vec![OptionItem::new("active", "Active")]),
//!     ],
//!     vec![
//!         OperatorSpec::new("=", "equals", &ValueType::ALL),
//!         OperatorSpec::new(">", "greater than", &[ValueType::Number]),
//!     ],
//! );
//! let mut builder = InputController::new(schema, ComposerConfig::default());
//!
//! let _ = builder.set_input("(");
//! let _ = builder.select(0); // Age
//! let _ = builder.set_input(">"); // typed operators commit directly
//! let _ = builder.set_input("18");
//! let _ = builder.commit(); // free-form value echoes the input
//! let _ = builder.set_input(")");
//! let _ = builder.select(2); // fields first, then AND / OR
//! let _ = builder.select(1); // Status
//! let _ = builder.set_input("=");
//! let _ = builder.select(0); // Active
//!
//! assert_eq!(builder.query(), "(age > 18) AND status = active");
//! ```
mod config;
mod consts;
mod controller;
mod debounce;
mod options;
mod schema;
mod serialize;
mod session;
mod state;
mod store;
mod suggest;
mod token;

pub use config::*;
pub use consts::*;
pub use controller::*;
pub use debounce::*;
pub use lookup_cancel::{CancellationToken, LookupEpoch};
pub use options::*;
pub use schema::*;
pub use serialize::*;
pub use session::*;
pub use state::*;
pub use store::*;
pub use suggest::*;
pub use token::*;
