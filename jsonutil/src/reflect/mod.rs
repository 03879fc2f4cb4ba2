//! How records are written.
//!
//! Any type deriving [`Facet`](facet::Facet) can be encoded. Named-field
//! structs are records: their fields are projected through a
//! [`ProjectionSpec`], filtered by the visibility declared with
//! `#[facet(jsonutil::private)]`, `jsonutil::package` or
//! `jsonutil::protected`, and may be replaced by [`Getter`]s registered
//! in the [`TypeRegistry`].
//!
//! ```
//! use jsonutil::Facet;
//!
//! #[derive(Facet)]
//! struct Point {
//!     x: i32,
//!     #[facet(jsonutil::private)]
//!     y: i32,
//! }
//!
//! let cfg = jsonutil::Config::builtin();
//! let text = jsonutil::to_string_with_config(&Point { x: 1, y: 2 }, &cfg).unwrap();
//! assert_eq!(text, r#"{"x":1}"#);
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::write::JsonWrite;

mod attrs;
mod cache;
mod compat;
mod getter;
mod mapper;
mod projection;
mod registry;

pub use attrs::Visibility;
pub use cache::{ReflectionCache, ReflectionData};
pub use compat::is_compatible;
pub use getter::{Computed, Getter};
pub use mapper::{Member, MemberSource, MemberValue, project};
pub use projection::ProjectionSpec;
pub use registry::TypeRegistry;

pub(crate) use mapper::record_type;

/// Values that write their own JSON text, registered with
/// [`TypeRegistry::register_emitter`].
///
/// The output is copied to the sink unchanged, so it must be well-formed.
pub trait JsonEmit {
    /// Write this value.
    fn to_json(&self, cfg: &Config, out: &mut dyn JsonWrite) -> Result<()>;
}
