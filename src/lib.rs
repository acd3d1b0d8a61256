//! Hugo-compatible static site engine core: value model, front-matter
//! parser, resource pipeline, and template language runtime (§1-§2 of the
//! design doc). The on-disk content loader, dev server, CLI, and Markdown/
//! Sass/image engines themselves are external collaborators (§1); this
//! crate owns the narrow shims that call them (§4.10).
//!
//! Logging is the `log` facade only — this library never installs a sink.
//! The embedding binary picks the backend.

pub mod config;
pub mod content;
pub mod error;
pub mod frontmatter;
pub mod i18n;
pub mod image;
pub mod markdown;
pub mod menu;
pub mod page;
pub mod path;
pub mod resource;
pub mod sass;
pub mod scratch;
pub mod site;
pub mod taxonomy;
pub mod template;
pub mod toc;
pub mod utils;
pub mod value;

pub use error::{RenderAbort, ResourceError};
pub use template::{render_nodes, BuildEnv, EvalContext, TemplateStore};
pub use value::TemplateValue;
