use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures raised by the resource pipeline (§7: "resource-build
/// failure"). Render-local failures never reach here — they resolve to
/// `TemplateValue::Nil` instead, per spec.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn process `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process `{command}` exited with status {status}: {stderr}")]
    Process {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("{transform} expects a textual resource, got {media_type}")]
    NotText {
        transform: &'static str,
        media_type: String,
    },

    #[error("output file not produced by `{command}`: {path}")]
    MissingOutput { command: String, path: PathBuf },
}

/// One structured error per fatal render exit (§7).
#[derive(Debug, Error)]
#[error("render aborted: {message} (page={page}, template={template})")]
pub struct RenderAbort {
    pub page: String,
    pub template: String,
    pub message: String,
}

impl RenderAbort {
    pub fn new(page: impl Into<String>, template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn from_resource_error(page: impl Into<String>, template: impl Into<String>, err: ResourceError) -> Self {
        Self::new(page, template, err.to_string())
    }
}
