//! External Sass compiler shim (component D support, §4.4, §4.10, §6).
//! Unlike the teacher's in-process `grass` compiler, transforms go through an
//! external Sass binary so a resource's CSS output matches what Hugo's own
//! `css.Sass` pipeline would have invoked — the embedder is expected to have
//! a Dart Sass executable on `PATH` (or pointed to via `$TSUMO_SASS`).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ResourceError;

fn sass_binary() -> String {
    std::env::var("TSUMO_SASS").unwrap_or_else(|_| "sass".to_string())
}

/// Quotes one argument for a human-readable command line (§9): escape `"`,
/// quote only if it contains whitespace. `std::process::Command` never
/// shell-interprets arguments, so this is display-only.
fn quote_arg(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|a| quote_arg(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes `scss_bytes` to a scratch file under `scratch_dir`, invokes
/// `sass --no-source-map --style expanded --load-path <dir>...`, and returns
/// the compiled CSS bytes. `scratch_dir` is `<outputDir>/.tsumo/sass` (§5
/// "Resource discipline").
pub fn compile(
    scss_bytes: &[u8],
    stem: &str,
    load_paths: &[&Path],
    scratch_dir: &Path,
) -> Result<Vec<u8>, ResourceError> {
    std::fs::create_dir_all(scratch_dir).map_err(|e| ResourceError::Io {
        path: scratch_dir.to_path_buf(),
        source: e,
    })?;
    let in_path = scratch_dir.join(format!("tsumo-sass-{}.scss", stem));
    std::fs::write(&in_path, scss_bytes).map_err(|e| ResourceError::Io {
        path: in_path.clone(),
        source: e,
    })?;

    let binary = sass_binary();
    let mut args = vec!["--no-source-map".to_string(), "--style".to_string(), "expanded".to_string()];
    for lp in load_paths {
        args.push(format!("--load-path={}", lp.display()));
    }
    args.push(in_path.display().to_string());

    let mut cmd = Command::new(&binary);
    cmd.args(&args);

    let output = cmd.output().map_err(|e| ResourceError::Spawn {
        command: render_command_line(&binary, &args),
        source: e,
    })?;

    if !output.status.success() {
        return Err(ResourceError::Process {
            command: render_command_line(&binary, &args),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let _ = std::fs::remove_file(&in_path);
    Ok(output.stdout)
}

pub fn output_path_for(source: &str) -> PathBuf {
    Path::new(source).with_extension("css")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_wraps_whitespace_only() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg("has space"), "\"has space\"");
        assert_eq!(quote_arg("has \"quote\""), "\"has \\\"quote\\\"\"");
    }
}
