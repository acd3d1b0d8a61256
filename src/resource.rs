//! Resource manager (component D, §4.4). Content-addressed asset cache over
//! the site and theme assets directories, grounded on the teacher's
//! `walkdir`-based asset discovery (`resource.rs`, `sass.rs`) generalized
//! from nostr-event resources to file-backed, glob-resolvable, transformable
//! ones.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use walkdir::WalkDir;

use crate::error::ResourceError;
use crate::image::ImageScaler;
use crate::value::{MediaTypeInfo, TemplateValue};

pub type ResourceHandle = Rc<Resource>;
pub type ResourceManagerHandle = Rc<ResourceManager>;

/// Resource, per §3. Immutable once built; transforms return a fresh
/// `Resource` under a fresh cache key (invariant 6).
#[derive(Clone)]
pub struct Resource {
    pub id: String,
    pub source_path: Option<PathBuf>,
    pub publishable: bool,
    pub output_rel_path: Option<String>,
    pub bytes: Vec<u8>,
    pub text: Option<String>,
    pub integrity: Option<String>,
    pub media_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    manager: Weak<ResourceManager>,
}

/// ResourceManager state, per §3: two pre-enumerated file lists, an id→
/// Resource memo, an output directory, and a publish latch so
/// `ensurePublished` is idempotent.
pub struct ResourceManager {
    site_assets_dir: PathBuf,
    theme_assets_dir: Option<PathBuf>,
    output_dir: PathBuf,
    site_files: Vec<String>,
    theme_files: Vec<String>,
    memo: RefCell<IndexMap<String, ResourceHandle>>,
    published: RefCell<HashSet<String>>,
}

fn enumerate_files(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect()
}

fn is_textual_ext(ext: &str) -> bool {
    matches!(ext, "js" | "json" | "css" | "scss" | "sass" | "svg" | "html" | "txt")
}

fn classify_kind(ext: &str) -> &'static str {
    match ext {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "ico" | "svg" => "image",
        "js" | "json" | "css" | "scss" | "sass" | "html" | "txt" | "xml" | "md" => "text",
        _ => "application",
    }
}

fn ext_of(rel: &str) -> String {
    Path::new(rel)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .filter_map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
        .collect()
}

fn decode_png(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || &bytes[0..8] != b"\x89PNG\r\n\x1a\n" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

fn decode_gif(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 10 || !(&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return None;
    }
    let width = u16::from_le_bytes(bytes[6..8].try_into().ok()?) as u32;
    let height = u16::from_le_bytes(bytes[8..10].try_into().ok()?) as u32;
    Some((width, height))
}

/// Walks JPEG markers looking for an SOF0/SOF1/SOF2/SOF3 segment, whose
/// payload stores height before width (§4.4).
fn decode_jpeg(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2usize;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = bytes[i + 1];
        if marker == 0xD8 || marker == 0xD9 {
            i += 2;
            continue;
        }
        if (0xD0..=0xD7).contains(&marker) {
            i += 2;
            continue;
        }
        if i + 4 > bytes.len() {
            break;
        }
        let seg_len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        if matches!(marker, 0xC0 | 0xC1 | 0xC2 | 0xC3) {
            if i + 9 > bytes.len() {
                return None;
            }
            let height = u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]) as u32;
            return Some((width, height));
        }
        i += 2 + seg_len;
    }
    None
}

fn decode_webp(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 30 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return None;
    }
    match &bytes[12..16] {
        b"VP8 " => {
            let width = u16::from_le_bytes([bytes[26], bytes[27]]) & 0x3FFF;
            let height = u16::from_le_bytes([bytes[28], bytes[29]]) & 0x3FFF;
            Some((width as u32, height as u32))
        }
        b"VP8L" => {
            if bytes.len() < 25 || bytes[20] != 0x2F {
                return None;
            }
            let bits = u32::from_le_bytes([bytes[21], bytes[22], bytes[23], bytes[24]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            Some((width, height))
        }
        _ => None,
    }
}

/// Returns Nil-equivalent `None` on signature mismatch or truncation (§4.4);
/// callers tolerate `None` and leave dimensions unset.
fn decode_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    decode_png(bytes)
        .or_else(|| decode_gif(bytes))
        .or_else(|| decode_jpeg(bytes))
        .or_else(|| decode_webp(bytes))
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_dimensions(orig: (Option<u32>, Option<u32>), want: (Option<u32>, Option<u32>)) -> (u32, u32) {
    match want {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let ratio = match orig {
                (Some(ow), Some(oh)) if ow > 0 => oh as f64 / ow as f64,
                _ => 1.0,
            };
            (w, (w as f64 * ratio).round() as u32)
        }
        (None, Some(h)) => {
            let ratio = match orig {
                (Some(ow), Some(oh)) if oh > 0 => ow as f64 / oh as f64,
                _ => 1.0,
            };
            ((h as f64 * ratio).round() as u32, h)
        }
        (None, None) => (orig.0.unwrap_or(0), orig.1.unwrap_or(0)),
    }
}

/// Parses Hugo's `"WxH [format] …"` resize spec (§4.4); either dimension may
/// be absent, meaning "derive proportionally".
fn parse_resize_spec(spec: &str) -> (Option<u32>, Option<u32>, Option<String>) {
    let mut parts = spec.split_whitespace();
    let dims = parts.next().unwrap_or("");
    let format = parts.next().map(|s| s.to_string());
    let mut dim_parts = dims.splitn(2, 'x');
    let w = dim_parts.next().and_then(|s| s.parse().ok());
    let h = dim_parts.next().and_then(|s| s.parse().ok());
    (w, h, format)
}

fn parse_media_type(mt: &str) -> MediaTypeInfo {
    let mut parts = mt.splitn(2, '/');
    let main_type = parts.next().unwrap_or("").to_string();
    let rest = parts.next().unwrap_or("");
    let (sub_type, suffix) = match rest.rsplit_once('+') {
        Some((s, suf)) => (s.to_string(), suf.to_string()),
        None => (rest.to_string(), String::new()),
    };
    MediaTypeInfo {
        main_type,
        sub_type,
        suffix,
    }
}

fn publish(r: &ResourceHandle) {
    if let Some(mgr) = r.manager.upgrade() {
        if let Err(e) = mgr.ensure_published(r) {
            log::error!("failed to publish resource {}: {}", r.id, e);
        }
    }
}

impl ResourceManager {
    pub fn new(
        site_assets_dir: impl Into<PathBuf>,
        theme_assets_dir: Option<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> ResourceManagerHandle {
        let site_assets_dir = site_assets_dir.into();
        let site_files = enumerate_files(&site_assets_dir);
        let theme_files = theme_assets_dir
            .as_ref()
            .map(|d| enumerate_files(d))
            .unwrap_or_default();
        Rc::new(Self {
            site_assets_dir,
            theme_assets_dir,
            output_dir: output_dir.into(),
            site_files,
            theme_files,
            memo: RefCell::new(IndexMap::new()),
            published: RefCell::new(HashSet::new()),
        })
    }

    fn build_resource(
        self: &Rc<Self>,
        id: String,
        source_path: Option<PathBuf>,
        rel_for_ext: &str,
        bytes: Vec<u8>,
        publishable: bool,
        output_rel_path: Option<String>,
    ) -> ResourceHandle {
        let ext = ext_of(rel_for_ext);
        let media_type = mime_guess::from_path(rel_for_ext).first_or_octet_stream().to_string();
        let text = if is_textual_ext(&ext) {
            String::from_utf8(bytes.clone()).ok()
        } else {
            None
        };
        let (width, height) = decode_dimensions(&bytes).map_or((None, None), |(w, h)| (Some(w), Some(h)));
        Rc::new(Resource {
            id,
            source_path,
            publishable,
            output_rel_path,
            bytes,
            text,
            integrity: None,
            media_type,
            width,
            height,
            manager: Rc::downgrade(self),
        })
    }

    /// `get(rel)`: site assets first, then theme assets (§4.4).
    pub fn get(self: &Rc<Self>, rel: &str) -> Option<ResourceHandle> {
        let rel_norm = crate::path::normalize_rel_path(&crate::path::trim_slashes(rel));
        let cache_key = format!("get:{}", rel_norm);
        if let Some(cached) = self.memo.borrow().get(&cache_key) {
            return Some(cached.clone());
        }
        let abs_path = if self.site_files.iter().any(|f| f == &rel_norm) {
            self.site_assets_dir.join(&rel_norm)
        } else if self.theme_files.iter().any(|f| f == &rel_norm) {
            self.theme_assets_dir.as_ref()?.join(&rel_norm)
        } else {
            return None;
        };
        let bytes = std::fs::read(&abs_path).ok()?;
        let resource = self.build_resource(
            cache_key.clone(),
            Some(abs_path),
            &rel_norm,
            bytes,
            true,
            Some(rel_norm.clone()),
        );
        self.memo.borrow_mut().insert(cache_key, resource.clone());
        Some(resource)
    }

    pub fn get_match(self: &Rc<Self>, glob: &str) -> Option<ResourceHandle> {
        self.match_resources(glob).into_iter().next()
    }

    /// `match(glob)`: union of site+theme matches, site-priority dedup by
    /// normalized relative path (§4.4).
    pub fn match_resources(self: &Rc<Self>, glob: &str) -> Vec<ResourceHandle> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for f in self.site_files.iter().chain(self.theme_files.iter()) {
            if crate::path::glob_match(glob, f) && seen.insert(f.clone()) {
                if let Some(r) = self.get(f) {
                    out.push(r);
                }
            }
        }
        out
    }

    pub fn by_type(self: &Rc<Self>, kind: &str) -> Vec<ResourceHandle> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for f in self.site_files.iter().chain(self.theme_files.iter()) {
            if classify_kind(&ext_of(f)) == kind && seen.insert(f.clone()) {
                if let Some(r) = self.get(f) {
                    out.push(r);
                }
            }
        }
        out
    }

    pub fn concat(self: &Rc<Self>, target: &str, rs: &[ResourceHandle]) -> ResourceHandle {
        let id = format!(
            "concat:{}|{}",
            target,
            rs.iter().map(|r| r.id.clone()).collect::<Vec<_>>().join("|")
        );
        if let Some(c) = self.memo.borrow().get(&id) {
            return c.clone();
        }
        let joined = rs.iter().filter_map(|r| r.text.clone()).collect::<Vec<_>>().join("\n");
        let bytes = joined.clone().into_bytes();
        let resource = Rc::new(Resource {
            id: id.clone(),
            source_path: None,
            publishable: true,
            output_rel_path: Some(target.to_string()),
            bytes,
            text: Some(joined),
            integrity: None,
            media_type: mime_guess::from_path(target).first_or_octet_stream().to_string(),
            width: None,
            height: None,
            manager: Rc::downgrade(self),
        });
        self.memo.borrow_mut().insert(id, resource.clone());
        resource
    }

    /// `fromString`: virtual, non-publishable, cache-insensitive — no memo
    /// entry is written (§4.4).
    pub fn from_string(self: &Rc<Self>, name: &str, s: &str) -> ResourceHandle {
        Rc::new(Resource {
            id: format!("string:{}", name),
            source_path: None,
            publishable: false,
            output_rel_path: None,
            bytes: s.as_bytes().to_vec(),
            text: Some(s.to_string()),
            integrity: None,
            media_type: mime_guess::from_path(name).first_or_octet_stream().to_string(),
            width: None,
            height: None,
            manager: Rc::downgrade(self),
        })
    }

    pub fn minify(self: &Rc<Self>, r: &ResourceHandle) -> ResourceHandle {
        let id = format!("{}|minify", r.id);
        if let Some(c) = self.memo.borrow().get(&id) {
            return c.clone();
        }
        let resource = match &r.text {
            None => r.clone(),
            Some(t) => {
                let minified = t
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| l.trim())
                    .collect::<Vec<_>>()
                    .join("\n");
                let bytes = minified.clone().into_bytes();
                Rc::new(Resource {
                    id: id.clone(),
                    bytes,
                    text: Some(minified),
                    ..(*r).clone()
                })
            }
        };
        self.memo.borrow_mut().insert(id, resource.clone());
        resource
    }

    /// `fingerprint`: SHA-256 of bytes; `Data.integrity = "sha256-<base64>"`;
    /// `outputRelPath` becomes `<dir>/<base>.<first-16-hex>[.<ext>]` (§4.4).
    pub fn fingerprint(self: &Rc<Self>, r: &ResourceHandle) -> ResourceHandle {
        let id = format!("{}|fingerprint", r.id);
        if let Some(c) = self.memo.borrow().get(&id) {
            return c.clone();
        }
        let hex = sha256::digest(r.bytes.as_slice());
        let integrity = format!("sha256-{}", STANDARD.encode(hex_to_bytes(&hex)));
        let short = &hex[..hex.len().min(16)];

        let base_path = r.output_rel_path.clone().unwrap_or_else(|| r.id.clone());
        let path = Path::new(&base_path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().to_string());
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("resource");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let filename = if ext.is_empty() {
            format!("{}.{}", stem, short)
        } else {
            format!("{}.{}.{}", stem, short, ext)
        };
        let new_rel = match dir {
            Some(d) => format!("{}/{}", d, filename),
            None => filename,
        };

        let resource = Rc::new(Resource {
            id: id.clone(),
            output_rel_path: Some(new_rel),
            integrity: Some(integrity),
            ..(*r).clone()
        });
        self.memo.borrow_mut().insert(id, resource.clone());
        resource
    }

    pub fn copy(self: &Rc<Self>, target: &str, r: &ResourceHandle) -> ResourceHandle {
        let id = format!("{}|copy:{}", r.id, target);
        if let Some(c) = self.memo.borrow().get(&id) {
            return c.clone();
        }
        let resource = Rc::new(Resource {
            id: id.clone(),
            output_rel_path: Some(target.to_string()),
            ..(*r).clone()
        });
        self.memo.borrow_mut().insert(id, resource.clone());
        resource
    }

    pub fn post_process(&self, r: &ResourceHandle) -> ResourceHandle {
        r.clone()
    }

    pub fn sass_compile(self: &Rc<Self>, r: &ResourceHandle) -> Result<ResourceHandle, ResourceError> {
        let id = format!("{}|sass", r.id);
        if let Some(c) = self.memo.borrow().get(&id) {
            return Ok(c.clone());
        }
        let mut load_paths = vec![self.site_assets_dir.as_path()];
        if let Some(theme) = &self.theme_assets_dir {
            load_paths.push(theme.as_path());
        }
        let scratch_dir = self.output_dir.join(".tsumo/sass");
        let css_bytes = crate::sass::compile(&r.bytes, &sanitize_id(&r.id), &load_paths, &scratch_dir)?;
        let css = String::from_utf8_lossy(&css_bytes).to_string();
        let out_rel = r
            .output_rel_path
            .as_deref()
            .map(|p| crate::sass::output_path_for(p).to_string_lossy().to_string())
            .unwrap_or_else(|| "style.css".to_string());
        let resource = Rc::new(Resource {
            id: id.clone(),
            source_path: r.source_path.clone(),
            publishable: true,
            output_rel_path: Some(out_rel),
            bytes: css_bytes,
            text: Some(css),
            integrity: None,
            media_type: "text/css".to_string(),
            width: None,
            height: None,
            manager: Rc::downgrade(self),
        });
        self.memo.borrow_mut().insert(id, resource.clone());
        Ok(resource)
    }

    /// `resize(r, spec)`: invokes an external scaler (`convert`, ImageMagick
    /// style) and re-reads dimensions from its output (§4.4).
    pub fn resize(self: &Rc<Self>, r: &ResourceHandle, spec: &str) -> Result<ResourceHandle, ResourceError> {
        let id = format!("{}|resize:{}", r.id, spec);
        if let Some(c) = self.memo.borrow().get(&id) {
            return Ok(c.clone());
        }
        let (w, h, fmt) = parse_resize_spec(spec);
        let (tw, th) = resolve_dimensions((r.width, r.height), (w, h));
        let ext = fmt.unwrap_or_else(|| {
            Path::new(r.output_rel_path.as_deref().unwrap_or(&r.id))
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png")
                .to_string()
        });

        let dir = self.output_dir.join(".tsumo/resize");
        std::fs::create_dir_all(&dir).map_err(|e| ResourceError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let stem = sanitize_id(&id);
        let in_path = dir.join(format!("tsumo-resize-in-{}", sanitize_id(&r.id)));
        std::fs::write(&in_path, &r.bytes).map_err(|e| ResourceError::Io {
            path: in_path.clone(),
            source: e,
        })?;
        let out_path = dir.join(format!("tsumo-resize-out-{}.{}", stem, ext));

        crate::image::ExternalScaler.resize(
            &in_path,
            &out_path,
            &crate::image::ResizeSpec { width: tw, height: th },
        )?;
        let bytes = std::fs::read(&out_path).map_err(|_| ResourceError::MissingOutput {
            command: "convert".to_string(),
            path: out_path.clone(),
        })?;
        let _ = std::fs::remove_file(&in_path);
        let _ = std::fs::remove_file(&out_path);

        let (width, height) = decode_dimensions(&bytes).unwrap_or((tw, th));
        let out_rel = r
            .output_rel_path
            .as_deref()
            .map(|p| {
                let base = Path::new(p).file_stem().and_then(|s| s.to_str()).unwrap_or("resized");
                let dir = Path::new(p).parent().map(|d| d.to_string_lossy().to_string());
                let name = format!("{}_{}x{}.{}", base, width, height, ext);
                match dir {
                    Some(d) if !d.is_empty() => format!("{}/{}", d, name),
                    _ => name,
                }
            })
            .unwrap_or_else(|| format!("resized_{}x{}.{}", width, height, ext));

        let resource = Rc::new(Resource {
            id: id.clone(),
            source_path: r.source_path.clone(),
            publishable: true,
            output_rel_path: Some(out_rel),
            bytes,
            text: None,
            integrity: None,
            media_type: mime_guess::from_path(format!("x.{}", ext)).first_or_octet_stream().to_string(),
            width: Some(width),
            height: Some(height),
            manager: Rc::downgrade(self),
        });
        self.memo.borrow_mut().insert(id, resource.clone());
        Ok(resource)
    }

    /// Idempotent: writes `bytes` to `outputDir/<outputRelPath>` once per
    /// `outputRelPath` (§4.4).
    pub fn ensure_published(&self, r: &ResourceHandle) -> Result<(), ResourceError> {
        if !r.publishable {
            return Ok(());
        }
        let Some(out_rel) = &r.output_rel_path else {
            return Ok(());
        };
        if self.published.borrow().contains(out_rel) {
            return Ok(());
        }
        let out_path = self.output_dir.join(crate::path::trim_slashes(out_rel));
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResourceError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&out_path, &r.bytes).map_err(|e| ResourceError::Io {
            path: out_path.clone(),
            source: e,
        })?;
        self.published.borrow_mut().insert(out_rel.clone());
        Ok(())
    }
}

/// Field-access table for `Resource` (§4.1, §4.4).
pub fn field(r: &ResourceHandle, name: &str) -> TemplateValue {
    match name {
        "relpermalink" | "permalink" => match &r.output_rel_path {
            Some(p) => {
                publish(r);
                TemplateValue::String(crate::path::normalize_rel_permalink(p))
            }
            None => TemplateValue::Nil,
        },
        "mediatype" => TemplateValue::MediaType(Rc::new(parse_media_type(&r.media_type))),
        "content" => r.text.clone().map(TemplateValue::String).unwrap_or(TemplateValue::Nil),
        "publishable" => TemplateValue::Bool(r.publishable),
        "width" => r.width.map(|w| TemplateValue::Number(w as i64)).unwrap_or(TemplateValue::Nil),
        "height" => r.height.map(|h| TemplateValue::Number(h as i64)).unwrap_or(TemplateValue::Nil),
        "data" => TemplateValue::ResourceData(r.clone()),
        _ => TemplateValue::Nil,
    }
}

/// `.Data` projection field-access table (§3: "Data.integrity").
pub fn data_field(r: &ResourceHandle, name: &str) -> TemplateValue {
    match name {
        "integrity" => r.integrity.clone().map(TemplateValue::String).unwrap_or(TemplateValue::Nil),
        _ => TemplateValue::Nil,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_png_reads_dimensions() {
        let mut bytes = vec![0u8; 24];
        bytes[0..8].copy_from_slice(b"\x89PNG\r\n\x1a\n");
        bytes[16..20].copy_from_slice(&100u32.to_be_bytes());
        bytes[20..24].copy_from_slice(&200u32.to_be_bytes());
        assert_eq!(decode_png(&bytes), Some((100, 200)));
    }

    #[test]
    fn decode_gif_reads_dimensions() {
        let mut bytes = vec![0u8; 10];
        bytes[0..6].copy_from_slice(b"GIF89a");
        bytes[6..8].copy_from_slice(&50u16.to_le_bytes());
        bytes[8..10].copy_from_slice(&60u16.to_le_bytes());
        assert_eq!(decode_gif(&bytes), Some((50, 60)));
    }

    #[test]
    fn decode_dimensions_none_on_truncated_input() {
        assert_eq!(decode_dimensions(&[0, 1, 2]), None);
    }

    #[test]
    fn resolve_dimensions_derives_missing_side() {
        assert_eq!(resolve_dimensions((Some(200), Some(100)), (Some(100), None)), (100, 50));
        assert_eq!(resolve_dimensions((Some(200), Some(100)), (None, Some(50))), (100, 50));
    }

    #[test]
    fn parse_resize_spec_extracts_format() {
        assert_eq!(parse_resize_spec("300x200 png"), (Some(300), Some(200), Some("png".to_string())));
        assert_eq!(parse_resize_spec("300x"), (Some(300), None, None));
    }
}
