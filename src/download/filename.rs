//! Artifact filename selection, sanitization, and collision-free path resolution.

use std::path::{Component, Path, PathBuf};

/// Picks the artifact filename: caller's choice, then the service's
/// `Content-Disposition`, then `export_{job_id}`.
#[must_use]
pub fn resolve_filename(
    requested: Option<&str>,
    content_disposition: Option<&str>,
    job_id: &str,
) -> String {
    requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| content_disposition.and_then(parse_content_disposition))
        .unwrap_or_else(|| format!("export_{job_id}"))
}

/// Extracts the filename from a `Content-Disposition` header.
///
/// Handles:
/// - `attachment; filename="hologram_J1.mp4"`
/// - `attachment; filename=hologram_J1.mp4`
/// - `attachment; filename*=UTF-8''hologram%20J1.mp4` (RFC 5987, preferred when present)
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    // Parameter names are case-insensitive; ASCII lowercasing keeps byte offsets.
    let lowered = header.to_ascii_lowercase();

    if let Some(pos) = lowered.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        // charset'language'percent-encoded
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                let decoded = decoded.trim_matches('"').to_string();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }
    }

    let pos = lowered.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();
    let name = if let Some(quoted) = value.strip_prefix('"') {
        &quoted[..quoted.find('"')?]
    } else {
        value[..value.find(';').unwrap_or(value.len())].trim()
    };
    (!name.is_empty()).then(|| name.to_string())
}

/// Replaces characters that are invalid on common filesystems (`/ \ : * ? " < > |`
/// and control characters) and neutralizes `.`/`..`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }
    if is_safe_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

/// Returns `dir/filename`, or `dir/stem_N.ext` for the first free `N` if taken.
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str, fallback: &str) -> PathBuf {
    let sanitized = sanitize_filename(filename);
    let filename = if sanitized.trim_matches('_').is_empty() {
        sanitize_filename(fallback)
    } else {
        sanitized
    };

    let base_path = dir.join(&filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };
    (1..)
        .map(|i| dir.join(format!("{stem}_{i}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base_path)
}

fn is_safe_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
