use std::path::Path;

/// Content type used when the extension is unknown
pub const FALLBACK_CONTENT_TYPE: &str = "binary/octet-stream";

pub const CACHE_ONE_DAY: &str = "max-age=86400";
pub const CACHE_ONE_YEAR: &str = "max-age=31536000";
pub const NO_CACHE: &str = "no-cache";

/// Content type and cache policy of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content_type: String,
    pub cache_control: String,
}

/// Classify an object key by its extension
///
/// Only the extension is consulted, never the file content.
pub fn classify(key: &str) -> Classification {
    let content_type = detect_content_type(Path::new(key));
    let cache_control = cache_control_for(&content_type).to_string();
    Classification {
        content_type,
        cache_control,
    }
}

/// Detect Content-Type based on file extension
///
/// Covers the assets a static site generator emits. Falls back to
/// `binary/octet-stream` for unknown types.
pub fn detect_content_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        // Markup and text
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("xml") => "text/xml; charset=utf-8",
        Some("rss") => "application/rss+xml",
        Some("atom") => "application/atom+xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",

        // Image formats
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("tif") | Some("tiff") => "image/tiff",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",

        // Media
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",

        // Documents and archives
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("wasm") => "application/wasm",

        _ => FALLBACK_CONTENT_TYPE,
    }
    .to_string()
}

/// Cache policy for a content type, first matching rule wins
pub fn cache_control_for(content_type: &str) -> &'static str {
    if content_type.contains("image/") || content_type == FALLBACK_CONTENT_TYPE {
        CACHE_ONE_DAY
    } else if content_type.contains("text/css") || content_type == "application/x-javascript" {
        CACHE_ONE_YEAR
    } else {
        NO_CACHE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_policy_by_extension() {
        assert_eq!(classify("/style.css").cache_control, CACHE_ONE_YEAR);
        assert_eq!(classify("/logo.png").cache_control, CACHE_ONE_DAY);
        assert_eq!(classify("/index.html").cache_control, NO_CACHE);
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        for key in ["/data.bin", "/blob.xyz", "/CNAME", "/.well-known/thing"] {
            let c = classify(key);
            assert_eq!(c.content_type, FALLBACK_CONTENT_TYPE, "{key}");
            assert_eq!(c.cache_control, CACHE_ONE_DAY, "{key}");
        }
    }

    #[test]
    fn test_same_extension_same_classification() {
        assert_eq!(classify("/a/b/c.svg"), classify("x.svg"));
        assert_eq!(classify("/posts/one/index.html"), classify("index.html"));
        assert_eq!(classify("/IMG.PNG"), classify("/img.png"));
    }

    #[test]
    fn test_rule_precedence() {
        // image rule is checked before the stylesheet rule
        assert_eq!(cache_control_for("image/css-sprite"), CACHE_ONE_DAY);
        assert_eq!(cache_control_for("text/css"), CACHE_ONE_YEAR);
        assert_eq!(cache_control_for("application/x-javascript"), CACHE_ONE_YEAR);
        assert_eq!(cache_control_for("application/javascript"), NO_CACHE);
        assert_eq!(cache_control_for("application/octet-stream"), NO_CACHE);
        assert_eq!(cache_control_for("binary/octet-stream"), CACHE_ONE_DAY);
    }

    #[test]
    fn test_detect_content_type_web_assets() {
        assert_eq!(
            detect_content_type(Path::new("index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(detect_content_type(Path::new("font.woff2")), "font/woff2");
        assert_eq!(detect_content_type(Path::new("feed.xml")), "text/xml; charset=utf-8");
        assert_eq!(detect_content_type(Path::new("no_extension")), FALLBACK_CONTENT_TYPE);
    }
}
