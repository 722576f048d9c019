use uuid::Uuid;

pub const SHARE_FILE_EXTENSION: &str = "pmsr";

pub fn new_share_id() -> String {
    Uuid::new_v4().to_string()
}

/// Accepts any textual UUID form and returns the canonical hyphenated one.
/// Anything else is rejected, which also keeps ids safe to use as file names.
pub fn normalize_share_id(value: &str) -> Option<String> {
    let value = value.strip_suffix(".svg").unwrap_or(value);
    let parsed = Uuid::parse_str(value).ok()?;
    Some(parsed.to_string())
}

pub fn share_file_name(share_id: &str) -> String {
    format!("{share_id}.{SHARE_FILE_EXTENSION}")
}

pub fn image_url(public_url: &str, share_id: &str) -> String {
    format!("{}/shares/{share_id}", public_url.trim_end_matches('/'))
}
