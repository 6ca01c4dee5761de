const DRIVE_FILE_PREFIX: &str = "https://drive.google.com/file/d/";

/// Shareable view link for a Drive file id.
pub fn drive_view_link(file_id: &str) -> String {
    format!("{}{}/view?usp=sharing", DRIVE_FILE_PREFIX, file_id)
}

/// Rewrite a Drive view link into a direct download URL. Links that are not
/// Drive file links are returned unchanged.
pub fn direct_download_url(link: &str) -> String {
    let Some(rest) = link.strip_prefix(DRIVE_FILE_PREFIX) else {
        return link.to_string();
    };

    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();

    if id.is_empty() {
        link.to_string()
    } else {
        format!("https://drive.google.com/uc?export=download&id={}", id)
    }
}
