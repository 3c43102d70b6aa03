pub const HASHTAGS: &str = "#aiart #figuredrawing #digitalart #agentic";

/// Joins the non-empty caption segments with blank lines; the hashtag line
/// always closes the caption.
pub fn compose_caption(caption: Option<&str>, prompt: Option<&str>, style: Option<&str>) -> String {
    fn non_blank(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let mut segments: Vec<String> = Vec::with_capacity(4);
    if let Some(caption) = non_blank(caption) {
        segments.push(caption.to_string());
    }
    if let Some(prompt) = non_blank(prompt) {
        segments.push(format!("Prompt: {prompt}"));
    }
    if let Some(style) = non_blank(style) {
        segments.push(format!("Style: {style}"));
    }
    segments.push(HASHTAGS.to_string());
    segments.join("\n\n")
}
