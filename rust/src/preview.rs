use html_escape::encode_double_quoted_attribute;

// The frame gets scripts but not the host origin, so generated pages cannot
// reach into the builder UI.
const FRAME_SANDBOX: &str = "allow-scripts allow-forms allow-modals allow-popups";

const PLACEHOLDER_HTML: &str = r#"<div class="placeholder">
  <div class="placeholder-icon">&#10024;</div>
  <h3>Ready to Build</h3>
  <p>Enter a description of your website in the sidebar and click Generate to create your custom website using AI.</p>
</div>"#;

/// Markup for the preview area.
///
/// The artifact is model output and is embedded without sanitization. Only
/// attribute encoding is applied, which the browser reverses, so the frame
/// document is exactly the artifact text.
pub fn render_preview(artifact: &str) -> String {
    if artifact.is_empty() {
        return PLACEHOLDER_HTML.to_string();
    }

    format!(
        r#"<iframe class="preview-frame" title="Website Preview" sandbox="{FRAME_SANDBOX}" srcdoc="{}"></iframe>"#,
        encode_double_quoted_attribute(artifact)
    )
}
