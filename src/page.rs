use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Structured input for the not-found page.
///
/// The decision core hands the renderer the full offending URL and the
/// configured contact points, nothing else. Filesystem paths never reach
/// this layer, so they cannot leak into the response body.
#[derive(Debug, Clone)]
pub struct NotFoundContext<'a> {
    /// scheme + host + original sanitized request URI.
    pub full_url: &'a str,
    pub contact_email: &'a str,
    pub home_url: &'a str,
}

/// Renders the not-found response body. Presentation is a collaborator of
/// the decision core, kept behind this trait so templating never becomes a
/// dependency of the rewrite logic.
pub trait NotFoundRenderer: Send + Sync {
    fn render(&self, ctx: &NotFoundContext<'_>) -> String;
}

/// Default HTML renderer: offending URL, return-home link, and a mailto
/// contact action pre-filled with the URL.
pub struct HtmlNotFoundRenderer;

/// Everything except unreserved characters, matching rawurlencode.
const MAILTO_BODY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

impl NotFoundRenderer for HtmlNotFoundRenderer {
    fn render(&self, ctx: &NotFoundContext<'_>) -> String {
        let mail_url = mailto_link(ctx.contact_email, ctx.full_url);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Page Not Found</title>
</head>
<body>
  <div class="jumbotron">
    <h1 class="display-4">Page Not Found</h1>
    <p class="lead">The requested URL was not found on this server:</p>
    <code class="text-secondary">{url}</code>
    <hr class="my-4">
    <p class="lead">
      <a class="btn btn-danger btn-lg" href="{home}" role="button">Return to Home Page</a>
      <a class="btn btn-danger btn-lg" target="_blank" href="{mail}" role="button">Contact Us</a>
    </p>
  </div>
</body>
</html>
"#,
            url = escape_html(ctx.full_url),
            home = escape_html(ctx.home_url),
            mail = escape_html(&mail_url),
        )
    }
}

/// Build the "report this" mailto link with the offending URL in the body.
fn mailto_link(contact_email: &str, full_url: &str) -> String {
    let body = format!("The following url was not found:\n\n{}\n\n", full_url);
    format!(
        "mailto:{}?subject=Invalid-404-Url&body={}",
        contact_email,
        utf8_percent_encode(&body, MAILTO_BODY)
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
