use std::fmt::Write;

use crate::language::highlight_id;
use crate::models::GenerationResult;

/// What the page shows below the form.
pub enum FormOutcome {
    Generated(GenerationResult),
    Failed(String),
}

/// Everything needed to render the single page.
pub struct PageView<'a> {
    pub languages: &'a [String],
    pub selected: &'a str,
    pub task: &'a str,
    pub outcome: Option<FormOutcome>,
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; background: #f8f9fa; }
form { display: flex; gap: 1rem; align-items: flex-start; }
select, textarea { font-size: 1rem; padding: .4rem; }
textarea { flex: 1; height: 150px; }
button { background: #0072ff; color: white; font-weight: bold; border: 0; padding: .6rem 1.2rem; border-radius: .4rem; cursor: pointer; }
.error { background: #fdecea; color: #b71c1c; padding: .8rem 1rem; border-radius: .4rem; margin-top: 1rem; }
.panes { display: flex; gap: 1rem; margin-top: 1rem; }
.pane { flex: 1; min-width: 0; background: #f1f3f4; padding: 1.2rem; border-radius: .5rem; }
.pane pre { overflow-x: auto; }
.hidden { display: none; }
"#;

const SCRIPT: &str = r#"
const form = document.getElementById('code-form');
form.addEventListener('submit', async (event) => {
  event.preventDefault();
  const banner = document.getElementById('error');
  const button = form.querySelector('button');
  const body = { language: form.language.value, task: form.task.value };
  button.disabled = true;
  button.textContent = 'Generating code and test...';
  try {
    const response = await fetch('/api/generate', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(body),
    });
    const data = await response.json();
    if (!response.ok) {
      banner.textContent = data.message;
      banner.classList.remove('hidden');
      return;
    }
    banner.classList.add('hidden');
    for (const [id, text] of [['code', data.code], ['test', data.test]]) {
      const el = document.getElementById(id + '-output');
      el.className = 'language-' + data.highlight;
      el.textContent = text;
      el.removeAttribute('data-highlighted');
      if (window.hljs) { hljs.highlightElement(el); }
    }
    document.getElementById('panes').classList.remove('hidden');
  } catch (err) {
    banner.textContent = 'Error generating code: ' + err;
    banner.classList.remove('hidden');
  } finally {
    button.disabled = false;
    button.textContent = 'Generate Code';
  }
});
"#;

pub fn render(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>AI Code Generator</title>\n");
    html.push_str("<link rel=\"stylesheet\" href=\"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github.min.css\">\n");
    html.push_str("<script src=\"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js\"></script>\n");
    let _ = write!(html, "<style>{STYLE}</style>\n</head>\n<body>\n");
    html.push_str("<h2>AI-Powered Code &amp; Test Generator</h2>\n");
    html.push_str("<p>Describe your coding task and let the AI generate both the implementation and the test cases.</p>\n");

    html.push_str("<form id=\"code-form\" method=\"post\" action=\"/generate\">\n");
    html.push_str("<label>Choose a programming language<br>\n<select name=\"language\">\n");
    for language in view.languages {
        let selected = if language.eq_ignore_ascii_case(view.selected) { " selected" } else { "" };
        let escaped = escape_html(language);
        let _ = writeln!(html, "<option value=\"{escaped}\"{selected}>{escaped}</option>");
    }
    html.push_str("</select></label>\n");
    let _ = writeln!(
        html,
        "<textarea name=\"task\" placeholder=\"E.g., Create a function that finds the median of a list of numbers\">{}</textarea>",
        escape_html(view.task)
    );
    html.push_str("<button type=\"submit\">Generate Code</button>\n</form>\n");

    let (error, result) = match &view.outcome {
        Some(FormOutcome::Failed(message)) => (Some(message.as_str()), None),
        Some(FormOutcome::Generated(result)) => (None, Some(result)),
        None => (None, None),
    };

    match error {
        Some(message) => {
            let _ = writeln!(html, "<div id=\"error\" class=\"error\">{}</div>", escape_html(message));
        }
        None => html.push_str("<div id=\"error\" class=\"error hidden\"></div>\n"),
    }

    let highlight = highlight_id(view.selected);
    let hidden = if result.is_some() { "" } else { " hidden" };
    let _ = writeln!(html, "<div id=\"panes\" class=\"panes{hidden}\">");
    for (id, title, text) in [
        ("code", "Generated Code", result.map(|r| r.code.as_str())),
        ("test", "Generated Test", result.map(|r| r.test.as_str())),
    ] {
        let _ = writeln!(
            html,
            "<div class=\"pane\"><h3>{title}</h3><pre><code id=\"{id}-output\" class=\"language-{highlight}\">{}</code></pre></div>",
            escape_html(text.unwrap_or_default())
        );
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        "<script>{SCRIPT}</script>\n<script>if (window.hljs) {{ hljs.highlightAll(); }}</script>\n</body>\n</html>\n"
    );
    html
}

/// Escape text for use in HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
