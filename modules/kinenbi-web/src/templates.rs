use kinenbi_common::{RunStage, RunState};

/// Render the single page. The server fills in the current state; the
/// script then polls `/api/run` and redraws the same regions.
pub fn render_index(state: &RunState) -> String {
    let running = state.stage.is_running();

    let status = state.status_message.as_deref().unwrap_or("");
    let error = state.error.as_deref().unwrap_or("");

    let final_cards: String = state
        .final_posts
        .iter()
        .map(|p| post_card(p, false))
        .collect();
    let rejected_cards: String = state
        .rejected_posts
        .iter()
        .map(|p| post_card(p, true))
        .collect();

    let content = format!(
        r#"<div class="container">
    <p class="intro">Drafts promotional posts for new-graduate job seekers, tying today's anniversaries to companies that are hiring.</p>
    <button id="generate" class="generate-btn"{button_hidden}>Generate posts</button>
    <p id="status" class="status"{status_hidden}>{status}</p>
    <p id="error" class="error"{error_hidden}>{error}</p>

    <section id="final-section"{final_hidden}>
        <h2>Selected posts</h2>
        <div id="final">{final_cards}</div>
    </section>

    <section id="rejected-section"{rejected_hidden}>
        <h2>Other drafts</h2>
        <div id="rejected">{rejected_cards}</div>
    </section>
</div>
<script>
const RUNNING = {running_stages};

function escapeHtml(s) {{
    return s.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;')
        .replace(/"/g, '&quot;').replace(/'/g, '&#39;');
}}

function card(text, rejected) {{
    return `<div class="post-card${{rejected ? ' rejected' : ''}}">`
        + `<p class="post-text">${{escapeHtml(text)}}</p>`
        + `<button class="copy-btn" data-text="${{escapeHtml(text)}}">Copy</button></div>`;
}}

function show(id, visible) {{
    document.getElementById(id).hidden = !visible;
}}

function render(state) {{
    const running = RUNNING.includes(state.stage);
    show('generate', !running);
    document.getElementById('status').textContent = state.status_message || '';
    show('status', !!state.status_message);
    document.getElementById('error').textContent = state.error || '';
    show('error', !!state.error);
    document.getElementById('final').innerHTML = state.final_posts.map(p => card(p, false)).join('');
    show('final-section', state.final_posts.length > 0);
    document.getElementById('rejected').innerHTML = state.rejected_posts.map(p => card(p, true)).join('');
    show('rejected-section', state.rejected_posts.length > 0);
    return running;
}}

async function poll() {{
    const res = await fetch('/api/run');
    if (render(await res.json())) {{
        setTimeout(poll, 1000);
    }}
}}

document.getElementById('generate').addEventListener('click', async () => {{
    const res = await fetch('/api/run', {{ method: 'POST' }});
    const body = await res.json();
    render(res.status === 409 ? body.state : body);
    poll();
}});

document.addEventListener('click', async (e) => {{
    if (!e.target.classList.contains('copy-btn')) return;
    // Only secure origins (https or localhost) expose the clipboard API.
    if (!navigator.clipboard) return;
    await navigator.clipboard.writeText(e.target.dataset.text);
    e.target.textContent = 'Copied';
    setTimeout(() => {{ e.target.textContent = 'Copy'; }}, 1500);
}});

if (RUNNING.includes('{stage}')) {{
    poll();
}}
</script>"#,
        button_hidden = hidden(running),
        status_hidden = hidden(status.is_empty()),
        error_hidden = hidden(error.is_empty()),
        final_hidden = hidden(state.final_posts.is_empty()),
        rejected_hidden = hidden(state.rejected_posts.is_empty()),
        status = html_escape(status),
        error = html_escape(error),
        running_stages = running_stages_js(),
        stage = state.stage,
    );

    build_page("Anniversary posts", &content)
}

fn post_card(text: &str, rejected: bool) -> String {
    let class = if rejected {
        "post-card rejected"
    } else {
        "post-card"
    };
    let text = html_escape(text);
    format!(
        r#"<div class="{class}"><p class="post-text">{text}</p><button class="copy-btn" data-text="{text}">Copy</button></div>"#
    )
}

fn hidden(yes: bool) -> &'static str {
    if yes {
        " hidden"
    } else {
        ""
    }
}

/// JS array literal of the stage names during which a run is in flight.
fn running_stages_js() -> String {
    let names: Vec<String> = [
        RunStage::FetchingAnniversaries,
        RunStage::FetchingCompanies,
        RunStage::DraftingTweets,
        RunStage::SelectingPerAnniversary,
        RunStage::SelectingFinal,
    ]
    .iter()
    .map(|s| format!("'{s}'"))
    .collect();
    format!("[{}]", names.join(", "))
}

fn build_page(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Kinenbi</title>
<style>
*{{margin:0;padding:0;box-sizing:border-box;}}
body{{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;color:#1a1a1a;background:#fafafa;}}
.header{{background:#1a1a1a;color:#fff;padding:12px 24px;}}
.header h1{{font-size:18px;font-weight:600;}}
.container{{max-width:720px;margin:0 auto;padding:24px;}}
.intro{{color:#555;font-size:14px;margin-bottom:16px;}}
.generate-btn{{padding:8px 20px;background:#0066cc;color:#fff;border:none;border-radius:4px;font-size:14px;font-weight:500;cursor:pointer;}}
.generate-btn:hover{{background:#004499;}}
.status{{margin-top:16px;font-size:14px;color:#0066cc;}}
.error{{margin-top:16px;padding:8px 12px;background:#fce4ec;border:1px solid #f8bbd0;border-radius:4px;font-size:13px;color:#c62828;}}
section{{margin-top:24px;}}
section h2{{font-size:15px;color:#666;margin-bottom:8px;}}
.post-card{{background:#fff;border:1px solid #e0e0e0;border-radius:8px;padding:16px;margin-bottom:12px;}}
.post-card.rejected{{opacity:0.55;}}
.post-text{{white-space:pre-wrap;font-size:14px;margin-bottom:8px;}}
.copy-btn{{padding:4px 12px;background:#f0f0f0;border:1px solid #ddd;border-radius:4px;font-size:12px;cursor:pointer;}}
</style>
</head>
<body>
<div class="header">
    <h1>Kinenbi</h1>
</div>
{content}
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
