use crate::download::DOWNLOAD_FILE_NAME;

pub fn build_main_ui_html() -> String {
    MAIN_UI_HTML.replace("__DOWNLOAD_FILE_NAME__", DOWNLOAD_FILE_NAME)
}

const MAIN_UI_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>AI Site Builder</title>
  <style>
    :root {
      --bg: #1f2024;
      --panel: #1b1c20;
      --line: #3f4248;
      --input-bg: #272a2f;
      --input-line: #4a4e55;
      --text: #f3f5f7;
      --muted: #9ca2ad;
      --primary: #7aa2f7;
      --btn-bg: #2a2d33;
      --btn-line: #5b616d;
      --ok: #2f7a54;
      --ok-line: #4fa174;
      --err: #8a2f35;
      --err-line: #b9525a;
      --header-h: 56px;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      color: var(--text);
      background: var(--bg);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      font-size: 14px;
    }
    header {
      position: fixed;
      top: 0;
      left: 0;
      right: 0;
      height: var(--header-h);
      display: flex;
      align-items: center;
      gap: 10px;
      padding: 0 18px;
      border-bottom: 1px solid var(--line);
      background: var(--panel);
      z-index: 10;
    }
    header h1 {
      margin: 0;
      font-size: 20px;
    }
    .spark {
      color: var(--primary);
      font-size: 22px;
    }
    .layout {
      padding-top: var(--header-h);
      display: flex;
      min-height: 100vh;
    }
    .sidebar {
      width: 25%;
      min-width: 260px;
      border-right: 1px solid var(--line);
      background: var(--panel);
      padding: 18px;
      display: flex;
      flex-direction: column;
      gap: 16px;
      height: calc(100vh - var(--header-h));
      position: sticky;
      top: var(--header-h);
    }
    .sidebar h2 {
      margin: 0 0 4px;
      font-size: 17px;
    }
    .sidebar p {
      margin: 0;
      color: var(--muted);
      font-size: 13px;
    }
    textarea {
      flex: 1 1 auto;
      min-height: 200px;
      resize: none;
      font: inherit;
      color: var(--text);
      background: var(--input-bg);
      border: 1px solid var(--input-line);
      border-radius: 6px;
      padding: 10px;
      outline: none;
    }
    textarea:focus {
      border-color: #6f8099;
    }
    .actions {
      display: flex;
      flex-direction: column;
      gap: 10px;
    }
    .btn {
      height: 40px;
      border: 1px solid var(--btn-line);
      background: var(--btn-bg);
      color: #ffffff;
      border-radius: 6px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      display: inline-flex;
      align-items: center;
      justify-content: center;
      gap: 8px;
    }
    .btn.primary {
      background: var(--primary);
      border-color: var(--primary);
      color: #14161a;
    }
    .btn:disabled {
      opacity: 0.45;
      cursor: default;
    }
    .spinner {
      width: 16px;
      height: 16px;
      border: 2px solid rgba(20, 22, 26, 0.35);
      border-top-color: #14161a;
      border-radius: 50%;
      animation: spin 0.8s linear infinite;
    }
    @keyframes spin {
      to { transform: rotate(360deg); }
    }
    .preview-area {
      flex: 1 1 auto;
      padding: 18px;
    }
    .card {
      width: 100%;
      height: calc(100vh - var(--header-h) - 36px);
      border: 2px solid var(--line);
      border-radius: 8px;
      overflow: hidden;
      background: #ffffff;
    }
    .card.empty {
      background: var(--panel);
    }
    .preview-frame {
      width: 100%;
      height: 100%;
      border: 0;
    }
    .placeholder {
      height: 100%;
      display: flex;
      flex-direction: column;
      align-items: center;
      justify-content: center;
      text-align: center;
      color: var(--muted);
      padding: 24px;
    }
    .placeholder-icon {
      font-size: 42px;
      color: var(--primary);
    }
    .placeholder h3 {
      color: var(--text);
      margin: 12px 0 6px;
    }
    .placeholder p {
      max-width: 420px;
      margin: 0;
      font-size: 13px;
    }
    #toasts {
      position: fixed;
      right: 18px;
      bottom: 18px;
      display: flex;
      flex-direction: column;
      gap: 8px;
      z-index: 20;
    }
    .toast {
      min-width: 240px;
      border-radius: 6px;
      padding: 10px 14px;
      color: #ffffff;
      font-size: 13px;
      opacity: 0;
      transform: translateY(6px);
      transition: opacity 160ms ease, transform 160ms ease;
    }
    .toast.show {
      opacity: 1;
      transform: translateY(0);
    }
    .toast.success {
      background: var(--ok);
      border: 1px solid var(--ok-line);
    }
    .toast.error {
      background: var(--err);
      border: 1px solid var(--err-line);
    }
    @media (max-width: 900px) {
      .layout {
        flex-direction: column;
      }
      .sidebar {
        width: 100%;
        height: auto;
        position: static;
        border-right: 0;
        border-bottom: 1px solid var(--line);
      }
    }
  </style>
</head>
<body>
  <header>
    <span class="spark">&#10024;</span>
    <h1>AI Site Builder</h1>
  </header>

  <div class="layout">
    <aside class="sidebar">
      <div>
        <h2>Website Description</h2>
        <p>Describe your website and we'll generate it for you using AI.</p>
      </div>
      <textarea id="prompt" placeholder="Describe your website, e.g., A portfolio site with a navbar, hero section, and contact form"></textarea>
      <div class="actions">
        <button id="generate" class="btn primary">Generate</button>
        <button id="download" class="btn" disabled>Download Code</button>
      </div>
    </aside>

    <main class="preview-area">
      <div id="preview" class="card empty"></div>
    </main>
  </div>

  <div id="toasts" role="status" aria-live="polite"></div>

  <script>
    const DOWNLOAD_FILE_NAME = "__DOWNLOAD_FILE_NAME__";
    const state = {
      snapshot: {
        prompt: "",
        loading: false,
        phase: "idle",
        has_artifact: false,
        preview: "",
      },
      sessionId: null,
      notices: {},
    };
    let draftTimer = null;

    function showToast(notice) {
      if (!notice || !notice.message) {
        return;
      }
      const root = document.getElementById("toasts");
      const toast = document.createElement("div");
      toast.className = `toast ${notice.level || "error"}`;
      toast.textContent = notice.message;
      root.appendChild(toast);
      requestAnimationFrame(() => toast.classList.add("show"));
      setTimeout(() => {
        toast.classList.remove("show");
        setTimeout(() => toast.remove(), 200);
      }, 3000);
    }

    async function apiGet(path) {
      const res = await fetch(path, { method: "GET" });
      const data = await res.json();
      if (!res.ok || !data.ok) {
        throw new Error(data.error || "request failed");
      }
      return data;
    }

    async function apiPost(path, body) {
      const res = await fetch(path, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(body || {}),
      });
      return res.json();
    }

    function applySnapshot(snapshot) {
      if (!snapshot) {
        return;
      }
      const previewChanged = snapshot.preview !== state.snapshot.preview;
      state.snapshot = snapshot;
      render(previewChanged);
    }

    function render(previewChanged) {
      const snap = state.snapshot;
      const generate = document.getElementById("generate");
      generate.disabled = snap.loading;
      if (snap.loading) {
        generate.innerHTML = '<span class="spinner"></span>Generating...';
      } else {
        generate.textContent = "Generate";
      }

      document.getElementById("download").disabled = !snap.has_artifact;

      if (previewChanged) {
        const preview = document.getElementById("preview");
        preview.classList.toggle("empty", !snap.has_artifact);
        preview.innerHTML = snap.preview;
      }
    }

    function setLoading(loading) {
      state.snapshot = Object.assign({}, state.snapshot, { loading });
      render(false);
    }

    async function init() {
      try {
        const data = await apiGet("/app/init");
        state.sessionId = data.session_id;
        state.notices = data.notices || {};
        document.getElementById("prompt").value = data.snapshot.prompt || "";
        applySnapshot(data.snapshot);
        render(true);
      } catch (err) {
        showToast({ level: "error", message: `Startup error: ${err.message}` });
      }
    }

    document.getElementById("prompt").addEventListener("input", (event) => {
      const prompt = event.target.value;
      if (draftTimer) {
        clearTimeout(draftTimer);
      }
      draftTimer = setTimeout(() => {
        draftTimer = null;
        apiPost("/app/prompt", { session_id: state.sessionId, prompt }).catch(() => {});
      }, 300);
    });

    document.getElementById("generate").addEventListener("click", async () => {
      const prompt = document.getElementById("prompt").value;
      if (!prompt.trim()) {
        showToast(state.notices.input_rejected);
        return;
      }
      setLoading(true);
      try {
        const data = await apiPost("/app/generate", {
          session_id: state.sessionId,
          prompt,
        });
        applySnapshot(data.snapshot);
        showToast(data.notice || { level: "error", message: data.error });
      } catch (err) {
        console.error("Generation error:", err);
        showToast(state.notices.generation_failed);
      } finally {
        if (state.snapshot.loading) {
          setLoading(false);
        }
      }
    });

    document.getElementById("download").addEventListener("click", async () => {
      if (!state.snapshot.has_artifact) {
        return;
      }
      try {
        const res = await fetch(
          `/app/download?session_id=${encodeURIComponent(state.sessionId)}`,
          { method: "GET" },
        );
        if (!res.ok) {
          const data = await res.json();
          throw new Error(data.error || "download failed");
        }
        const blob = await res.blob();
        const url = URL.createObjectURL(new Blob([blob], { type: "text/html" }));
        const anchor = document.createElement("a");
        anchor.href = url;
        anchor.download = DOWNLOAD_FILE_NAME;
        document.body.appendChild(anchor);
        anchor.click();
        document.body.removeChild(anchor);
        URL.revokeObjectURL(url);
        showToast(state.notices.downloaded);
      } catch (err) {
        showToast({ level: "error", message: `Download failed: ${err.message}` });
      }
    });

    init();
  </script>
</body>
</html>
"#;
