pub const GLOBAL_CSS: &str = r#"
:root {
  --bg: #ffffff;
  --text: #1b1f24;
  --text-muted: #5b6678;
  --accent: steelblue;
  --border: rgba(0, 0, 0, 0.12);
  --radius: 6px;
  --font-body: "Inter", "Helvetica Neue", system-ui, -apple-system, sans-serif;
}

* { box-sizing: border-box; }
html, body {
  padding: 0;
  margin: 0;
  background: var(--bg);
  color: var(--text);
  font-family: var(--font-body);
}

.story {
  max-width: 760px;
  margin: 0 auto;
  padding: 24px 16px 40px;
}

.story h1 {
  margin: 0 0 8px;
  font-size: 24px;
}

#description {
  min-height: 3em;
  margin: 0 0 16px;
  color: var(--text-muted);
  line-height: 1.4;
}

.controls {
  display: flex;
  align-items: center;
  gap: 8px;
  margin-bottom: 12px;
}

#country-select {
  padding: 4px 8px;
  border: 1px solid var(--border);
  border-radius: var(--radius);
  font: inherit;
}

#chart {
  display: block;
  width: 700px;
  height: 400px;
}

.nav {
  display: flex;
  gap: 8px;
  margin-top: 12px;
}

.nav button {
  padding: 6px 14px;
  border: 1px solid var(--accent);
  border-radius: var(--radius);
  background: var(--accent);
  color: #fff;
  font: inherit;
  cursor: pointer;
}

.status {
  color: #b42318;
}
"#;
