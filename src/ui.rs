use crate::models::{Session, SessionMode};

pub fn render_index(session: &Session) -> String {
    let (title, controls) = match session.mode {
        SessionMode::Payment => ("Payment console", PAYMENT_CONTROLS),
        SessionMode::UserRegistration => ("RFID registration", REGISTRATION_CONTROLS),
    };
    let usage = match (session.mode, session.multi_use) {
        (SessionMode::Payment, true) => "multi-use request",
        (SessionMode::Payment, false) => "single-use request",
        (SessionMode::UserRegistration, _) => "user",
    };
    INDEX_HTML
        .replace("{{TITLE}}", title)
        .replace("{{USAGE}}", usage)
        .replace("{{SUBJECT}}", &escape_html(&session.subject_id))
        .replace("{{CONTROLS}}", controls)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const PAYMENT_CONTROLS: &str = r#"<p class="hint">Click the indicator to reconnect the reader.</p>"#;

const REGISTRATION_CONTROLS: &str = r#"<div class="actions">
      <button class="btn-change" id="change-rfid-button" type="button">Scan new tag</button>
      <button class="btn-clear" id="clear-rfid-button" type="button">Clear tag</button>
    </div>"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --green: #2e9d5b;
      --amber: #e0a100;
      --red: #d2453b;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(640px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 24px;
    }

    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
    }

    h1 {
      font-family: "Georgia", serif;
      margin: 0;
    }

    .subtitle,
    .hint {
      margin: 0;
      color: #5f5c57;
    }

    .nfc-icon {
      width: 44px;
      height: 44px;
      border-radius: 50%;
      border: none;
      cursor: pointer;
      background: var(--red);
    }

    .nfc-icon[data-indicator="green"] {
      background: var(--green);
    }

    .nfc-icon[data-indicator="amber"] {
      background: var(--amber);
    }

    .actions {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    button.btn-change,
    button.btn-clear {
      border: none;
      border-radius: 999px;
      padding: 14px 18px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      color: white;
    }

    .btn-change {
      background: var(--accent-2);
    }

    .btn-clear {
      background: var(--accent);
    }

    .notification-container {
      display: grid;
      gap: 10px;
    }

    .notification {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 12px 16px;
      border-radius: 14px;
      background: white;
      border-left: 6px solid var(--accent-2);
    }

    .notification.success {
      border-left-color: var(--green);
    }

    .notification.error {
      border-left-color: var(--red);
    }

    .notification-close {
      border: none;
      background: none;
      font-size: 1.2rem;
      cursor: pointer;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <div>
        <h1>{{TITLE}}</h1>
        <p class="subtitle">{{USAGE}} <code>{{SUBJECT}}</code></p>
      </div>
      <button class="nfc-icon" id="nfc-icon" type="button" title="Reconnect reader"></button>
    </header>
    {{CONTROLS}}
    <section class="notification-container" id="notifications"></section>
  </main>
  <script>
    const icon = document.getElementById('nfc-icon');
    const list = document.getElementById('notifications');
    const changeButton = document.getElementById('change-rfid-button');
    const clearButton = document.getElementById('clear-rfid-button');

    const refreshStatus = async () => {
      const res = await fetch('/api/status');
      if (!res.ok) {
        return;
      }
      const status = await res.json();
      icon.dataset.indicator = status.indicator;
      icon.title = status.connection;
      if (status.navigate_to) {
        window.location.href = status.navigate_to;
      }
    };

    const renderNotifications = (items) => {
      list.innerHTML = '';
      items.forEach((item) => {
        const row = document.createElement('div');
        row.className = `notification ${item.type}`;
        const text = document.createElement('span');
        text.textContent = `${item.shown_at}  ${item.message}`;
        const close = document.createElement('button');
        close.className = 'notification-close';
        close.textContent = '×';
        close.addEventListener('click', async () => {
          await fetch(`/api/notifications/${item.id}/dismiss`, { method: 'POST' });
          refreshNotifications();
        });
        row.append(text, close);
        list.appendChild(row);
      });
    };

    const refreshNotifications = async () => {
      const res = await fetch('/api/notifications');
      if (res.ok) {
        renderNotifications(await res.json());
      }
    };

    const reconnect = async () => {
      await fetch('/api/reconnect', { method: 'POST' });
      refreshStatus();
    };

    icon.addEventListener('click', reconnect);
    if (changeButton) {
      changeButton.addEventListener('click', reconnect);
    }
    if (clearButton) {
      clearButton.addEventListener('click', async () => {
        if (!confirm("Are you sure you want to clear this user's RFID?")) {
          return;
        }
        await fetch('/api/rfid', { method: 'DELETE' });
        refreshNotifications();
      });
    }

    const tick = () => {
      refreshStatus().catch(() => {});
      refreshNotifications().catch(() => {});
    };
    tick();
    setInterval(tick, 1000);
  </script>
</body>
</html>
"#;
