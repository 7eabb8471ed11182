use axum::response::{Html, IntoResponse};
use maud::{DOCTYPE, PreEscaped, html};

/// Built-in browser client, used when no static directory is configured
pub async fn index() -> impl IntoResponse {
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Chat" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div class="container" {
                    h1 { "Chat" }
                    div id="status" class="status" { "connecting\u{2026}" }
                    ul id="events" class="events" {}
                    form id="compose" class="compose" {
                        input id="text" type="text" autocomplete="off" placeholder="Say something";
                        button type="submit" { "Send" }
                    }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    };

    Html(markup.into_string())
}

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; background: #f4f4f6; margin: 0; }
.container { max-width: 720px; margin: 2rem auto; background: #fff; padding: 1.5rem; border-radius: 8px; }
.status { color: #666; font-size: 0.85rem; margin-bottom: 1rem; }
.events { list-style: none; padding: 0; height: 60vh; overflow-y: auto; border: 1px solid #ddd; border-radius: 4px; }
.events li { padding: 0.35rem 0.75rem; border-bottom: 1px solid #eee; }
.events li.presence { color: #888; font-style: italic; }
.events li.mine .user { color: #0b6bcb; }
.user { font-weight: 600; margin-right: 0.5rem; }
.time { color: #aaa; font-size: 0.75rem; margin-right: 0.5rem; }
.compose { display: flex; gap: 0.5rem; margin-top: 1rem; }
.compose input { flex: 1; padding: 0.5rem; }
"#;

const JAVASCRIPT: &str = r#"
(function () {
  const list = document.getElementById('events');
  const status = document.getElementById('status');
  const form = document.getElementById('compose');
  const input = document.getElementById('text');
  const scheme = location.protocol === 'https:' ? 'wss' : 'ws';
  const socket = new WebSocket(scheme + '://' + location.host + '/ws');
  let me = null;

  function render(event) {
    const li = document.createElement('li');
    const time = document.createElement('span');
    time.className = 'time';
    time.textContent = new Date(event.timestamp * 1000).toLocaleTimeString();
    const user = document.createElement('span');
    user.className = 'user';
    user.textContent = event.user.slice(0, 8);
    li.append(time, user);
    if (event.kind === 'message') {
      li.append(document.createTextNode(event.text));
    } else {
      li.className = 'presence';
      li.append(document.createTextNode(event.kind === 'join' ? 'joined' : 'left'));
    }
    if (event.user === me) li.classList.add('mine');
    list.append(li);
    list.scrollTop = list.scrollHeight;
  }

  socket.onmessage = function (frame) {
    const msg = JSON.parse(frame.data);
    if (msg.type === 'connected') {
      me = msg.user;
      status.textContent = 'connected as ' + me.slice(0, 8);
    } else if (msg.type === 'event') {
      render(msg.event);
    } else if (msg.type === 'error') {
      status.textContent = 'error: ' + msg.message;
    }
  };
  socket.onclose = function () { status.textContent = 'disconnected'; };

  form.addEventListener('submit', function (e) {
    e.preventDefault();
    if (!input.value || socket.readyState !== WebSocket.OPEN) return;
    socket.send(JSON.stringify({ type: 'message', text: input.value }));
    input.value = '';
  });
})();
"#;
