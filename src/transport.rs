//! Unix socket carrying the bridge between the host and an out-of-process
//! renderer. Instructions go out one per line; renderer messages come back as
//! one JSON object per line.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::{Editor, InboundMessage, RendererSink};

/// Listens for renderer connections
pub struct RendererServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl RendererServer {
    /// Bind to `socket_path`, replacing a stale socket file if one is left over
    pub fn bind(socket_path: impl AsRef<Path>) -> io::Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        tracing::info!(path = %socket_path.display(), "waiting for renderer");

        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn accept(&self) -> io::Result<RendererSession> {
        let (stream, _addr) = self.listener.accept().await?;
        tracing::info!("renderer connected");
        Ok(RendererSession { stream })
    }

    /// Remove the socket file
    pub fn cleanup(&self) -> io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        Ok(())
    }
}

impl Drop for RendererServer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// One connected renderer
pub struct RendererSession {
    stream: UnixStream,
}

impl RendererSession {
    /// Attach `editor` to this connection and pump messages on a new task
    /// until the renderer hangs up. The editor is attached before this
    /// returns, so instructions sent right after are not lost.
    pub fn spawn(self, editor: Editor) -> JoinHandle<io::Result<()>> {
        let (read_half, write_half) = self.stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn RendererSink> = Arc::new(tx);
        editor.attach(sink.clone());
        tokio::spawn(pump(editor, sink, read_half, write_half, rx))
    }

    pub async fn run(self, editor: Editor) -> io::Result<()> {
        self.spawn(editor).await.map_err(io::Error::other)?
    }
}

/// Feed renderer lines to the editor. Once the renderer hangs up the editor
/// is detached from it, which cancels any query still waiting on it. An
/// editor already moved to another session stays attached there.
async fn pump(
    editor: Editor,
    sink: Arc<dyn RendererSink>,
    read_half: OwnedReadHalf,
    write_half: OwnedWriteHalf,
    rx: mpsc::UnboundedReceiver<String>,
) -> io::Result<()> {
    let writer = tokio::spawn(write_instructions(write_half, rx));

    let mut lines = BufReader::new(read_half).lines();
    let read_result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.on_message(&line);
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    if editor.detach_sink(&sink) {
        tracing::info!("renderer disconnected");
    } else {
        tracing::info!("renderer disconnected after being replaced");
    }
    // The writer stops once its last sender is gone
    drop(sink);

    let write_result = writer.await.map_err(io::Error::other)?;
    read_result.and(write_result)
}

async fn write_instructions(
    mut stream: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> io::Result<()> {
    while let Some(mut script) = rx.recv().await {
        script.push('\n');
        if let Err(err) = stream.write_all(script.as_bytes()).await {
            // The renderer is gone; the reader side will notice too
            if err.kind() == io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(err);
        }
        stream.flush().await?;
    }
    Ok(())
}

/// Renderer end of the socket, for shims and tests
#[derive(Debug)]
pub struct RendererClient {
    reader: BufReader<UnixStream>,
}

impl RendererClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> io::Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// Next instruction from the host, without its trailing newline
    pub async fn recv_instruction(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "host closed connection",
            ));
        }

        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    pub async fn post(&mut self, message: &InboundMessage) -> io::Result<()> {
        let mut json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        json.push('\n');
        self.post_raw(&json).await
    }

    /// Write raw bytes as the renderer would, framing included
    pub async fn post_raw(&mut self, raw: &str) -> io::Result<()> {
        self.reader.get_mut().write_all(raw.as_bytes()).await?;
        self.reader.get_mut().flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MessageKind;
    use crate::config::EditorConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_socket_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("renderer.sock");
        (dir, path)
    }

    #[tokio::test]
    async fn bind_replaces_stale_socket() {
        let (_dir, path) = temp_socket_path();
        std::fs::write(&path, "stale").unwrap();

        let server = RendererServer::bind(&path).unwrap();
        assert!(path.exists());
        assert_eq!(server.socket_path(), path);
    }

    #[tokio::test]
    async fn drop_removes_socket() {
        let (_dir, path) = temp_socket_path();
        let server = RendererServer::bind(&path).unwrap();
        drop(server);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn session_carries_instructions_and_responses() {
        let (_dir, path) = temp_socket_path();
        let server = RendererServer::bind(&path).unwrap();
        let editor = Editor::new(EditorConfig::default());

        let (session, renderer) = tokio::join!(server.accept(), RendererClient::connect(&path));
        let session = session.unwrap().spawn(editor.clone());
        let mut renderer = renderer.unwrap();
        assert!(editor.is_attached());

        let query = tokio::spawn({
            let editor = editor.clone();
            async move { editor.get_title_text().await }
        });

        let instruction = renderer.recv_instruction().await.unwrap();
        assert!(instruction.contains(r#""type":"GET_TITLE_TEXT""#));
        assert!(instruction.ends_with(";true;"));

        renderer
            .post(&InboundMessage::new(MessageKind::TitleTextResponse, json!("Hello")))
            .await
            .unwrap();
        assert_eq!(query.await.unwrap().unwrap(), "Hello");

        drop(renderer);
        session.await.unwrap().unwrap();
        assert!(!editor.is_attached());
    }
}
