use async_trait::async_trait;
use ropey::Rope;
use the_lib::patch::EditRange;
use tokio::{
  sync::{
    mpsc::{
      UnboundedReceiver,
      UnboundedSender,
      unbounded_channel,
    },
    oneshot,
  },
  task::JoinHandle,
};

use crate::{
  BufferError,
  Result,
  Snapshot,
  TextBuffer,
  document::{
    Document,
    DocumentError,
  },
};

enum Request {
  Snapshot {
    reply: oneshot::Sender<std::result::Result<Snapshot, DocumentError>>,
  },
  Edit {
    version: u64,
    edits:   Vec<EditRange>,
    reply:   oneshot::Sender<std::result::Result<u64, DocumentError>>,
  },
  Close {
    reply: oneshot::Sender<()>,
  },
}

/// A [`Document`] served by its own task.
///
/// Clones share the document. Each request is handled to completion before the
/// next one, so an edit batch is never interleaved with another handle's.
/// The task ends once every handle is dropped.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
  channel: UnboundedSender<Request>,
}

impl std::fmt::Debug for Request {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Snapshot { .. } => f.write_str("Snapshot"),
      Self::Edit { version, edits, .. } => {
        f.debug_struct("Edit")
          .field("version", version)
          .field("edits", &edits.len())
          .finish()
      },
      Self::Close { .. } => f.write_str("Close"),
    }
  }
}

impl DocumentHandle {
  /// Opens a document with `text`. Must be called within a tokio runtime.
  pub fn open(text: Rope) -> Self {
    Self::open_with_handle(text).0
  }

  pub fn open_with_handle(text: Rope) -> (Self, JoinHandle<()>) {
    let (sender, receiver) = unbounded_channel();
    let worker = DocumentWorker {
      channel:  receiver,
      document: Document::new(text),
    };
    let handle = tokio::spawn(worker.run());
    (Self { channel: sender }, handle)
  }

  /// Closes the document. Later snapshots and edits fail with
  /// [`DocumentError::Closed`].
  pub async fn close(&self) -> Result<()> {
    self.request(|reply| Request::Close { reply }).await
  }

  async fn request<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
    let (reply, response) = oneshot::channel();
    self
      .channel
      .send(request(reply))
      .map_err(|_| BufferError::Disconnected)?;
    response.await.map_err(|_| BufferError::Disconnected)
  }
}

#[async_trait]
impl TextBuffer for DocumentHandle {
  async fn snapshot(&self) -> Result<Snapshot> {
    Ok(self.request(|reply| Request::Snapshot { reply }).await??)
  }

  async fn edit(&self, version: u64, edits: Vec<EditRange>) -> Result<u64> {
    Ok(
      self
        .request(|reply| {
          Request::Edit {
            version,
            edits,
            reply,
          }
        })
        .await??,
    )
  }
}

struct DocumentWorker {
  channel:  UnboundedReceiver<Request>,
  document: Document,
}

impl DocumentWorker {
  async fn run(mut self) {
    while let Some(request) = self.channel.recv().await {
      log::trace!("document request: {request:?}");
      match request {
        Request::Snapshot { reply } => {
          let _ = reply.send(self.snapshot());
        },
        Request::Edit {
          version,
          edits,
          reply,
        } => {
          let _ = reply.send(self.document.edit(version, &edits));
        },
        Request::Close { reply } => {
          self.document.close();
          let _ = reply.send(());
        },
      }
    }
  }

  fn snapshot(&self) -> std::result::Result<Snapshot, DocumentError> {
    if self.document.is_closed() {
      return Err(DocumentError::Closed);
    }
    Ok(Snapshot {
      text:    self.document.text().clone(),
      version: self.document.version(),
    })
  }
}
