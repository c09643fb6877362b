pub mod telegram;

pub use telegram::TelegramChannel;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::render::ChartImage;

/// Destination for report messages. Messages are sent immediately and in
/// call order.
#[allow(async_fn_in_trait)]
pub trait Channel {
    async fn send_text(&self, body: &str) -> Result<()>;

    async fn send_image(&self, image: &ChartImage, caption: Option<&str>) -> Result<()>;
}

/// A message as a channel received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Text(String),
    Image {
        file_name: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

impl Delivered {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Delivered::Text(body) => Some(body),
            Delivered::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Delivered::Image { .. })
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<Delivered>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Delivered> {
        self.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|m| m.as_text().map(str::to_string))
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.lock().iter().filter(|m| m.is_image()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delivered>> {
        // A poisoned lock only means a test panicked mid-push.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Channel for RecordingChannel {
    async fn send_text(&self, body: &str) -> Result<()> {
        self.lock().push(Delivered::Text(body.to_string()));
        Ok(())
    }

    async fn send_image(&self, image: &ChartImage, caption: Option<&str>) -> Result<()> {
        self.lock().push(Delivered::Image {
            file_name: image.file_name.clone(),
            bytes: image.bytes.clone(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }
}

/// Writes each message as a numbered file: `001.txt`, `002-trends.png`, ...
/// An image caption goes to a `.txt` file next to the image.
#[derive(Debug)]
pub struct DirectoryChannel {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl DirectoryChannel {
    /// Create the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Delivery(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self, suffix: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.dir.join(format!("{n:03}{suffix}"))
    }
}

impl Channel for DirectoryChannel {
    async fn send_text(&self, body: &str) -> Result<()> {
        let path = self.next_path(".txt");
        tokio::fs::write(&path, body).await?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }

    async fn send_image(&self, image: &ChartImage, caption: Option<&str>) -> Result<()> {
        let path = self.next_path(&format!("-{}", image.file_name));
        tokio::fs::write(&path, &image.bytes).await?;
        if let Some(caption) = caption {
            tokio::fs::write(path.with_extension("txt"), caption).await?;
        }
        log::info!("Wrote {} ({} bytes)", path.display(), image.bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ChartImage {
        ChartImage {
            file_name: "chart.png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_recording_channel_keeps_order() {
        let channel = RecordingChannel::new();
        channel.send_text("caption").await.unwrap();
        channel.send_image(&image(), None).await.unwrap();
        channel.send_text("after").await.unwrap();

        let messages = channel.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Delivered::Text("caption".into()));
        assert!(messages[1].is_image());
        assert_eq!(channel.texts(), vec!["caption", "after"]);
        assert_eq!(channel.image_count(), 1);
    }

    #[tokio::test]
    async fn test_directory_channel_numbers_files() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("preview");
        let channel = DirectoryChannel::create(&out).unwrap();

        channel.send_text("hello").await.unwrap();
        channel.send_image(&image(), Some("caption")).await.unwrap();

        assert_eq!(std::fs::read_to_string(out.join("001.txt")).unwrap(), "hello");
        assert_eq!(
            std::fs::read(out.join("002-chart.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
        assert_eq!(
            std::fs::read_to_string(out.join("002-chart.txt")).unwrap(),
            "caption"
        );
    }
}
