//! Destinations for the comma separated lines produced by an acquisition run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::Error;

#[async_trait]
pub trait Sink: Send {
    /// Append one line. The line does not contain a terminator.
    async fn append(&mut self, line: &str) -> crate::Result<()>;

    async fn finish(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

/// Discards everything.
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn append(&mut self, _line: &str) -> crate::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Sink for Vec<String> {
    async fn append(&mut self, line: &str) -> crate::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Writes to a file, flushing after each line so an interrupted run keeps its data.
pub struct FileSink {
    path: PathBuf,
    file: BufWriter<File>,
}

impl FileSink {
    /// Create or truncate the file at `path`.
    pub async fn create<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(Error::storage)?;
        log::info!("Writing records to {}", path.display());
        Ok(FileSink {
            path,
            file: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn append(&mut self, line: &str) -> crate::Result<()> {
        self.file.write_all(line.as_bytes()).await.map_err(Error::storage)?;
        self.file.write_all(b"\n").await.map_err(Error::storage)?;
        self.file.flush().await.map_err(Error::storage)
    }

    async fn finish(&mut self) -> crate::Result<()> {
        self.file.flush().await.map_err(Error::storage)?;
        self.file.get_mut().sync_all().await.map_err(Error::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = FileSink::create(&path).await.unwrap();
        assert_eq!(sink.path(), path.as_path());
        sink.append("0,1.5").await.unwrap();
        // visible before the run is over
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "0,1.5\n");
        sink.append("1,NaN").await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "0,1.5\n1,NaN\n");
    }

    #[tokio::test]
    async fn file_sink_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        tokio::fs::write(&path, "old,run\n").await.unwrap();
        let mut sink = FileSink::create(&path).await.unwrap();
        sink.append("0,2").await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "0,2\n");
    }

    #[tokio::test]
    async fn file_sink_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ret = FileSink::create(dir.path().join("missing").join("out.csv")).await;
        assert!(matches!(ret, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn memory_sink() {
        let mut sink: Vec<String> = Vec::new();
        Sink::append(&mut sink, "a").await.unwrap();
        NullSink.append("b").await.unwrap();
        assert_eq!(sink, vec!["a"]);
    }
}
