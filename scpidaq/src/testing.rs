//! Simulated instruments for tests. They sit on the far end of a `tokio::io::duplex` pipe,
//! record every command line and answer queries from a script.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

type Generator = Box<dyn FnMut(u64) -> String + Send>;

#[derive(Default)]
pub(crate) struct Replies {
    fixed: HashMap<String, String>,
    reads: VecDeque<String>,
    generator: Option<Generator>,
    count: u64,
}

impl Replies {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    /// Always answer `cmd` with `reply`.
    pub(crate) fn on(mut self, cmd: &str, reply: &str) -> Self {
        self.fixed.insert(cmd.to_string(), reply.to_string());
        self
    }

    /// Answer the next `READ?` with `reply`, which may contain several lines.
    pub(crate) fn read(mut self, reply: &str) -> Self {
        self.reads.push_back(reply.to_string());
        self
    }

    /// Answer `READ?` with the output of `f(n)` once the scripted replies are used up,
    /// where `n` counts the generated replies.
    pub(crate) fn generate<F: FnMut(u64) -> String + Send + 'static>(mut self, f: F) -> Self {
        self.generator = Some(Box::new(f));
        self
    }

    fn reply(&mut self, cmd: &str) -> Option<String> {
        if let Some(x) = self.fixed.get(cmd) {
            return Some(x.clone());
        }
        if cmd != "READ?" {
            return None;
        }
        if let Some(x) = self.reads.pop_front() {
            return Some(x);
        }
        let count = self.count;
        let ret = self.generator.as_mut().map(|f| f(count));
        self.count += 1;
        ret
    }
}

#[derive(Clone, Default)]
pub(crate) struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    pub(crate) fn commands(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, cmd: String) {
        self.0.lock().unwrap().push(cmd);
    }
}

pub(crate) fn simulate(mut replies: Replies) -> (DuplexStream, CommandLog) {
    let (local, remote) = duplex(4096);
    let log = CommandLog::default();
    let ret = log.clone();
    tokio::spawn(async move {
        let (rd, mut wr) = split(remote);
        let mut rd = BufReader::new(rd);
        let mut line = String::new();
        loop {
            line.clear();
            match rd.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let cmd = line.trim_end().to_string();
            let reply = replies.reply(&cmd);
            log.push(cmd);
            if let Some(reply) = reply {
                if wr.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        }
    });
    (local, ret)
}

/// Let every other task run until the runtime is idle. Only meaningful with a paused clock.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
