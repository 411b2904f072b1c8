use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Unbounded FIFO of output lines for one project. Background units push through
/// [LineSender]s; the UI loop drains it with [OutputChannel::try_pop].
pub struct OutputChannel {
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

/// The producer half handed to background units.
#[derive(Clone)]
pub struct LineSender {
    tx: UnboundedSender<String>,
}

impl OutputChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> LineSender {
        LineSender {
            tx: self.tx.clone(),
        }
    }

    /// Never blocks; `None` means nothing arrived since the last pop.
    pub fn try_pop(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(line) => Some(line),
            // The channel owns a sender itself, so it cannot be disconnected.
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSender {
    pub fn push(&self, line: impl Into<String>) {
        // Only fails once the channel is gone, and then nobody is left to read the line.
        let _ = self.tx.send(line.into());
    }
}

#[cfg(test)]
mod test {
    use super::OutputChannel;
    use std::thread;

    #[test]
    fn empty_channel_pops_nothing() {
        let mut channel = OutputChannel::new();
        assert_eq!(channel.try_pop(), None);
    }

    #[test]
    fn lines_come_out_in_push_order() {
        let mut channel = OutputChannel::new();
        let sender = channel.sender();
        sender.push("first");
        sender.push(String::from("second"));
        assert_eq!(channel.try_pop().as_deref(), Some("first"));
        assert_eq!(channel.try_pop().as_deref(), Some("second"));
        assert_eq!(channel.try_pop(), None);
    }

    #[test]
    fn pushes_from_another_thread() {
        let mut channel = OutputChannel::new();
        let sender = channel.sender();
        thread::spawn(move || {
            for i in 0..100 {
                sender.push(format!("line {i}"));
            }
        })
        .join()
        .unwrap();
        let drained: Vec<String> = std::iter::from_fn(|| channel.try_pop()).collect();
        assert_eq!(drained.len(), 100);
        assert_eq!(drained[0], "line 0");
        assert_eq!(drained[99], "line 99");
    }
}
