//! Session management
//!
//! A [`Session`] owns one [`Terminal`] behind a mutex and a background
//! thread that decodes the input source into it. The UI side reads
//! [`Notification`]s from a small bounded queue and calls `draw`, `resize`
//! and `write` concurrently with decoding.

use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::term::{
    CursorInfo, Decoder, Modes, Sequence, Surface, TermEvent, Terminal, TerminalOptions,
};
use crate::ui::keymapper::{KeyInput, KeyMapper};
use crate::ui::mouse::{self, MouseInput};

/// Depth of the notification queue
const NOTIFY_DEPTH: usize = 2;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to spawn decode thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Failed to write to output: {0}")]
    Write(#[source] io::Error),

    #[error("Session is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Session events for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Screen changed since the last draw
    Redraw,
    /// Input ended or an output write failed
    Closed,
    TitleChanged(String),
    Bell,
    MouseModeChanged(Modes),
    /// Internal fault while applying input; carries cursor and margin state
    Fatal(String),
}

impl From<TermEvent> for Notification {
    fn from(event: TermEvent) -> Self {
        match event {
            TermEvent::TitleChanged(title) => Notification::TitleChanged(title),
            TermEvent::Bell => Notification::Bell,
            TermEvent::MouseModeChanged(modes) => Notification::MouseModeChanged(modes),
        }
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// How the decode thread feeds one sequence to the engine
type ApplyFn = fn(&mut Terminal, &Sequence);

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A terminal session fed from a byte source
pub struct Session {
    pub id: u64,
    term: Arc<Mutex<Terminal>>,
    output: Sink,
    notifications: Receiver<Notification>,
    closed: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Start decoding `source` on a background thread. Replies and encoded
    /// input go to `sink`.
    pub fn spawn<R, W>(
        id: u64,
        source: R,
        sink: W,
        cols: u16,
        rows: u16,
        options: TerminalOptions,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::spawn_with(id, source, sink, cols, rows, options, Terminal::apply)
    }

    fn spawn_with<R, W>(
        id: u64,
        source: R,
        sink: W,
        cols: u16,
        rows: u16,
        options: TerminalOptions,
        apply: ApplyFn,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let term = Arc::new(Mutex::new(Terminal::with_options(cols, rows, options)));
        let output: Sink = Arc::new(Mutex::new(Box::new(sink)));
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel(NOTIFY_DEPTH);

        let worker = Worker {
            id,
            term: term.clone(),
            output: output.clone(),
            closed: closed.clone(),
            tx,
            apply,
        };
        let reader_thread = thread::Builder::new()
            .name(format!("muxterm-decode-{}", id))
            .spawn(move || worker.run(source))
            .map_err(SessionError::Spawn)?;

        info!("Session {} started ({}x{})", id, cols, rows);
        Ok(Self {
            id,
            term,
            output,
            notifications: rx,
            closed,
            reader_thread: Some(reader_thread),
        })
    }

    /// Notification queue. Drain it promptly; the decode thread blocks
    /// while it is full.
    pub fn notifications(&self) -> &Receiver<Notification> {
        &self.notifications
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        lock(&self.term).draw(surface);
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        lock(&self.term).resize(cols, rows);
    }

    pub fn cursor(&self) -> CursorInfo {
        lock(&self.term).cursor()
    }

    pub fn modes(&self) -> Modes {
        lock(&self.term).modes()
    }

    pub fn title(&self) -> String {
        lock(&self.term).title().to_string()
    }

    pub fn text(&self) -> String {
        lock(&self.term).text()
    }

    /// Run `f` with the engine locked
    pub fn with_terminal<T>(&self, f: impl FnOnce(&mut Terminal) -> T) -> T {
        f(&mut lock(&self.term))
    }

    /// Send encoded input to the sink
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let mut out = lock(&self.output);
        out.write_all(bytes)
            .and_then(|_| out.flush())
            .map_err(SessionError::Write)
    }

    /// Encode a key press for the current modes and send it. Keys with no
    /// encoding are dropped.
    pub fn send_key(&self, input: &KeyInput) -> Result<()> {
        match KeyMapper::map(input, self.modes()) {
            Some(bytes) => self.write(&bytes),
            None => Ok(()),
        }
    }

    /// Encode a mouse event if the application tracks the mouse
    pub fn send_mouse(&self, input: &MouseInput) -> Result<()> {
        match mouse::encode(input, self.modes()) {
            Some(bytes) => self.write(&bytes),
            None => Ok(()),
        }
    }

    /// Send pasted text, bracketed if the application asked for it
    pub fn paste(&self, text: &str) -> Result<()> {
        let bytes = lock(&self.term).paste_bytes(text);
        self.write(&bytes)
    }

    pub fn scroll_view_up(&self, n: usize) {
        lock(&self.term).scroll_view_up(n);
    }

    pub fn scroll_view_down(&self, n: usize) {
        lock(&self.term).scroll_view_down(n);
    }

    pub fn scroll_view_reset(&self) {
        lock(&self.term).scroll_view_reset();
    }

    pub fn is_scrolling(&self) -> bool {
        lock(&self.term).is_scrolling()
    }

    /// Wait for the decode thread to finish
    pub fn wait(mut self) {
        if let Some(handle) = self.reader_thread.take() {
            if handle.join().is_err() {
                warn!("Session {} decode thread panicked", self.id);
            }
        }
    }
}

enum Stop {
    Fatal(String),
    Output(io::Error),
}

/// Decode-side half of a session
struct Worker {
    id: u64,
    term: Arc<Mutex<Terminal>>,
    output: Sink,
    closed: Arc<AtomicBool>,
    tx: SyncSender<Notification>,
    apply: ApplyFn,
}

impl Worker {
    fn run<R: Read>(self, source: R) {
        for seq in Decoder::new(source) {
            if seq == Sequence::Eof {
                debug!("Session {} input ended", self.id);
                self.close(Notification::Closed);
                return;
            }
            match self.step(&seq) {
                Ok(notes) => {
                    for note in notes {
                        if self.tx.send(note).is_err() {
                            debug!("Session {} receiver dropped", self.id);
                            return;
                        }
                    }
                }
                Err(Stop::Fatal(diag)) => {
                    error!("Session {} fault: {}", self.id, diag);
                    self.close(Notification::Fatal(diag));
                    return;
                }
                Err(Stop::Output(e)) => {
                    warn!("Session {} output failed: {}", self.id, e);
                    self.close(Notification::Closed);
                    return;
                }
            }
        }
    }

    /// Apply one sequence and flush its replies
    fn step(&self, seq: &Sequence) -> std::result::Result<Vec<Notification>, Stop> {
        let mut term = lock(&self.term);
        if panic::catch_unwind(AssertUnwindSafe(|| (self.apply)(&mut *term, seq))).is_err() {
            let diag = format!("{} while applying {:?}", term.diagnostics(), seq);
            self.closed.store(true, Ordering::SeqCst);
            return Err(Stop::Fatal(diag));
        }
        let responses = term.take_responses();
        let mut notes: Vec<Notification> = term.take_events().into_iter().map(Into::into).collect();
        if term.take_redraw() {
            notes.push(Notification::Redraw);
        }
        drop(term);

        if !responses.is_empty() {
            let mut out = lock(&self.output);
            for response in &responses {
                out.write_all(&response.to_bytes()).map_err(Stop::Output)?;
            }
            out.flush().map_err(Stop::Output)?;
        }
        Ok(notes)
    }

    /// Mark closed under the engine lock, then notify
    fn close(&self, note: Notification) {
        {
            let _term = lock(&self.term);
            self.closed.store(true, Ordering::SeqCst);
        }
        let _ = self.tx.send(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn spawn(input: &'static [u8], sink: impl Write + Send + 'static) -> Session {
        Session::spawn(1, Cursor::new(input), sink, 10, 3, TerminalOptions::default()).unwrap()
    }

    fn drain(session: &Session) -> Vec<Notification> {
        let mut notes = Vec::new();
        while let Ok(note) = session.notifications().recv() {
            let done = matches!(note, Notification::Closed | Notification::Fatal(_));
            notes.push(note);
            if done {
                break;
            }
        }
        notes
    }

    #[test]
    fn test_decodes_and_replies() {
        let sink = SharedBuf::default();
        let session = spawn(b"hello\x1b[6n", sink.clone());
        let notes = drain(&session);

        assert_eq!(notes, vec![Notification::Redraw, Notification::Closed]);
        assert!(session.is_closed());
        assert!(session.text().starts_with("hello"));
        assert_eq!(sink.0.lock().unwrap().as_slice(), b"\x1b[1;6R");
    }

    #[test]
    fn test_title_notification() {
        let session = spawn(b"\x1b]2;build\x07", SharedBuf::default());
        assert_eq!(
            drain(&session),
            vec![Notification::TitleChanged("build".into()), Notification::Closed]
        );
        assert_eq!(session.title(), "build");
    }

    #[test]
    fn test_mouse_mode_notification() {
        let session = spawn(b"\x1b[?1002h", SharedBuf::default());
        assert_eq!(
            drain(&session),
            vec![
                Notification::MouseModeChanged(Modes::MOUSE_DRAG),
                Notification::Redraw,
                Notification::Closed
            ]
        );
    }

    #[test]
    fn test_output_failure_closes() {
        let session = spawn(b"\x1b[6nabc", BrokenPipe);
        assert_eq!(drain(&session), vec![Notification::Closed]);
        assert!(session.is_closed());
        assert!(matches!(session.write(b"x"), Err(SessionError::Closed)));
    }

    /// Reader that blocks until the test drops the sender
    struct Pending(mpsc::Receiver<Vec<u8>>);

    impl Read for Pending {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn test_send_key_follows_modes() {
        use crate::ui::keymapper::{Key, Modifiers};

        let (feed, rx) = mpsc::channel();
        let sink = SharedBuf::default();
        let session =
            Session::spawn(2, Pending(rx), sink.clone(), 10, 3, TerminalOptions::default()).unwrap();

        let up = KeyInput::new(Key::Up, Modifiers::empty());
        session.send_key(&up).unwrap();
        feed.send(b"\x1b[?1h".to_vec()).unwrap();
        assert_eq!(session.notifications().recv().unwrap(), Notification::Redraw);
        session.send_key(&up).unwrap();

        let click = MouseInput::new(mouse::MouseAction::Press(mouse::MouseButton::Left), 0, 0);
        session.send_mouse(&click).unwrap();

        assert_eq!(sink.0.lock().unwrap().as_slice(), b"\x1b[A\x1bOA");
        drop(feed);
        assert_eq!(drain(&session), vec![Notification::Closed]);
    }

    fn apply_until_bang(term: &mut Terminal, seq: &Sequence) {
        if *seq == Sequence::Print('!') {
            panic!("engine fault");
        }
        term.apply(seq);
    }

    #[test]
    fn test_engine_panic_is_fatal() {
        let faulty = Session::spawn_with(
            3,
            Cursor::new(&b"\x1b[2;3rab!cd"[..]),
            SharedBuf::default(),
            10,
            3,
            TerminalOptions::default(),
            apply_until_bang,
        )
        .unwrap();

        let notes = drain(&faulty);
        let Some(Notification::Fatal(diag)) = notes.last() else {
            panic!("expected a fault, got {:?}", notes);
        };
        assert!(diag.contains("cursor=(0,2)"), "{}", diag);
        assert!(diag.contains("margins=(1,2)"), "{}", diag);
        assert!(diag.contains("Print('!')"), "{}", diag);
        assert!(faulty.is_closed());
        assert!(matches!(faulty.write(b"x"), Err(SessionError::Closed)));
        // The engine stays usable after the fault
        assert!(faulty.text().starts_with("ab "));

        let healthy = spawn(b"ok", SharedBuf::default());
        assert_eq!(drain(&healthy), vec![Notification::Redraw, Notification::Closed]);
        assert!(healthy.text().starts_with("ok"));
        assert!(!faulty.text().contains("cd"));
    }

    #[test]
    fn test_paste_and_write() {
        let sink = SharedBuf::default();
        let session = spawn(b"\x1b[?2004h", sink.clone());
        drain(&session);
        // Closed sessions refuse input, so check the encoding directly
        let bytes = session.with_terminal(|t| t.paste_bytes("hi"));
        assert_eq!(bytes, b"\x1b[200~hi\x1b[201~");
    }
}
