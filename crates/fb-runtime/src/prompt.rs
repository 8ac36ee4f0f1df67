//! Yes/no confirmation.
//!
//! The execution loop only asks one question (whether a stale scratch file
//! may be deleted), but it does so through [`Confirm`] so that non-interactive
//! runs and tests can answer without touching stdin.

use std::io::{self, BufRead, BufReader, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How often a waiting [`CancellableStdin`] looks at its token.
const CANCEL_POLL: Duration = Duration::from_millis(100);

pub trait Confirm {
    /// Ask `question`; `Ok(true)` means yes.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

impl<C: Confirm + ?Sized> Confirm for &mut C {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        (**self).confirm(question)
    }
}

impl<C: Confirm + ?Sized> Confirm for Box<C> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        (**self).confirm(question)
    }
}

/// Always gives the same answer without blocking.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}

/// Line-oriented prompt. Blocks until the operator answers.
///
/// `yes`/`y` and `no`/`n` are accepted in any case; anything else repeats the
/// question. End of input is an error rather than an implicit "no".
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

impl LinePrompt<CancellableStdin, Stdout> {
    /// Prompt on the terminal; gives up with an error once `cancel` fires.
    pub fn stdio(cancel: CancellationToken) -> Self {
        Self::new(CancellableStdin::new(cancel), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        loop {
            write!(self.writer, "{question} (yes/no): ")?;
            self.writer.flush()?;

            let mut input = String::new();
            if self.reader.read_line(&mut input)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a yes/no answer",
                ));
            }
            match input.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" => return Ok(true),
                "no" | "n" => return Ok(false),
                _ => writeln!(self.writer, "Please answer yes or no.")?,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CancellableStdin
// ---------------------------------------------------------------------------

/// Line input read on a helper thread.
///
/// A blocking `read_line` on stdin cannot be interrupted, so the reads happen
/// elsewhere and the prompt waits on a channel instead, checking `cancel`
/// while no line has arrived. Cancellation surfaces as an
/// [`io::ErrorKind::Other`] error; `Interrupted` would be retried by
/// `read_line`. The thread starts on the first read.
pub struct CancellableStdin {
    source: Option<Box<dyn BufRead + Send>>,
    lines: Option<Receiver<io::Result<Vec<u8>>>>,
    buf: Vec<u8>,
    pos: usize,
    cancel: CancellationToken,
}

impl CancellableStdin {
    pub fn new(cancel: CancellationToken) -> Self {
        Self::from_reader(BufReader::new(io::stdin()), cancel)
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static, cancel: CancellationToken) -> Self {
        Self {
            source: Some(Box::new(reader)),
            lines: None,
            buf: Vec::new(),
            pos: 0,
            cancel,
        }
    }
}

fn spawn_line_reader(mut reader: Box<dyn BufRead + Send>) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

impl BufRead for CancellableStdin {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos < self.buf.len() {
            return Ok(&self.buf[self.pos..]);
        }
        if self.lines.is_none()
            && let Some(reader) = self.source.take()
        {
            self.lines = Some(spawn_line_reader(reader));
        }
        let Some(lines) = &self.lines else {
            return Ok(&[]);
        };

        self.buf.clear();
        self.pos = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(io::Error::other("prompt cancelled"));
            }
            match lines.recv_timeout(CANCEL_POLL) {
                Ok(line) => {
                    self.buf = line?;
                    break;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                // Reader thread finished: end of input.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

impl Read for CancellableStdin {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(input: &str) -> (io::Result<bool>, String) {
        let mut out = Vec::new();
        let answer = LinePrompt::new(input.as_bytes(), &mut out).confirm("Delete?");
        (answer, String::from_utf8(out).unwrap())
    }

    #[test]
    fn accepts_yes_forms() {
        for input in ["yes\n", "y\n", "YES\n", "  Y  \n"] {
            assert!(ask(input).0.unwrap(), "{input:?}");
        }
    }

    #[test]
    fn accepts_no_forms() {
        for input in ["no\n", "n\n", "No\n"] {
            assert!(!ask(input).0.unwrap(), "{input:?}");
        }
    }

    #[test]
    fn reprompts_on_unclear_answer() {
        let (answer, out) = ask("maybe\n\ny\n");
        assert!(answer.unwrap());
        assert_eq!(out.matches("Delete? (yes/no): ").count(), 3);
        assert_eq!(out.matches("Please answer yes or no.").count(), 2);
    }

    #[test]
    fn eof_is_an_error() {
        let (answer, _) = ask("what\n");
        assert_eq!(answer.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn fixed_answer() {
        assert!(FixedAnswer(true).confirm("q").unwrap());
        assert!(!FixedAnswer(false).confirm("q").unwrap());
    }

    #[test]
    fn mutable_reference_forwards() {
        fn ask_with<C: Confirm>(mut confirm: C) -> bool {
            confirm.confirm("q").unwrap()
        }
        let mut inner = FixedAnswer(true);
        assert!(ask_with(&mut inner));
        let boxed: Box<dyn Confirm> = Box::new(FixedAnswer(false));
        assert!(!ask_with(boxed));
    }

    /// Never yields a byte until the paired sender is dropped.
    struct StalledInput(mpsc::Receiver<()>);

    impl Read for StalledInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn threaded_input_answers_like_direct_input() {
        let input = CancellableStdin::from_reader(
            io::Cursor::new(b"maybe\nN\n".to_vec()),
            CancellationToken::new(),
        );
        let mut out = Vec::new();
        assert!(!LinePrompt::new(input, &mut out).confirm("Delete?").unwrap());
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Please answer yes or no.").count(), 1);
    }

    #[test]
    fn threaded_input_reports_eof() {
        let input =
            CancellableStdin::from_reader(io::Cursor::new(Vec::new()), CancellationToken::new());
        let err = LinePrompt::new(input, Vec::new()).confirm("Delete?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn cancellation_ends_a_waiting_prompt() {
        let (_hold, stalled) = mpsc::channel();
        let cancel = CancellationToken::new();
        let input =
            CancellableStdin::from_reader(BufReader::new(StalledInput(stalled)), cancel.clone());
        let mut prompt = LinePrompt::new(input, Vec::new());

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(150));
                cancel.cancel();
            })
        };
        let err = prompt.confirm("Delete?").unwrap_err();
        canceller.join().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(cancel.is_cancelled());
    }
}
