//! Timed clipboard reveal.
//!
//! A reveal remembers what was on the clipboard, puts the secret there, and
//! later puts the old text back, unless the user copied something else in
//! the meantime. The countdown runs as a background task that stops as soon
//! as its cancellation token fires.

use crate::error::{Error, Result};
use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BAR_WIDTH: usize = 50;
const TICK: Duration = Duration::from_secs(1);

/// Text access to a clipboard.
pub trait Clipboard {
    fn get_text(&mut self) -> Result<String>;
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl Clipboard for SystemClipboard {
    fn get_text(&mut self) -> Result<String> {
        match self.inner.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(Error::Clipboard(e.to_string())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text)
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}

/// In-process clipboard. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Arc<Mutex<String>>,
    reject_writes: bool,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Arc::new(Mutex::new(text.to_string())),
            reject_writes: false,
        }
    }

    /// A clipboard on which every write fails.
    pub fn read_only(text: &str) -> Self {
        Self {
            reject_writes: true,
            ..Self::with_text(text)
        }
    }

    pub fn contents(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> Result<String> {
        Ok(self.contents())
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.reject_writes {
            return Err(Error::Clipboard("clipboard is read-only".to_string()));
        }
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
        Ok(())
    }
}

/// Lifecycle of one reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing,
    Finalizing,
    Done,
}

/// What the restore step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restore {
    Restored,
    Cleared,
    /// The clipboard no longer held the secret.
    LeftUntouched,
    Failed(String),
}

impl Restore {
    pub fn message(&self) -> String {
        match self {
            Restore::Restored => "Clipboard restored to previous content".to_string(),
            Restore::Cleared => "Clipboard cleared".to_string(),
            Restore::LeftUntouched => "Clipboard was changed by user - not modifying".to_string(),
            Restore::Failed(reason) => format!("Could not restore clipboard: {reason}"),
        }
    }
}

/// Put `prior` back if the clipboard still holds `secret`; otherwise leave it.
pub fn restore_clipboard<C: Clipboard + ?Sized>(
    clipboard: &mut C,
    prior: &str,
    secret: &str,
) -> Restore {
    let current = match clipboard.get_text() {
        Ok(current) => current,
        Err(e) => return Restore::Failed(e.to_string()),
    };
    if current != secret {
        return Restore::LeftUntouched;
    }

    match clipboard.set_text(prior) {
        Ok(()) if prior.is_empty() => Restore::Cleared,
        Ok(()) => Restore::Restored,
        Err(e) => Restore::Failed(e.to_string()),
    }
}

/// A single scoped reveal. Dropping it while revealing runs the restore step.
pub struct Reveal<'a, C: Clipboard + ?Sized> {
    clipboard: &'a mut C,
    state: RevealState,
    prior: String,
    secret: String,
}

impl<'a, C: Clipboard + ?Sized> Reveal<'a, C> {
    pub fn new(clipboard: &'a mut C) -> Self {
        Self {
            clipboard,
            state: RevealState::Idle,
            prior: String::new(),
            secret: String::new(),
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    /// Remember the current clipboard and replace it with `secret`.
    pub fn begin(&mut self, secret: &str) -> Result<()> {
        if self.state != RevealState::Idle {
            return Err(Error::Clipboard("reveal already started".to_string()));
        }
        self.prior = self.clipboard.get_text().unwrap_or_else(|e| {
            tracing::debug!("Could not read clipboard before reveal: {}", e);
            String::new()
        });
        self.clipboard
            .set_text(secret)
            .map_err(|e| Error::ClipboardWriteFailed(e.to_string()))?;
        self.secret = secret.to_string();
        self.state = RevealState::Revealing;
        Ok(())
    }

    /// Run the restore step. Only the first call after [`Reveal::begin`] does any work.
    pub fn finish(&mut self) -> Option<Restore> {
        if self.state != RevealState::Revealing {
            return None;
        }
        self.state = RevealState::Finalizing;
        let restore = restore_clipboard(&mut *self.clipboard, &self.prior, &self.secret);
        self.state = RevealState::Done;
        Some(restore)
    }
}

impl<C: Clipboard + ?Sized> Drop for Reveal<'_, C> {
    fn drop(&mut self) {
        if let Some(restore) = self.finish() {
            tracing::debug!("Reveal finalized on drop: {:?}", restore);
        }
    }
}

/// How the countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Elapsed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    pub finish: Finish,
    pub restore: Restore,
}

/// One frame of the countdown bar.
pub fn progress_line(total: u64, remaining: u64) -> String {
    let elapsed = total.saturating_sub(remaining);
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (elapsed as usize * BAR_WIDTH) / total as usize
    };
    format!(
        "[{}{}] {:2}s",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        remaining
    )
}

/// Draw the bar once per second. Returns `false` when cancelled early.
async fn countdown<W: Write>(seconds: u64, mut out: W, cancel: CancellationToken) -> bool {
    for remaining in (1..=seconds).rev() {
        let _ = write!(out, "\r{}", progress_line(seconds, remaining));
        let _ = out.flush();

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(TICK) => {}
        }
    }
    let _ = write!(out, "\r{}\r", " ".repeat(BAR_WIDTH + 10));
    let _ = out.flush();
    true
}

/// Copy `secret`, show a countdown, then restore the previous clipboard.
///
/// Ends on whichever comes first: the countdown running out or `interrupt`
/// resolving. Either way the restore step runs exactly once.
pub async fn copy_then_clear<C, W, F>(
    clipboard: &mut C,
    secret: &str,
    seconds: u64,
    out: W,
    interrupt: F,
) -> Result<RevealOutcome>
where
    C: Clipboard + ?Sized,
    W: Write + Send + 'static,
    F: Future<Output = ()>,
{
    let mut reveal = Reveal::new(clipboard);
    reveal.begin(secret)?;

    let cancel = CancellationToken::new();
    let mut ticker = tokio::spawn(countdown(seconds, out, cancel.clone()));
    tokio::pin!(interrupt);

    let finish = tokio::select! {
        _ = &mut ticker => Finish::Elapsed,
        _ = &mut interrupt => {
            cancel.cancel();
            let _ = ticker.await;
            Finish::Interrupted
        }
    };

    let restore = reveal.finish().unwrap_or(Restore::LeftUntouched);
    tracing::debug!("Reveal ended ({:?}): {:?}", finish, restore);
    Ok(RevealOutcome { finish, restore })
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// Once registered the handlers stay installed, so later signals are
/// swallowed instead of killing the process mid-restore.
pub async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(int), Ok(term)) => (int, term),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to register signal handlers: {}", e);
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigint.recv() => tracing::debug!("Received SIGINT"),
            _ = sigterm.recv() => tracing::debug!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[test]
    fn progress_bar_fills_as_time_passes() {
        let start = progress_line(10, 10);
        assert!(start.starts_with(&format!("[{}]", "░".repeat(BAR_WIDTH))));
        assert!(start.ends_with("10s"));

        let half = progress_line(10, 5);
        assert!(half.contains(&"█".repeat(25)));
        assert!(half.ends_with(" 5s"));
    }

    #[test]
    fn restore_puts_prior_back_only_when_secret_is_still_there() {
        let mut clip = MemoryClipboard::with_text("secret");
        assert_eq!(restore_clipboard(&mut clip, "before", "secret"), Restore::Restored);
        assert_eq!(clip.contents(), "before");

        let mut clip = MemoryClipboard::with_text("secret");
        assert_eq!(restore_clipboard(&mut clip, "", "secret"), Restore::Cleared);
        assert_eq!(clip.contents(), "");
    }

    #[test]
    fn restore_is_a_no_op_after_user_copies_something_else() {
        let mut clip = MemoryClipboard::with_text("user text");
        for _ in 0..2 {
            assert_eq!(
                restore_clipboard(&mut clip, "before", "secret"),
                Restore::LeftUntouched
            );
            assert_eq!(clip.contents(), "user text");
        }
    }

    #[test]
    fn dropping_an_active_reveal_restores() {
        let mut clip = MemoryClipboard::with_text("before");
        let observer = clip.clone();
        {
            let mut reveal = Reveal::new(&mut clip);
            reveal.begin("secret").unwrap();
            assert_eq!(reveal.state(), RevealState::Revealing);
            assert_eq!(observer.contents(), "secret");
        }
        assert_eq!(observer.contents(), "before");
    }

    #[test]
    fn finish_runs_once() {
        let mut clip = MemoryClipboard::with_text("before");
        let mut reveal = Reveal::new(&mut clip);
        reveal.begin("secret").unwrap();
        assert_eq!(reveal.finish(), Some(Restore::Restored));
        assert_eq!(reveal.state(), RevealState::Done);
        assert_eq!(reveal.finish(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_elapses_then_restores() {
        let mut clip = MemoryClipboard::with_text("before");
        let observer = clip.clone();

        let outcome = copy_then_clear(&mut clip, "secret", 3, std::io::sink(), pending())
            .await
            .unwrap();

        assert_eq!(outcome.finish, Finish::Elapsed);
        assert_eq!(outcome.restore, Restore::Restored);
        assert_eq!(observer.contents(), "before");
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_restores_immediately() {
        let mut clip = MemoryClipboard::with_text("");
        let started = tokio::time::Instant::now();

        let outcome = copy_then_clear(
            &mut clip,
            "secret",
            30,
            std::io::sink(),
            tokio::time::sleep(Duration::from_secs(2)),
        )
        .await
        .unwrap();

        assert_eq!(outcome.finish, Finish::Interrupted);
        assert_eq!(outcome.restore, Restore::Cleared);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(clip.contents(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn user_change_during_reveal_is_kept() {
        let mut clip = MemoryClipboard::with_text("before");
        let mut user = clip.clone();
        let user_copies = async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            user.set_text("mine").unwrap();
            pending::<()>().await;
        };

        let outcome = copy_then_clear(&mut clip, "secret", 2, std::io::sink(), user_copies)
            .await
            .unwrap();

        assert_eq!(outcome.finish, Finish::Elapsed);
        assert_eq!(outcome.restore, Restore::LeftUntouched);
        assert_eq!(clip.contents(), "mine");
    }

    #[tokio::test]
    async fn write_failure_changes_nothing() {
        let mut clip = MemoryClipboard::read_only("before");
        let err = copy_then_clear(&mut clip, "secret", 1, std::io::sink(), pending())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ClipboardWriteFailed(_)));
        assert_eq!(clip.contents(), "before");
    }
}
