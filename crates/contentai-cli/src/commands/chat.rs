//! Interactive chat loop.
//!
//! Stdin lines are sent through the [`ChatController`]; streamed text is
//! printed by a separate thread that follows the event bus. Ctrl-C stops a
//! reply in progress and exits when idle.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{bail, Context, Result};
use contentai_core::event_bus::RecvError;
use contentai_core::{
    Attachment, ChatController, ChatEvent, ClientContext, Role, SessionId, StreamOutcome,
};
use tokio::sync::broadcast;

use super::render::{render_message, render_session, render_sources, role_prompt};

const HELP: &str = "\
/new            start a new chat
/switch <id>    continue another session
/sessions       list your sessions
/quit           leave";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Send(String),
    New,
    Switch(String),
    Sessions,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return ReplCommand::Send(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("new"), None) => ReplCommand::New,
            (Some("switch"), Some(id)) => ReplCommand::Switch(id.to_string()),
            (Some("sessions"), None) => ReplCommand::Sessions,
            (Some("help"), None) => ReplCommand::Help,
            (Some("quit" | "exit"), None) => ReplCommand::Quit,
            _ => ReplCommand::Unknown(trimmed.to_string()),
        }
    }
}

pub fn run(
    ctx: &ClientContext,
    session: Option<String>,
    voice: Option<String>,
    attachment_paths: &[PathBuf],
) -> Result<()> {
    let mut attachments = attachment_paths
        .iter()
        .map(|path| attachment_from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let controller = Arc::new(ctx.chat_controller());
    install_interrupt_handler(Arc::clone(&controller));
    if ctx.credentials.is_signed_in() {
        if let Err(e) = controller.load_sessions() {
            log::warn!("Could not load sessions: {}", e);
        }
    }
    if let Some(id) = session {
        switch_to(&controller, &id);
    }

    let (done_tx, done_rx) = mpsc::channel();
    spawn_printer(ctx.event_bus.subscribe(), done_tx)?;

    println!("Chatting at {}. Type /help for commands.", controller.location().path());
    let mut stdin = io::stdin().lock();
    let mut line = String::new();

    loop {
        print!("{} ", role_prompt(Role::User));
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        match ReplCommand::parse(&line) {
            ReplCommand::Send(text) => {
                let handle = controller.send_message(
                    &text,
                    std::mem::take(&mut attachments),
                    voice.clone(),
                )?;
                let Some(handle) = handle else {
                    continue;
                };

                print!("{} ", role_prompt(Role::Assistant));
                io::stdout().flush()?;
                wait_for_reply(&done_rx, &handle.message_id);

                if let Some(reply) = controller.messages().last() {
                    let sources = render_sources(reply);
                    if !sources.is_empty() {
                        println!("Sources:{sources}");
                    }
                }
            }
            ReplCommand::New => {
                controller.create_new_chat();
                println!("Started a new chat");
            }
            ReplCommand::Switch(id) => switch_to(&controller, &id),
            ReplCommand::Sessions => {
                if let Err(e) = controller.load_sessions() {
                    eprintln!("Could not load sessions: {e}");
                }
                for session in controller.sessions() {
                    println!("{}", render_session(&session));
                }
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => eprintln!("Unknown command {command}. Type /help."),
            ReplCommand::Empty => {}
        }
    }

    controller.stop_generating();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    Stopped,
    Exit,
}

/// A reply in progress is stopped; otherwise the interrupt ends the session.
fn on_interrupt(controller: &ChatController) -> InterruptAction {
    if controller.stop_generating() {
        InterruptAction::Stopped
    } else {
        InterruptAction::Exit
    }
}

fn install_interrupt_handler(controller: Arc<ChatController>) {
    let installed = ctrlc::set_handler(move || {
        if on_interrupt(&controller) == InterruptAction::Exit {
            std::process::exit(130);
        }
    });
    if let Err(e) = installed {
        log::warn!("Ctrl-C will not stop replies: {}", e);
    }
}

/// Blocks until the printer reports `message_id` as settled, or the printer
/// is gone.
fn wait_for_reply(done_rx: &mpsc::Receiver<String>, message_id: &str) {
    while let Ok(settled) = done_rx.recv() {
        if settled == message_id {
            break;
        }
    }
}

fn switch_to(controller: &ChatController, id: &str) {
    match controller.switch_session(SessionId::from(id)) {
        Ok(()) => {
            for message in controller.messages() {
                println!("{}\n", render_message(&message));
            }
        }
        Err(e) => eprintln!("Could not open {id}: {e}"),
    }
}

fn spawn_printer(
    mut events: broadcast::Receiver<ChatEvent>,
    done: mpsc::Sender<String>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("chat-printer".to_string())
        .spawn(move || loop {
            match events.blocking_recv() {
                Ok(ChatEvent::ContentDelta { delta, .. }) => {
                    print!("{delta}");
                    let _ = io::stdout().flush();
                }
                Ok(ChatEvent::StreamError { error, .. }) => eprintln!("\n[error] {error}"),
                Ok(ChatEvent::StreamFinished {
                    message_id,
                    outcome,
                }) => {
                    match outcome {
                        StreamOutcome::Completed => println!(),
                        StreamOutcome::Aborted => println!("\n[stopped]"),
                        StreamOutcome::Failed(reason) => println!("\n[failed: {reason}]"),
                    }
                    if done.send(message_id).is_err() {
                        return;
                    }
                }
                Ok(ChatEvent::LoggedOut) => {
                    eprintln!("\n[signed out: log in again to keep your history]")
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Printer fell behind, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => return,
            }
        })
        .context("Failed to start output thread")
}

/// Attachment metadata for a local file; the MIME type is guessed from the
/// extension.
fn attachment_from_path(path: &Path) -> Result<Attachment> {
    if !path.is_file() {
        bail!("Attachment not found: {}", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("Attachment path has no file name")?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(Attachment::new(name, mime.essence_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse {
        use super::*;

        #[test]
        fn plain_text_is_sent_verbatim() {
            assert_eq!(
                ReplCommand::parse("  Draft a tweet \n"),
                ReplCommand::Send("  Draft a tweet ".into())
            );
        }

        #[test]
        fn blank_line_is_empty() {
            assert_eq!(ReplCommand::parse("   \n"), ReplCommand::Empty);
        }

        #[test]
        fn commands() {
            assert_eq!(ReplCommand::parse("/new"), ReplCommand::New);
            assert_eq!(ReplCommand::parse("/sessions\n"), ReplCommand::Sessions);
            assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
            assert_eq!(
                ReplCommand::parse("/switch abc-123"),
                ReplCommand::Switch("abc-123".into())
            );
        }

        #[test]
        fn malformed_commands_are_unknown() {
            assert_eq!(
                ReplCommand::parse("/switch"),
                ReplCommand::Unknown("/switch".into())
            );
            assert_eq!(
                ReplCommand::parse("/new chat"),
                ReplCommand::Unknown("/new chat".into())
            );
        }
    }

    mod interrupt {
        use super::*;
        use contentai_core::api::{ChatRequest, ChatStream, StoredMessage};
        use contentai_core::{
            ApiError, ChatBackend, ControllerOptions, CredentialStore, EventBus, SessionSummary,
        };
        use std::io::Read;
        use std::time::Duration;

        /// A reply body that never produces data until its sender is dropped.
        struct Silent(mpsc::Receiver<()>);

        impl Read for Silent {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                let _ = self.0.recv();
                Ok(0)
            }
        }

        #[derive(Default)]
        struct SilentBackend {
            hold: std::sync::Mutex<Vec<mpsc::Sender<()>>>,
        }

        impl ChatBackend for SilentBackend {
            fn list_sessions(&self, _user_id: &str) -> Result<Vec<SessionSummary>, ApiError> {
                Ok(vec![])
            }

            fn fetch_history(&self, _session_id: &SessionId) -> Result<Vec<StoredMessage>, ApiError> {
                Ok(vec![])
            }

            fn delete_session(&self, _session_id: &SessionId) -> Result<(), ApiError> {
                Ok(())
            }

            fn open_chat_stream(&self, _request: &ChatRequest) -> Result<ChatStream, ApiError> {
                let (tx, rx) = mpsc::channel();
                self.hold.lock().unwrap().push(tx);
                Ok(Box::new(Silent(rx)))
            }
        }

        fn controller() -> Arc<ChatController> {
            Arc::new(ChatController::new(
                Arc::new(SilentBackend::default()),
                Arc::new(CredentialStore::in_memory()),
                Arc::new(EventBus::new()),
                ControllerOptions::default(),
            ))
        }

        #[test]
        fn idle_interrupt_exits() {
            assert_eq!(on_interrupt(&controller()), InterruptAction::Exit);
        }

        #[test]
        fn interrupt_stops_reply_in_progress() {
            let controller = controller();
            let handle = controller.send_message("hi", vec![], None).unwrap().unwrap();

            assert_eq!(on_interrupt(&controller), InterruptAction::Stopped);
            assert_eq!(handle.wait(), StreamOutcome::Aborted);
            assert_eq!(on_interrupt(&controller), InterruptAction::Exit);
        }

        #[test]
        fn stopping_releases_the_waiting_prompt() {
            let controller = controller();
            let (done_tx, done_rx) = mpsc::channel();
            spawn_printer(controller.event_bus().subscribe(), done_tx).unwrap();
            let handle = controller.send_message("hi", vec![], None).unwrap().unwrap();

            let (returned_tx, returned_rx) = mpsc::channel();
            let message_id = handle.message_id.clone();
            thread::spawn(move || {
                wait_for_reply(&done_rx, &message_id);
                let _ = returned_tx.send(());
            });

            assert!(returned_rx.recv_timeout(Duration::from_millis(100)).is_err());
            on_interrupt(&controller);
            returned_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("prompt still blocked after stop");
        }
    }

    mod attachments {
        use super::*;
        use tempfile::tempdir;

        #[test]
        fn guesses_mime_from_extension() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("cover.png");
            std::fs::write(&path, b"png").unwrap();

            let attachment = attachment_from_path(&path).unwrap();
            assert_eq!(attachment.name, "cover.png");
            assert_eq!(attachment.mime_type, "image/png");
        }

        #[test]
        fn unknown_extension_is_octet_stream() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("notes.zzz-unknown");
            std::fs::write(&path, b"x").unwrap();

            assert_eq!(
                attachment_from_path(&path).unwrap().mime_type,
                "application/octet-stream"
            );
        }

        #[test]
        fn missing_file_is_an_error() {
            let dir = tempdir().unwrap();
            assert!(attachment_from_path(&dir.path().join("nope.pdf")).is_err());
        }
    }
}
