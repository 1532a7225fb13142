//! services/client/src/bin/assistant.rs

use campus_assistant_core::domain::SessionStatus;
use campus_assistant_core::ports::{BackendService, PreferenceStore, KEY_AUTH_TOKEN};
use campus_assistant_core::quiz::{letter_for, parse_quiz_payload, OptionMark, QuizGrader};
use campus_assistant_core::PortError;
use client_lib::{
    adapters::{HttpBackendAdapter, JsonFileStore},
    app::{ChatEvent, ChatSession, SessionGate, WorkspaceState},
    config::Config,
    error::ClientError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Backend at {}.", config.backend_url);

    // --- 2. Open the Preference Store ---
    let store = Arc::new(JsonFileStore::open(&config.state_path)?);

    // --- 3. Initialize the Backend Adapter ---
    let backend: Arc<dyn BackendService> = Arc::new(HttpBackendAdapter::new(
        reqwest::Client::new(),
        config.backend_url.clone(),
        store.clone(),
    ));

    // --- 4. Wire the Credential-Change Observer ---
    let (credential_tx, mut credential_rx) = mpsc::unbounded_channel();
    store.subscribe(Box::new(move |key| {
        if key == KEY_AUTH_TOKEN {
            let _ = credential_tx.send(());
        }
    }));

    // --- 5. Build the Workspace Components ---
    let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
    let mut app = App {
        gate: SessionGate::new(backend.clone(), store.clone()),
        workspace: WorkspaceState::new(backend.clone(), store.clone()),
        chat: ChatSession::new(
            backend.clone(),
            chat_tx,
            config.answer_top_k,
            config.summary_top_k,
        ),
        quiz: None,
        backend,
        config,
    };
    app.gate.initialize().await;
    app.print_status();
    println!("Type 'help' for commands.");

    // --- 6. Run the Terminal Loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut store_poll = tokio::time::interval(Duration::from_secs(2));
    store_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !app.handle_command(line.trim()).await {
                    break;
                }
            }
            Some(event) = chat_rx.recv() => render_chat_event(event),
            Some(()) = credential_rx.recv() => {
                app.gate.on_external_credential_change().await;
                app.print_status();
            }
            _ = store_poll.tick() => {
                // Surfaces sibling-context writes to the observer above.
                if let Err(e) = store.refresh() {
                    warn!("Preference refresh failed: {e}");
                }
            }
        }
    }

    app.chat.close();
    Ok(())
}

fn render_chat_event(event: ChatEvent) {
    match event {
        ChatEvent::Answered(message) => {
            println!("\nassistant> {}", message.content);
            for quote in &message.quotes {
                println!("  quote [{}]: \"{}\"", quote.source_index, quote.text);
            }
            for source in &message.sources {
                println!(
                    "  source [{}]: {} (page {})",
                    source.source_index,
                    source.title.as_deref().unwrap_or("untitled"),
                    source.page.map_or("?".to_string(), |p| p.to_string()),
                );
            }
            for suggestion in &message.suggestions {
                println!("  study: {suggestion}");
            }
        }
        ChatEvent::Failed { message } => println!("\nrequest failed: {message}"),
    }
}

struct App {
    gate: SessionGate,
    workspace: WorkspaceState,
    chat: ChatSession,
    quiz: Option<QuizGrader>,
    backend: Arc<dyn BackendService>,
    config: Arc<Config>,
}

impl App {
    fn print_status(&self) {
        match self.gate.status() {
            SessionStatus::Authenticated(user) => println!(
                "Logged in as {}.",
                user.email.as_deref().or(user.name.as_deref()).unwrap_or("unknown")
            ),
            SessionStatus::Validating => println!("Validating session..."),
            SessionStatus::Unauthenticated => println!("Not logged in."),
        }
    }

    /// Dispatches one command line. Returns false when the loop should end.
    async fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return true;
        };
        let rest: Vec<&str> = parts.collect();

        match command {
            "quit" | "exit" => return false,
            "help" => print_help(),
            "status" => self.print_status(),
            "login" => match rest.as_slice() {
                [email, password] => {
                    match self.gate.login(email, password).await {
                        Ok(()) => {}
                        Err(e) => println!("Login failed: {e}"),
                    }
                    self.print_status();
                }
                _ => println!("usage: login <email> <password>"),
            },
            "register" => match rest.as_slice() {
                [name, email, password] => {
                    match self.gate.register(name, email, password).await {
                        Ok(()) => {}
                        Err(e) => println!("Registration failed: {e}"),
                    }
                    self.print_status();
                }
                _ => println!("usage: register <name> <email> <password>"),
            },
            "logout" => {
                self.gate.logout().await;
                self.print_status();
            }
            _ if !self.gate.status().is_authenticated() => {
                println!("Please log in first.");
            }
            "docs" => match self.workspace.refresh().await {
                Ok(()) => {
                    for doc in self.workspace.documents() {
                        let marker = if Some(doc.id.as_str()) == self.workspace.selected_id() {
                            "*"
                        } else {
                            " "
                        };
                        println!(
                            "{marker} {}  {} ({} pages)",
                            doc.id,
                            doc.title.as_deref().unwrap_or("untitled"),
                            doc.page_count.map_or("?".to_string(), |p| p.to_string()),
                        );
                    }
                    println!("reload token: {}", self.workspace.reload_token());
                }
                Err(e) => println!("Listing failed: {e}"),
            },
            "upload" => match rest.as_slice() {
                [path, title @ ..] => {
                    let title = if title.is_empty() {
                        None
                    } else {
                        Some(title.join(" "))
                    };
                    match tokio::fs::read(path).await {
                        Ok(bytes) => {
                            let filename = path.rsplit('/').next().unwrap_or(path);
                            match self
                                .workspace
                                .upload(filename, bytes, title.as_deref())
                                .await
                            {
                                Ok(()) => println!("Uploaded {filename}."),
                                Err(e) => println!("Upload failed: {e}"),
                            }
                        }
                        Err(e) => println!("Could not read {path}: {e}"),
                    }
                }
                _ => println!("usage: upload <path> [title...]"),
            },
            "delete" => match rest.as_slice() {
                [id] => {
                    if let Err(e) = self.workspace.delete(id).await {
                        println!("Backend delete failed ({e}); removed locally.");
                    }
                }
                _ => println!("usage: delete <doc-id>"),
            },
            "select" => match rest.as_slice() {
                [id] => self.workspace.select_document(id),
                _ => println!("usage: select <doc-id>"),
            },
            "unselect" => self.workspace.clear_selection(),
            "ask" => {
                if rest.is_empty() {
                    println!("usage: ask <question...>");
                } else {
                    let _ = self.chat.ask(&rest.join(" "), "short").await;
                }
            }
            "summarize" => {
                if rest.is_empty() {
                    println!("usage: summarize <topic...>");
                } else {
                    let _ = self.chat.summarize(&rest.join(" "), "short");
                }
            }
            "chat" => {
                for message in self.chat.messages().await {
                    let who = match message.role {
                        campus_assistant_core::domain::Role::User => "you",
                        campus_assistant_core::domain::Role::Assistant => "assistant",
                    };
                    println!("{who}> {}", message.content);
                }
            }
            "quiz" => {
                if rest.is_empty() {
                    println!("usage: quiz <topic...>");
                } else {
                    self.generate_quiz(&rest.join(" ")).await;
                }
            }
            "pick" => match rest.as_slice() {
                [question, letter] => self.pick(question, letter),
                _ => println!("usage: pick <question-number> <letter>"),
            },
            "submit" => self.submit_quiz(),
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
        true
    }

    async fn generate_quiz(&mut self, topic: &str) {
        let payload = match self
            .backend
            .generate_quiz(topic, "mcq", self.config.quiz_count, self.config.summary_top_k)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                println!("Quiz generation failed: {e}");
                return;
            }
        };

        // An unparseable payload leaves any previous attempt untouched.
        match parse_quiz_payload(&payload) {
            Ok(questions) if questions.is_empty() => {
                println!("The quiz came back empty; try a broader topic.");
            }
            Ok(questions) => {
                self.quiz = Some(QuizGrader::new(questions));
                self.render_quiz();
            }
            Err(PortError::Malformed(_)) => {
                println!("The quiz came back in an invalid format.");
            }
            Err(e) => println!("Quiz generation failed: {e}"),
        }
    }

    fn pick(&mut self, question: &str, letter: &str) {
        let Some(quiz) = self.quiz.as_mut() else {
            println!("No quiz open. Generate one with 'quiz <topic>'.");
            return;
        };
        let (Ok(number), Some(letter)) = (question.parse::<usize>(), letter.chars().next())
        else {
            println!("usage: pick <question-number> <letter>");
            return;
        };
        if number == 0 || !letter.is_ascii_alphabetic() {
            println!("usage: pick <question-number> <letter>");
            return;
        }
        let option = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
        quiz.select(number - 1, option);
        println!("{} unanswered.", quiz.unanswered_count());
    }

    fn submit_quiz(&mut self) {
        let Some(quiz) = self.quiz.as_mut() else {
            println!("No quiz open.");
            return;
        };
        if quiz.questions().is_empty() {
            println!("Nothing to submit.");
            return;
        }
        quiz.submit();
        self.render_quiz();
        if let Some(quiz) = &self.quiz {
            if let Some(score) = quiz.score() {
                println!("Score: {score}/{}", quiz.questions().len());
            }
        }
    }

    fn render_quiz(&self) {
        let Some(quiz) = &self.quiz else { return };
        for (qi, question) in quiz.questions().iter().enumerate() {
            println!("{}. {}", qi + 1, question.question);
            for (oi, option) in question.options.iter().enumerate() {
                let letter = letter_for(oi).unwrap_or('?');
                let mark = match quiz.option_mark(qi, oi) {
                    OptionMark::Selected => ">",
                    OptionMark::Unselected | OptionMark::Neither => " ",
                    OptionMark::MatchedCorrect => "+",
                    OptionMark::SelectedWrong => "x",
                };
                println!("  {mark} {letter}) {option}");
            }
            if let Some(explanation) = quiz.explanation(qi) {
                println!("  explanation: {explanation}");
            }
        }
    }
}

fn print_help() {
    println!(
        "commands:\n  \
         login <email> <password> | register <name> <email> <password> | logout | status\n  \
         docs | upload <path> [title] | delete <id> | select <id> | unselect\n  \
         ask <question> | summarize <topic> | chat\n  \
         quiz <topic> | pick <n> <letter> | submit\n  \
         quit"
    );
}
