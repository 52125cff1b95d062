//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::config::{ChatConfig, OutputConfig};
use crate::output::console::ConsoleFormatter;
use crate::output::formatter::OutputFormatter;
use crate::progress::reporter::ProgressReporter;
use consensus_application::{
    LlmTransport, NoProgress, PipelineConfig, RunConsensusInput, RunConsensusUseCase,
};
use consensus_domain::Query;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// What the loop does after a line
enum Flow {
    Continue,
    Answered,
    /// Empty input: end the session
    Stop,
    /// `/quit`: already said goodbye
    Quit,
}

/// Interactive chat REPL
pub struct ChatRepl<T: LlmTransport + 'static> {
    use_case: RunConsensusUseCase<T>,
    pipeline: PipelineConfig,
    output: OutputConfig,
    chat: ChatConfig,
}

impl<T: LlmTransport + 'static> ChatRepl<T> {
    /// Create a new ChatRepl
    pub fn new(transport: Arc<T>, pipeline: PipelineConfig) -> Self {
        Self {
            use_case: RunConsensusUseCase::new(transport),
            pipeline,
            output: OutputConfig::default(),
            chat: ChatConfig::default(),
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    /// Run the interactive REPL on the terminal.
    ///
    /// History lives only for the session. Ctrl-C clears the current line;
    /// Ctrl-D ends the session.
    pub async fn run(&self) -> rustyline::Result<usize> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = io::stdout();
        let mut answered = 0;

        self.print_welcome(&mut stdout)?;

        while answered < self.chat.max_iterations {
            match rl.readline(">>> ") {
                Ok(line) => {
                    let entry = line.trim();
                    if !entry.is_empty() && !entry.starts_with('/') {
                        let _ = rl.add_history_entry(entry);
                    }
                    match self.handle_line(&line, &mut stdout).await? {
                        Flow::Continue => {}
                        Flow::Answered => answered += 1,
                        Flow::Stop => break,
                        Flow::Quit => return Ok(answered),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        self.print_farewell(answered, &mut stdout)?;
        Ok(answered)
    }

    /// Run the REPL over arbitrary streams.
    ///
    /// Ends on empty input, end of input, `/quit`, or once
    /// `max_iterations` questions have been answered. Returns the number of
    /// questions answered.
    pub async fn run_with<R, W>(&self, reader: R, out: &mut W) -> io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = reader.lines();
        let mut answered = 0;

        self.print_welcome(out)?;

        while answered < self.chat.max_iterations {
            write!(out, ">>> ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };
            match self.handle_line(&line, out).await? {
                Flow::Continue => {}
                Flow::Answered => answered += 1,
                Flow::Stop => break,
                Flow::Quit => return Ok(answered),
            }
        }

        self.print_farewell(answered, out)?;
        Ok(answered)
    }

    async fn handle_line<W: Write>(&self, line: &str, out: &mut W) -> io::Result<Flow> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(Flow::Stop);
        }

        if line.starts_with('/') {
            let quit = self.handle_command(line, out)?;
            return Ok(if quit { Flow::Quit } else { Flow::Continue });
        }

        self.process_question(line, out).await?;
        Ok(Flow::Answered)
    }

    fn print_farewell<W: Write>(&self, answered: usize, out: &mut W) -> io::Result<()> {
        if answered >= self.chat.max_iterations {
            writeln!(
                out,
                "Reached the limit of {} questions for this session.",
                self.chat.max_iterations
            )?;
        }
        writeln!(out, "Bye!")
    }

    fn print_welcome<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "╭─────────────────────────────────────────────╮")?;
        writeln!(out, "│        Expert Consensus - Chat Mode         │")?;
        writeln!(out, "╰─────────────────────────────────────────────╯")?;
        writeln!(out)?;
        writeln!(out, "Experts: {}", self.pipeline.roster.names().join(", "))?;
        writeln!(
            out,
            "Up to {} questions; an empty line ends the session.",
            self.chat.max_iterations
        )?;
        writeln!(out)?;
        writeln!(out, "Commands:")?;
        writeln!(out, "  /help      - Show this help")?;
        writeln!(out, "  /personas  - Show the expert roster")?;
        writeln!(out, "  /quit      - Exit chat")?;
        writeln!(out)
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command<W: Write>(&self, cmd: &str, out: &mut W) -> io::Result<bool> {
        match cmd {
            "/quit" | "/exit" | "/q" => {
                writeln!(out, "Bye!")?;
                Ok(true)
            }
            "/help" | "/h" | "/?" => {
                writeln!(out)?;
                writeln!(out, "Commands:")?;
                writeln!(out, "  /help, /h, /?    - Show this help")?;
                writeln!(out, "  /personas        - Show the expert roster")?;
                writeln!(out, "  /quit, /exit, /q - Exit chat")?;
                writeln!(out)?;
                Ok(false)
            }
            "/personas" => {
                writeln!(out)?;
                writeln!(out, "Experts:")?;
                for persona in self.pipeline.roster.iter() {
                    match &persona.model {
                        Some(model) => writeln!(out, "  - {} ({})", persona.name, model)?,
                        None => writeln!(out, "  - {}", persona.name)?,
                    }
                }
                writeln!(out)?;
                Ok(false)
            }
            _ => {
                writeln!(out, "Unknown command: {}", cmd)?;
                writeln!(out, "Type /help for available commands")?;
                Ok(false)
            }
        }
    }

    async fn process_question<W: Write>(&self, question: &str, out: &mut W) -> io::Result<()> {
        writeln!(out)?;

        let query = match Query::new(question) {
            Ok(query) => query,
            Err(e) => {
                writeln!(out, "Error: {}", e)?;
                return Ok(());
            }
        };
        let input = RunConsensusInput::new(query, self.pipeline.clone());

        let outcome = if self.output.show_progress {
            let progress = ProgressReporter::new();
            self.use_case.execute_with_progress(input, &progress).await
        } else {
            self.use_case.execute_with_progress(input, &NoProgress).await
        };

        writeln!(out, "{}", ConsoleFormatter.render(self.output.format, &outcome))?;
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consensus_application::{CompletionRequest, GatewayError};
    use consensus_domain::Persona;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every expert identically so the leaders always merge
    struct AgreeingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmTransport for AgreeingTransport {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = match request.system_context.as_deref() {
                Some("CRITIC") => "Sound.\nScore: 0.8",
                Some("SYNTH") => "Water boils at 100 C at sea level.",
                _ => "100 C.\nConfidence: 0.9",
            };
            Ok(reply.to_string())
        }
    }

    fn repl(max_iterations: usize) -> (ChatRepl<AgreeingTransport>, Arc<AgreeingTransport>) {
        colored::control::set_override(false);
        let transport = Arc::new(AgreeingTransport {
            calls: AtomicUsize::new(0),
        });
        let pipeline = PipelineConfig::default()
            .with_critic(Persona::new("critic", "CRITIC"))
            .with_synthesizer(Persona::new("synthesizer", "SYNTH"));
        let output = OutputConfig {
            show_progress: false,
            ..OutputConfig::default()
        };
        let repl = ChatRepl::new(Arc::clone(&transport), pipeline)
            .with_output(output)
            .with_chat(ChatConfig { max_iterations });
        (repl, transport)
    }

    async fn run(repl: &ChatRepl<AgreeingTransport>, input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let answered = repl.run_with(input.as_bytes(), &mut out).await.unwrap();
        (answered, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_answers_until_empty_line() {
        let (repl, _) = repl(5);
        let (answered, output) = run(&repl, "Boiling point of water?\n\nignored\n").await;

        assert_eq!(answered, 1);
        assert!(output.contains("Water boils at 100 C at sea level."));
        assert!(output.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn test_stops_at_max_iterations() {
        let (repl, _) = repl(2);
        let (answered, output) = run(&repl, "one?\ntwo?\nthree?\n").await;

        assert_eq!(answered, 2);
        assert!(output.contains("Reached the limit of 2 questions"));
    }

    #[tokio::test]
    async fn test_quit_command_makes_no_calls() {
        let (repl, transport) = repl(5);
        let (answered, output) = run(&repl, "/personas\n/quit\nnever asked\n").await;

        assert_eq!(answered, 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(output.contains("  - analyst"));
        assert!(output.contains("  - pragmatist"));
    }

    #[tokio::test]
    async fn test_line_handling_used_by_terminal_loop() {
        let (repl, transport) = repl(5);
        let mut out = Vec::new();

        assert!(matches!(repl.handle_line("   ", &mut out).await.unwrap(), Flow::Stop));
        assert!(matches!(repl.handle_line("/help", &mut out).await.unwrap(), Flow::Continue));
        assert!(matches!(repl.handle_line("/exit", &mut out).await.unwrap(), Flow::Quit));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        assert!(matches!(
            repl.handle_line(" Boiling point? ", &mut out).await.unwrap(),
            Flow::Answered
        ));
        assert!(transport.calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let (repl, _) = repl(5);
        let (answered, output) = run(&repl, "/help\n").await;

        assert_eq!(answered, 0);
        assert!(output.contains("/quit, /exit, /q"));
        assert!(output.ends_with("Bye!\n"));
    }
}
