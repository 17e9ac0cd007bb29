use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use quizgen_client::clients::{QuizService, ServiceKind};
use quizgen_client::config::ClientConfig;
use quizgen_client::export::{ExportType, FileFormat};
use quizgen_client::models::{Difficulty, OptionLabel};
use quizgen_client::prompt::confirm;
use quizgen_client::results::{feedback, format_percentage, OptionMark, Verdict};
use quizgen_client::sinks::FileSink;
use quizgen_client::{Phase, QuizController, QuizError, SubmitOutcome};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Generate a multiple-choice quiz from a document and take it in the terminal", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    QUIZGEN_API_URL        Quiz backend base URL [default: http://localhost:8000]
    QUIZGEN_TIMEOUT_SECS   Request timeout in seconds [default: 120]
    QUIZGEN_MAX_UPLOAD_MB  Largest accepted upload [default: 10]
    QUIZGEN_EXPORT_DIR     Where exports are saved [default: exports]
    RUST_LOG               Log filter, e.g. quizgen_client=debug

EXAMPLES:
    quizgen health
    quizgen take lecture.pdf --questions 15 --difficulty hard
    quizgen --mock take notes.txt")]
struct Args {
    /// Quiz backend base URL (overrides QUIZGEN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use the built-in offline backend instead of HTTP
    #[arg(long, global = true)]
    mock: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the quiz backend is reachable
    Health,
    /// Upload a document, generate questions and take the quiz
    Take {
        /// Document to quiz on (.pdf, .docx or .txt)
        file: PathBuf,

        /// Number of questions to generate
        #[arg(short = 'n', long, default_value_t = 10)]
        questions: u32,

        /// Only generate questions of this difficulty
        #[arg(short, long, value_enum)]
        difficulty: Option<DifficultyArg>,

        /// Where exports are saved (overrides QUIZGEN_EXPORT_DIR)
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

type Controller = QuizController<Box<dyn QuizService>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "quizgen_client=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(io::stderr)
        .try_init();

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    let kind = if args.mock { ServiceKind::Mock } else { ServiceKind::Http };

    match args.command {
        Command::Health => {
            let controller = QuizController::new(kind.connect(config.clone()), config.upload.clone());
            if controller.check_health().await? {
                println!("✅ Backend reachable at {}", config.base_url);
            } else {
                println!("❌ Backend not reachable at {}", config.base_url);
                std::process::exit(1);
            }
        }
        Command::Take { file, questions, difficulty, export_dir } => {
            if let Some(dir) = export_dir {
                config = config.with_export_dir(dir);
            }
            let sink = FileSink::new(config.export_dir.clone());
            let controller = QuizController::new(kind.connect(config.clone()), config.upload.clone());
            run(&controller, &sink, file, questions, difficulty.map(Difficulty::from)).await?;
        }
    }

    Ok(())
}

async fn run(
    controller: &Controller,
    sink: &FileSink,
    file: PathBuf,
    questions: u32,
    difficulty: Option<Difficulty>,
) -> Result<()> {
    if !controller.check_health().await.unwrap_or(false) {
        println!("⚠️  The quiz backend does not answer its health check; requests may fail.");
    }

    loop {
        if !upload(controller, &file).await? || !generate(controller, questions, difficulty).await? {
            return Ok(());
        }
        match take(controller, sink).await? {
            Next::Quit => return Ok(()),
            Next::Restart => {
                controller.restart();
                println!("\n🔄 Starting over.\n");
            }
        }
    }
}

enum Next {
    Quit,
    Restart,
}

async fn upload(controller: &Controller, file: &Path) -> Result<bool> {
    loop {
        println!("📤 Uploading {} ...", file.display());
        match controller.upload_path(file).await {
            Ok(_) => {
                if let Some(doc) = controller.session().document() {
                    println!("   Extracted text from {}", doc.file_name);
                }
                return Ok(true);
            }
            Err(QuizError::Validation(e)) => bail!("{}", e),
            Err(QuizError::Io(e)) => bail!("Could not read {}: {}", file.display(), e),
            Err(e) => {
                println!("❌ {}", e);
                if !confirm("Retry upload?") {
                    return Ok(false);
                }
            }
        }
    }
}

async fn generate(controller: &Controller, questions: u32, difficulty: Option<Difficulty>) -> Result<bool> {
    loop {
        println!("🧠 Generating {} question(s) ...", questions);
        match controller.generate(questions, difficulty).await {
            Ok(_) => return Ok(true),
            Err(e) => {
                println!("❌ {}", e);
                if !confirm("Retry generation?") {
                    return Ok(false);
                }
            }
        }
    }
}

fn read_command(prompt: &str) -> Result<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok("q".to_string());
    }
    Ok(line.trim().to_lowercase())
}

fn render_question(controller: &Controller) {
    let session = controller.session();
    let Some(question) = session.current_question() else {
        return;
    };
    let total = session.questions().len();
    let chosen = session.answers().and_then(|a| a.answer(&question.id));
    let elapsed = session.elapsed().map(|d| d.num_seconds()).unwrap_or(0);

    println!();
    println!(
        "Question {}/{}  ·  answered {}/{} ({:.0}%)  ·  {} left  ·  {:02}:{:02}",
        session.cursor() + 1,
        total,
        session.answered_count(),
        total,
        session.progress_fraction() * 100.0,
        session.unanswered_count(),
        elapsed / 60,
        elapsed % 60
    );
    let mut tags = Vec::new();
    if let Some(level) = question.difficulty_level {
        tags.push(level.to_string());
    }
    if let Some(blooms) = &question.blooms_taxonomy {
        tags.push(blooms.clone());
    }
    if !tags.is_empty() {
        println!("[{}]", tags.join(" · "));
    }
    println!("{}", question.question_text);
    for (label, text) in question.options() {
        let marker = if chosen == Some(label) { "●" } else { "○" };
        println!("  {} {}. {}", marker, label, text);
    }
    if let Some(error) = session.error() {
        println!("⚠️  {}", error);
    }
}

async fn take(controller: &Controller, sink: &FileSink) -> Result<Next> {
    println!("\nCommands: a-d answer · n next · p previous · g <k> go to · s submit · e <pdf|docx> export questions · r restart · q quit");
    loop {
        render_question(controller);
        let command = read_command(">")?;
        let mut parts = command.split_whitespace();
        match (parts.next().unwrap_or("n"), parts.next()) {
            ("n", _) => {
                controller.session().next();
            }
            ("p", _) => {
                controller.session().previous();
            }
            ("g", Some(k)) => match k.parse::<usize>() {
                Ok(k) if k >= 1 => {
                    controller.session().jump_to(k - 1);
                }
                _ => println!("Usage: g <question number>"),
            },
            (label @ ("a" | "b" | "c" | "d"), None) => {
                let option: OptionLabel = label.parse().map_err(anyhow::Error::msg)?;
                let mut session = controller.session();
                session.select_answer(option)?;
                session.next();
            }
            ("s", _) => {
                let outcome = controller
                    .submit(|unanswered| confirm(&format!("{} question(s) are unanswered. Submit anyway?", unanswered)))
                    .await;
                match outcome {
                    Ok(SubmitOutcome::Declined { .. }) => continue,
                    Ok(SubmitOutcome::Sent(_)) if controller.session().phase() == Phase::Results => {
                        return review(controller, sink).await;
                    }
                    Ok(SubmitOutcome::Sent(_)) => continue,
                    Err(e) => println!("❌ {}", e),
                }
            }
            ("e", format) => export(controller, sink, ExportType::QuestionsOnly, format).await,
            ("r", _) => return Ok(Next::Restart),
            ("q", _) => return Ok(Next::Quit),
            _ => println!("Unknown command"),
        }
    }
}

fn render_results(controller: &Controller) {
    let session = controller.session();
    let (Some(result), Some(grade)) = (session.result(), session.grade()) else {
        return;
    };
    let breakdown = session.breakdown().unwrap_or_default();
    let taken = session.elapsed().map(|d| d.num_seconds()).unwrap_or(0);

    println!();
    println!(
        "Score: {}/{} ({}%)  ·  Grade {}  ·  time {:02}:{:02}",
        result.correct_answers,
        result.total_questions,
        format_percentage(result.percentage),
        grade,
        taken / 60,
        taken % 60
    );
    println!("{}", result.feedback.clone().unwrap_or_else(|| feedback(result, &breakdown)));

    let tiers: Vec<String> = breakdown
        .by_difficulty
        .iter()
        .filter(|(_, tally)| tally.total > 0)
        .map(|(level, tally)| format!("{} {}/{}", level, tally.correct, tally.total))
        .collect();
    if !tiers.is_empty() {
        println!("By difficulty: {}", tiers.join(" · "));
    }
    let blooms: Vec<String> = breakdown
        .by_blooms
        .iter()
        .map(|(level, tally)| format!("{} {}/{}", level, tally.correct, tally.total))
        .collect();
    if !blooms.is_empty() {
        println!("By Bloom's level: {}", blooms.join(" · "));
    }

    let review = session.review();
    println!();
    for (idx, item) in result.results.iter().enumerate() {
        let icon = match item.verdict() {
            Verdict::Correct => "✅",
            Verdict::Incorrect => "❌",
            Verdict::Unanswered => "⬜",
        };
        println!("{} {}. {}", icon, idx + 1, item.question_text);
        if !review.map_or(false, |r| r.is_expanded(&item.question_id)) {
            continue;
        }
        for view in item.option_views() {
            let note = match view.mark {
                OptionMark::CorrectChoice => "  ← your answer, correct",
                OptionMark::WrongChoice => "  ← your answer",
                OptionMark::CorrectAnswer => "  ← correct answer",
                OptionMark::Plain => "",
            };
            println!("      {}. {}{}", view.label, view.text, note);
        }
        if !item.explanation.is_empty() {
            println!("      Explanation: {}", item.explanation);
        }
    }
    if let Some(error) = session.error() {
        println!("⚠️  {}", error);
    }
}

async fn review(controller: &Controller, sink: &FileSink) -> Result<Next> {
    println!("\nCommands: x <k> show/hide detail · e <questions|results> <pdf|docx> export · r restart · q quit");
    loop {
        render_results(controller);
        let command = read_command(">")?;
        let mut parts = command.split_whitespace();
        match (parts.next().unwrap_or(""), parts.next(), parts.next()) {
            ("x", Some(k), _) => {
                let mut session = controller.session();
                let id = k
                    .parse::<usize>()
                    .ok()
                    .and_then(|k| session.result()?.results.get(k.checked_sub(1)?))
                    .map(|item| item.question_id.clone());
                match id {
                    Some(id) => {
                        session.toggle_detail(&id);
                    }
                    None => println!("Usage: x <question number>"),
                }
            }
            ("e", Some(kind), format) => match kind.parse::<ExportType>() {
                Ok(export_type) => export(controller, sink, export_type, format).await,
                Err(e) => println!("{}", e),
            },
            ("r", _, _) => return Ok(Next::Restart),
            ("q", _, _) => return Ok(Next::Quit),
            ("", _, _) => {}
            _ => println!("Unknown command"),
        }
    }
}

async fn export(controller: &Controller, sink: &FileSink, export_type: ExportType, format: Option<&str>) {
    let file_format = match format.unwrap_or("pdf").parse::<FileFormat>() {
        Ok(format) => format,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    println!("📄 Exporting {} as {} ...", export_type, file_format);
    match controller.export_to(export_type, file_format, sink).await {
        Ok(Some(path)) => println!("   Saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => println!("❌ {}", e),
    }
}
