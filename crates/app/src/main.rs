use std::fmt;
use std::path::{Path, PathBuf};

use quiz_core::format_clock;
use quiz_core::model::{QuestionBank, QuizId, QuizResult, SessionConfig};
use services::{
    AppServices, Clock, HintOutcome, HistoryQuery, HistorySort, Lifecycle, QuizRunner, SessionError,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidMinutes { raw: String },
    InvalidSort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid --minutes value: {raw}"),
            ArgsError::InvalidSort { raw } => write!(f, "invalid --sort value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  quiz run      --bank <file> --quiz-id <id> [--db <sqlite_url>] [--no-instant-feedback] [--minutes <n>]"
    );
    eprintln!(
        "  quiz history  [--bank <file>] [--db <sqlite_url>] [--search <term>] [--sort date-desc|date-asc|score-desc|score-asc]"
    );
    eprintln!("  quiz mistakes --bank <file> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --minutes 80");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_BANK, QUIZ_DURATION_MINUTES, RUST_LOG");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL, QUIZ_AI_TIMEOUT_SECS");
}

fn print_controls() {
    println!("Commands: <option number> answer, n next, p previous, g <n> go to question,");
    println!("          note <text>, hint, status, save (save and exit), finish, help");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    History,
    Mistakes,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            "mistakes" => Some(Self::Mistakes),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    bank: Option<PathBuf>,
    quiz_id: Option<QuizId>,
    instant_feedback: bool,
    minutes: Option<u32>,
    search: Option<String>,
    sort: HistorySort,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url),
            bank: std::env::var_os("QUIZ_BANK").map(PathBuf::from),
            quiz_id: None,
            instant_feedback: true,
            minutes: None,
            search: None,
            sort: HistorySort::default(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--bank" => {
                    parsed.bank = Some(PathBuf::from(require_value(args, "--bank")?));
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let id = value
                        .parse::<QuizId>()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    parsed.quiz_id = Some(id);
                }
                "--no-instant-feedback" => parsed.instant_feedback = false,
                "--minutes" => {
                    let value = require_value(args, "--minutes")?;
                    let minutes = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|m| *m > 0)
                        .ok_or_else(|| ArgsError::InvalidMinutes { raw: value.clone() })?;
                    parsed.minutes = Some(minutes);
                }
                "--search" => parsed.search = Some(require_value(args, "--search")?),
                "--sort" => {
                    let value = require_value(args, "--sort")?;
                    parsed.sort = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSort { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn require_bank(&self) -> Result<&Path, ArgsError> {
        self.bank
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--bank" })
    }

    fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::from_env().with_instant_feedback(self.instant_feedback);
        match self.minutes {
            Some(minutes) => config.with_duration_minutes(minutes),
            None => config,
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_bank(path: &Path) -> Result<QuestionBank, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let bank = QuestionBank::from_json(&raw)?;
    info!(path = %path.display(), quizzes = bank.len(), "question bank loaded");
    Ok(bank)
}

async fn open_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    prepare_sqlite_file(&args.db_url)?;
    Ok(AppServices::new_sqlite(&args.db_url, Clock::default(), args.session_config()).await?)
}

//
// ─── RUN ───────────────────────────────────────────────────────────────────────
//

enum Step {
    Continue,
    Saved,
    Finished(QuizResult),
}

fn print_question(runner: &QuizRunner) {
    let progress = runner.progress();
    let question = runner.current_question();
    let index = progress.current_index;
    let chosen = runner.read(|s| s.answer_for(index));

    println!();
    println!(
        "[{}/{}] {}  answered {}/{}",
        index + 1,
        progress.total,
        format_clock(progress.time_left_secs),
        progress.answered,
        progress.total
    );
    println!("{}", question.text());
    for (option, text) in question.visible_options() {
        let marker = if chosen == Some(option) { '*' } else { ' ' };
        println!(" {marker} {}) {text}", option + 1);
    }
    if let Some(note) = runner.read(|s| s.has_note(index).then(|| s.note(index).map(str::to_owned)))
        .flatten()
    {
        println!("   note: {note}");
    }
}

fn print_status(runner: &QuizRunner) {
    let progress = runner.progress();
    let marks: String = progress
        .questions
        .iter()
        .enumerate()
        .map(|(i, status)| match (i == progress.current_index, status.correct, status.answered) {
            (true, _, _) => '>',
            (_, Some(true), _) => '+',
            (_, Some(false), _) => 'x',
            (_, None, true) => '#',
            (_, None, false) if status.has_note => 'n',
            _ => '.',
        })
        .collect();
    println!(
        "{marks}  {}%  time left {}  unanswered {}",
        progress.position_percent(),
        format_clock(progress.time_left_secs),
        progress.unanswered()
    );
}

fn spawn_hint(runner: &QuizRunner) {
    let runner = runner.clone();
    println!("Asking for a hint...");
    tokio::spawn(async move {
        match runner.request_hint().await {
            HintOutcome::Ready(hint) => println!("\nHint: {hint}\n"),
            HintOutcome::Failed(message) => println!("\nHint unavailable: {message}"),
            HintOutcome::Skipped => println!("\nA hint for this question is already shown or loading."),
            HintOutcome::Discarded => {}
        }
    });
}

/// Save and leave. If the timer ran out meanwhile, the submitted result is
/// returned instead so it still reaches the history.
async fn save(runner: &QuizRunner) -> Result<Step, SessionError> {
    match runner.save_and_exit().await {
        Ok(()) => {
            println!("Progress saved. Run the same command again to resume.");
            Ok(Step::Saved)
        }
        Err(SessionError::InvalidTransition {
            from: Lifecycle::Finished,
            ..
        }) => match runner.read(|session| session.result().cloned()) {
            Some(result) => {
                println!("\nTime is up. Your answers were submitted.");
                Ok(Step::Finished(result))
            }
            None => Ok(Step::Continue),
        },
        Err(err) => Err(err),
    }
}

async fn handle_line(runner: &QuizRunner, line: &str) -> Result<Step, Box<dyn std::error::Error>> {
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match word {
        "" => {}
        "n" | "next" => {
            runner.next();
            print_question(runner);
        }
        "p" | "prev" => {
            runner.previous();
            print_question(runner);
        }
        "g" | "goto" => match rest.parse::<usize>() {
            Ok(number) if number > 0 => {
                runner.go_to(number - 1);
                print_question(runner);
            }
            _ => println!("Usage: g <question number>"),
        },
        "note" => {
            runner.set_note(runner.current_index(), rest);
            println!("Note saved.");
        }
        "hint" => spawn_hint(runner),
        "status" => print_status(runner),
        "save" => return Ok(save(runner).await?),
        "finish" => {
            if let Some(result) = runner.finish().await {
                return Ok(Step::Finished(result));
            }
        }
        "help" | "?" => print_controls(),
        other => match other.parse::<usize>() {
            Ok(number) if number > 0 => match runner.select_current(number - 1) {
                Some(feedback) if feedback.locked && feedback.is_correct => println!("Correct!"),
                Some(feedback) if feedback.locked => {
                    let question = runner.current_question();
                    let correct = question
                        .options()
                        .get(question.correct_answer_index())
                        .map_or("", String::as_str);
                    println!("Wrong. The correct answer is: {correct}");
                    if let Some(explanation) = question.explanation() {
                        println!("{explanation}");
                    }
                }
                Some(_) => println!("Answer recorded."),
                None => println!("Answer not accepted."),
            },
            _ => println!("Unknown command `{line}`. Type help for the list."),
        },
    }
    Ok(Step::Continue)
}

async fn ask_resume(lines: &mut Lines<BufReader<Stdin>>) -> std::io::Result<bool> {
    println!("Saved progress found. Resume? [Y/n]");
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(!matches!(answer.trim(), "n" | "N" | "no"))
}

async fn run_quiz(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bank = load_bank(args.require_bank()?)?;
    let quiz_id = args
        .quiz_id
        .ok_or(ArgsError::MissingFlag { flag: "--quiz-id" })?;
    let services = open_services(args).await?;
    let runner = services.quiz_loop().open_from_bank(&bank, quiz_id)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", bank.title(quiz_id).unwrap_or_default());

    let resumed = if runner.has_saved_progress().await? && ask_resume(&mut lines).await? {
        runner.resume().await?
    } else {
        None
    };
    let mut completion = match resumed {
        Some(completion) => completion,
        None => runner.start().await?,
    };
    print_controls();
    print_question(&runner);

    let result = loop {
        tokio::select! {
            outcome = &mut completion => {
                if outcome.is_some() {
                    println!("\nTime is up. Your answers were submitted.");
                }
                break outcome;
            }
            line = lines.next_line() => {
                let step = match line? {
                    Some(line) => handle_line(&runner, line.trim()).await?,
                    None => {
                        println!("Input closed.");
                        match save(&runner).await? {
                            Step::Continue => Step::Saved,
                            step => step,
                        }
                    }
                };
                match step {
                    Step::Continue => {}
                    Step::Saved => break None,
                    Step::Finished(result) => break Some(result),
                }
            }
        }
    };

    if let Some(result) = result {
        let stored = services.history().record(quiz_id, result).await?;
        print_result(&stored);
        let stats = services.history().stats().await?;
        println!(
            "League: {} ({} points{})",
            stats.league.name(),
            stats.total_points,
            stats
                .points_to_next
                .map(|missing| format!(", {missing} to next"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn print_result(result: &QuizResult) {
    println!();
    println!(
        "Score: {}/{} ({}%)  time {}",
        result.score(),
        result.total(),
        result.percentage(),
        format_clock(result.time_spent_secs())
    );
    if result.is_perfect() {
        println!("Perfect score!");
    } else if result.is_excellent() {
        println!("Excellent work.");
    }
}

//
// ─── HISTORY / MISTAKES ────────────────────────────────────────────────────────
//

async fn show_history(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bank = args.bank.as_deref().map(load_bank).transpose()?;
    let services = open_services(args).await?;
    let history = services.history();

    let query = HistoryQuery {
        search: args.search.clone(),
        sort: args.sort,
    };
    let entries = history.list(bank.as_ref(), &query).await?;
    if entries.is_empty() {
        println!("No results yet.");
    }
    for entry in &entries {
        let date = entry
            .completed_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{date:16}  {:>4}%  {:>3}/{:<3}  {:>6}  {}",
            entry.percentage,
            entry.score,
            entry.total,
            format_clock(entry.time_spent_secs),
            entry.title
        );
    }

    let stats = history.stats().await?;
    println!();
    println!(
        "Tests: {}  average: {}%  points: {}  league: {}",
        stats.total_tests,
        stats.average_percentage,
        stats.total_points,
        stats.league.name()
    );
    Ok(())
}

async fn show_mistakes(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bank = load_bank(args.require_bank()?)?;
    let services = open_services(args).await?;
    let mistakes = services.history().mistakes(&bank).await?;
    if mistakes.is_empty() {
        println!("No mistakes recorded.");
    }
    for mistake in &mistakes {
        println!("{} · Q{}", mistake.quiz_title, mistake.question_index + 1);
        println!("  {}", mistake.question.text());
        println!("  your answer:    {}", mistake.chosen_text());
        println!("  correct answer: {}", mistake.correct_text());
        if let Some(explanation) = mistake.question.explanation() {
            println!("  {explanation}");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if matches!(first.as_str(), "--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Run => run_quiz(&args).await,
        Command::History => show_history(&args).await,
        Command::Mistakes => show_mistakes(&args).await,
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId};

    fn runner() -> QuizRunner {
        let services = AppServices::in_memory(Clock::default(), SessionConfig::default());
        let question = Question::new(
            QuestionId::new(1),
            "سؤال",
            vec!["أ".into(), "ب".into()],
            1,
        )
        .unwrap();
        services
            .quiz_loop()
            .open(QuizId::new(1), vec![question])
            .unwrap()
    }

    #[tokio::test]
    async fn save_after_submission_hands_back_the_result() {
        let runner = runner();
        let _completion = runner.start().await.unwrap();
        runner.select_current(1);
        let submitted = runner.finish().await.unwrap();

        match save(&runner).await.unwrap() {
            Step::Finished(result) => assert_eq!(result, submitted),
            _ => panic!("a finished attempt must not be reported as saved"),
        }
    }

    #[tokio::test]
    async fn save_while_running_leaves_the_quiz() {
        let runner = runner();
        let completion = runner.start().await.unwrap();
        assert!(matches!(save(&runner).await.unwrap(), Step::Saved));
        assert!(runner.has_saved_progress().await.unwrap());
        assert_eq!(completion.await, None);
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/quiz.db".into()),
            "sqlite:///tmp/quiz.db"
        );
    }
}
