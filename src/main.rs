use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use couple_compat::compatibility::{
    compatibility_router, AnswerSet, CompatibilityResult, CompatibilityScorer,
    CompatibilityService, QuestionnaireCatalog, QuestionnaireDefinition, QuestionnaireId,
};
use couple_compat::config::AppConfig;
use couple_compat::error::AppError;
use couple_compat::infra::{BroadcastResultNotifier, InMemoryCompatibilityStore};
use couple_compat::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: Arc<PrometheusHandle>,
}

#[derive(Parser, Debug)]
#[command(
    name = "couple-compat",
    about = "Score couples' questionnaire answers and serve compatibility results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List the questionnaire catalog or print one questionnaire
    Catalog(CatalogArgs),
    /// Score two answer files against a questionnaire without storing anything
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Print the full definition of this questionnaire as JSON
    #[arg(long)]
    questionnaire: Option<String>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Questionnaire id, e.g. compat_v1
    #[arg(long)]
    questionnaire: String,
    /// JSON object of the first member's answers ({"values:v1": 5, ...})
    #[arg(long)]
    answers_a: PathBuf,
    /// JSON object of the second member's answers
    #[arg(long)]
    answers_b: PathBuf,
    /// Emit the result as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Catalog(args) => run_catalog(args),
        Command::Score(args) => run_score(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(QuestionnaireCatalog::load(config.catalog.path.as_deref())?);
    info!(questionnaires = catalog.len(), "questionnaire catalog loaded");

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(CompatibilityService::new(
        Arc::new(InMemoryCompatibilityStore::default()),
        Arc::new(BroadcastResultNotifier::default()),
        catalog,
    ));

    let app = compatibility_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compatibility service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn load_catalog() -> Result<QuestionnaireCatalog, AppError> {
    let config = AppConfig::load()?;
    Ok(QuestionnaireCatalog::load(config.catalog.path.as_deref())?)
}

fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = load_catalog()?;

    match args.questionnaire {
        Some(id) => {
            let questionnaire = find_questionnaire(&catalog, &id)?;
            let rendered = serde_json::to_string_pretty(questionnaire)
                .map_err(|err| AppError::Input(err.to_string()))?;
            println!("{rendered}");
        }
        None => render_catalog(&catalog),
    }

    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        questionnaire,
        answers_a,
        answers_b,
        json,
    } = args;

    let catalog = load_catalog()?;
    let definition = find_questionnaire(&catalog, &questionnaire)?;
    let answers_a = read_answers(&answers_a)?;
    let answers_b = read_answers(&answers_b)?;

    let result = CompatibilityScorer::new().score(definition, &answers_a, &answers_b);

    if json {
        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|err| AppError::Input(err.to_string()))?;
        println!("{rendered}");
    } else {
        render_result(definition, &result);
    }

    Ok(())
}

fn find_questionnaire<'a>(
    catalog: &'a QuestionnaireCatalog,
    id: &str,
) -> Result<&'a QuestionnaireDefinition, AppError> {
    catalog
        .get(&QuestionnaireId::new(id))
        .ok_or_else(|| AppError::Input(format!("questionnaire '{id}' not found")))
}

fn read_answers(path: &Path) -> Result<AnswerSet, AppError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|err| {
        AppError::Input(format!(
            "failed to parse answers in {} ({err})",
            path.display()
        ))
    })
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn render_catalog(catalog: &QuestionnaireCatalog) {
    println!("Questionnaires");
    for questionnaire in catalog.list() {
        println!(
            "- {} | {} | {} questions | topics: {}",
            questionnaire.id,
            questionnaire.title,
            questionnaire.questions.len(),
            questionnaire.topics().join(", ")
        );
    }
}

fn render_result(questionnaire: &QuestionnaireDefinition, result: &CompatibilityResult) {
    println!("{} ({})", questionnaire.title, questionnaire.id);
    println!("Compatibility: {}%", result.score);

    if result.breakdown.is_empty() {
        println!("\nTopic breakdown: no questions answered by both members");
        return;
    }

    println!("\nTopic breakdown");
    for topic in questionnaire.topics() {
        if let Some(score) = result.breakdown.get(topic) {
            println!("- {topic}: {score}%");
        }
    }
}
