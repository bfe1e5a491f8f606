use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use story_sync::config::config::load_app_config;
use story_sync::story::api::{HttpStoryApi, StaticToken};
use story_sync::story::config::StoryConfig;
use story_sync::story::errors::{ConversionError, StoryError, StoryResult, ValidationError};
use story_sync::story::logging::StoryLogger;
use story_sync::story::normalizer::normalize_youtube_embeds;
use story_sync::story::parser::parse_html_to_blocks;
use story_sync::story::renderer::render_blocks;
use story_sync::story::session::SessionContext;
use story_sync::story::{ContentBlock, PublishStatus, StoryDocument, StoryHandler};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert and sync crowdfunding project stories", long_about = None)]
struct Args {
    /// Configuration file (defaults to the usual candidate paths)
    #[arg(short, long)]
    config: Option<String>,

    /// Session file remembering the selected project
    #[arg(short, long, default_value = ".story-session.yaml")]
    session: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a JSON block list (or a full story document) to HTML
    Render { blocks: PathBuf },
    /// Parse an HTML fragment into a JSON block list
    Parse {
        html: PathBuf,
        /// Normalize YouTube links and iframes first
        #[arg(long)]
        normalize: bool,
    },
    /// Remember a project for later commands
    Select { project: String },
    /// Print the stored story and risks HTML of a project
    Pull { project: Option<String> },
    /// Save story and risks HTML files to the backend
    Push {
        project: Option<String>,
        #[arg(long)]
        story: PathBuf,
        #[arg(long)]
        risks: Option<PathBuf>,
        /// Keep persisted media missing from the local HTML
        #[arg(long)]
        update: bool,
        #[arg(long)]
        publish: bool,
    },
    /// Upload an image into the project's story
    Upload { project: Option<String>, image: PathBuf },
}

fn read_file(path: &PathBuf) -> StoryResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ValidationError::InvalidInput(format!("{}: {}", path.display(), e)).into())
}

fn to_json(blocks: &[ContentBlock]) -> StoryResult<String> {
    serde_json::to_string_pretty(blocks)
        .map_err(|e| ConversionError::SerializationFailed(e.to_string()).into())
}

fn render(path: &PathBuf) -> StoryResult<()> {
    let raw = read_file(path)?;
    let blocks = match serde_json::from_str::<Vec<ContentBlock>>(&raw) {
        Ok(blocks) => blocks,
        Err(_) => serde_json::from_str::<StoryDocument>(&raw)?.blocks,
    };
    println!("{}", render_blocks(&blocks));
    Ok(())
}

fn parse(path: &PathBuf, normalize: bool) -> StoryResult<()> {
    let mut html = read_file(path)?;
    if normalize {
        html = normalize_youtube_embeds(&html);
    }
    println!("{}", to_json(&parse_html_to_blocks(&html))?);
    Ok(())
}

async fn connect(
    config: &StoryConfig,
    session: SessionContext,
    project: Option<&str>,
) -> StoryResult<StoryHandler<HttpStoryApi>> {
    let tokens = Arc::new(StaticToken::new(config.api.token.clone()));
    let api = HttpStoryApi::new(&config.api, tokens)?;
    let mut handler = StoryHandler::new(api, config.editor.clone()).with_session(session);
    handler.load(project).await;
    if let Some(error) = handler.error() {
        return Err(ValidationError::InvalidInput(error.to_string()).into());
    }
    Ok(handler)
}

async fn run(args: Args) -> StoryResult<()> {
    let config = load_app_config(args.config.as_deref());
    config.init_logging()?;
    let mut logger = StoryLogger::new();
    logger.log_configuration("load", args.config.as_deref(), true);

    let mut session = SessionContext::open(&args.session)?;

    match args.command {
        Command::Render { blocks } => render(&blocks)?,
        Command::Parse { html, normalize } => parse(&html, normalize)?,
        Command::Select { project } => {
            session.select_project(&project)?;
            session.persist()?;
            println!("Selected project {}", project);
        }
        Command::Pull { project } => {
            let handler = connect(&config, session, project.as_deref()).await?;
            println!("{}", handler.story_html());
            println!("{}", handler.risks_html());
        }
        Command::Push {
            project,
            story,
            risks,
            update,
            publish,
        } => {
            let mut handler = connect(&config, session, project.as_deref()).await?;
            handler.set_story_html(read_file(&story)?);
            if let Some(risks) = risks {
                handler.set_risks_html(read_file(&risks)?);
            }
            let ok = if publish {
                handler.publish().await
            } else if update {
                handler.update().await
            } else {
                handler.save().await
            };
            if !ok {
                return Err(ValidationError::InvalidInput(
                    handler.error().unwrap_or("push failed").to_string(),
                )
                .into());
            }
            let status = handler.publish_status();
            println!(
                "Story {} saved ({})",
                handler.story_id().unwrap_or("?"),
                if status == PublishStatus::Published { "published" } else { "draft" }
            );
            handler.logger().log_final_summary();
        }
        Command::Upload { project, image } => {
            let bytes = std::fs::read(&image)
                .map_err(|e| ValidationError::InvalidInput(format!("{}: {}", image.display(), e)))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "image".to_string());
            let mut handler = connect(&config, session, project.as_deref()).await?;
            match handler.upload_image(&file_name, bytes).await {
                Some(url) => println!("{}", url),
                None => {
                    return Err(StoryError::Validation(ValidationError::InvalidInput(format!(
                        "upload of {} failed",
                        file_name
                    ))));
                }
            }
            handler.logger().log_final_summary();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
