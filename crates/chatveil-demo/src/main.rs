use chatveil_core::{ModelKind, ModelSpec};
use chatveil_demo::cli::{Cli, Commands};
use chatveil_demo::feed::ChatFeed;
use chatveil_engine::{HostPage, SimulatedPage, VeilEngine};
use chatveil_inference::{AnalysisService, LexiconBackendFactory};
use chatveil_store::{default_data_dir, CommentHistory, SettingsStore};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rate,
            duration,
            negative_share,
            model,
            data_dir,
            verbose,
        } => {
            init_logging(verbose);
            run_feed(rate, duration, negative_share, model, data_dir).await?;
        }

        Commands::History {
            data_dir,
            export,
            verbose,
        } => {
            init_logging(verbose);
            show_history(data_dir, export)?;
        }
    }

    Ok(())
}

async fn run_feed(
    rate: u32,
    duration: u64,
    negative_share: f64,
    model: ModelKind,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dir = data_dir.unwrap_or_else(default_data_dir);
    let settings = SettingsStore::open(dir.join("settings.json"))?;
    settings.set_model(match model {
        ModelKind::Generative => ModelSpec::default_generative(),
        ModelKind::Classifier => ModelSpec::default_classifier(),
    })?;

    let history = CommentHistory::open(dir.join("history.json"), settings.clone())?;
    let service = AnalysisService::spawn(
        Box::new(LexiconBackendFactory),
        settings.clone(),
        history.clone(),
    );

    // Stand up the simulated page: the shell exists before the engine
    // starts, everything below it appears while observing.
    let page = Arc::new(SimulatedPage::new());
    let shell = page.insert_element(page.document(), "live-app");

    let engine = Arc::new(VeilEngine::new(
        Arc::clone(&page) as Arc<dyn HostPage>,
        settings.clone(),
        service.clone(),
    ));

    if !settings.get().enabled {
        println!("chatveil is disabled in settings; enable it and rerun");
        return Ok(());
    }
    engine.start()?;

    // Enable-flag semantics: off stops in place, on requires a page
    // reload (a fresh run of this command) to rebuild from Idle.
    {
        let engine = Arc::clone(&engine);
        let mut watcher = settings.watch();
        let mut enabled = watcher.borrow().enabled;
        tokio::spawn(async move {
            while watcher.changed().await.is_ok() {
                let now = watcher.borrow().enabled;
                if now != enabled {
                    enabled = now;
                    if now {
                        info!("enable flag turned on: rerun to rebuild the observer");
                    } else {
                        engine.stop();
                    }
                }
            }
        });
    }

    page.insert_element(shell, "page-manager");
    page.insert_element(shell, "watch-view");
    let frame = page.create_element("live-chat-frame");
    let iframe = page.create_element("iframe#chatframe");
    page.append_child(frame, iframe);
    page.append_child(shell, frame);

    // A real iframe load trails its insertion; give the observer the same
    // beat to register the load handler.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let chat_document = page
        .load_iframe(iframe, true)
        .ok_or_else(|| anyhow::anyhow!("chat iframe did not expose a document"))?;

    println!("chatveil demo");
    println!("  model:    {model}");
    println!("  rate:     {rate} comments/s");
    println!("  duration: {duration}s");
    println!("  data:     {}", dir.display());
    println!();

    // Let the initial-load window lapse so the feed is not treated as a
    // replayed backlog.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let feed = ChatFeed::new(negative_share);
    let mut rng = StdRng::from_entropy();
    let interval = Duration::from_secs_f64(1.0 / rate.max(1) as f64);
    let total = rate as u64 * duration;

    for _ in 0..total {
        let comment = feed.next_comment(&mut rng);
        page.insert_chat_message(chat_document, comment);
        tokio::time::sleep(interval).await;
    }

    // Let the tail of the feed land before waiting on the queue.
    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.drained().await;
    engine.stop();

    let stats = engine.stats();
    println!();
    println!("feed complete");
    println!("  discovered: {}", stats.discovered);
    println!("  veiled:     {}", stats.kept);
    println!("  restored:   {}", stats.restored);
    println!("  failed:     {}", stats.failed);

    let items = service.get_all_comments_from_history().await?;
    println!();
    println!("last analyzed comments:");
    for item in items.iter().rev().take(10) {
        println!(
            "  [{}] {:<13} {:.2}  {}",
            item.analyzed_at.format("%H:%M:%S"),
            item.result.sentiment().to_string(),
            item.result.certainty(),
            item.comment
        );
    }

    Ok(())
}

fn show_history(data_dir: Option<PathBuf>, export: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = data_dir.unwrap_or_else(default_data_dir);
    let settings = SettingsStore::open(dir.join("settings.json"))?;
    let history = CommentHistory::open(dir.join("history.json"), settings)?;

    if let Some(path) = export {
        let count = history.export(&path)?;
        println!("exported {count} entries to {}", path.display());
        return Ok(());
    }

    let items = history.all();
    if items.is_empty() {
        println!("no analyzed comments yet");
        return Ok(());
    }

    for item in items {
        println!(
            "{:>5}  {}  {:<13} {:.2}  {}",
            item.id,
            item.analyzed_at.format("%Y-%m-%d %H:%M:%S"),
            item.result.sentiment().to_string(),
            item.result.certainty(),
            item.comment
        );
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "chatveil=debug,chatveil_demo=debug"
    } else {
        "chatveil=info,chatveil_demo=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
