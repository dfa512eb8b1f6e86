//! Place-story generator CLI.
//!
//! Turns a location and an emotion into a story plan, two generated images,
//! and nearby-place recommendations, then writes everything to an output
//! directory:
//!
//! ```bash
//! cargo run -p storyteller -- "Gamcheon Culture Village" nostalgia --locale ko --dietary
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use storyteller_core::{
    DietaryOutcome, DietaryPlaces, Locale, NearbyInfo, Place, Progress, SessionConfig,
    SessionError, StoryContent, StorySession, StorytellerError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storyteller", version)]
#[command(about = "Generate a place story: history, content plan, images, and nearby places")]
struct Args {
    /// Place to build the story around.
    location: String,

    /// Emotion to anchor the story to.
    emotion: String,

    /// Response language code (en, ko, ja, zh, ru, fr, ar, he, fa).
    #[arg(short, long, default_value = "en")]
    locale: Locale,

    /// Region that anchors every prompt.
    #[arg(long, default_value = storyteller_core::DEFAULT_REGION)]
    region: String,

    /// Also look up vegan/halal/kosher options after the story completes.
    #[arg(long, default_value_t = false)]
    dietary: bool,

    /// Directory for the story JSON and generated images.
    #[arg(short, long, default_value = "story-out")]
    out: PathBuf,

    /// Override the model used for the text stages.
    #[arg(long)]
    text_model: Option<String>,

    /// Override the model used for the image stages.
    #[arg(long)]
    image_model: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Check for API key
    if std::env::var("GEMINI_API_KEY").is_err() {
        eprintln!("Error: GEMINI_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export GEMINI_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let mut config = SessionConfig::new()
        .with_locale(args.locale)
        .with_region(&args.region);
    if let Some(model) = &args.text_model {
        config = config.with_text_model(model);
    }
    if let Some(model) = &args.image_model {
        config = config.with_image_model(model);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let mut session = StorySession::from_env(config)?;

    // Echo progress transitions while the pipeline runs.
    let mut progress_rx = session.subscribe_progress();
    let watcher = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let state = *progress_rx.borrow_and_update();
            eprintln!("[{state}]");
            if state == Progress::Complete || state == Progress::Error {
                break;
            }
        }
    });

    let outcome = session.generate(&args.location, &args.emotion).await;

    // Rejected inputs never start the pipeline, so the watcher would wait
    // forever on a progress change that is not coming.
    if matches!(
        &outcome,
        Err(SessionError::Pipeline(StorytellerError::EmptyInput))
    ) {
        watcher.abort();
    }
    let _ = watcher.await;

    match outcome {
        Ok(result) => {
            print_story(&result.content);
            match &result.nearby {
                Some(nearby) => print_nearby(nearby),
                None => eprintln!("note: nearby places unavailable"),
            }
            if result.watercolor.is_none() {
                eprintln!("note: watercolor image unavailable");
            }
            if result.landscape.is_none() {
                eprintln!("note: landscape image unavailable");
            }
        }
        Err(SessionError::Pipeline(err)) => {
            eprintln!("{}", err.user_message(args.locale));
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }

    if args.dietary {
        match session.load_dietary().await {
            DietaryOutcome::Loaded => {
                if let Some(dietary) = session.result().and_then(|r| r.dietary.as_ref()) {
                    print_dietary(dietary);
                }
            }
            DietaryOutcome::Failed => {
                eprintln!("note: dietary lookup failed; continuing without it");
            }
            DietaryOutcome::NotReady => {
                eprintln!("note: no completed story; dietary lookup skipped");
            }
        }
    }

    export(&session, &args.out).await?;
    Ok(())
}

/// Write the result JSON and any decoded images into `out`.
async fn export(session: &StorySession, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out).await?;

    let story_path = out.join("story.json");
    session.save(&story_path).await?;
    println!();
    println!("Saved {}", story_path.display());

    let Some(result) = session.result() else {
        return Ok(());
    };
    let images = [
        ("watercolor", &result.watercolor),
        ("landscape", &result.landscape),
    ];
    for (name, image) in images {
        if let Some(image) = image {
            let path = out.join(format!("{name}.{}", image.extension()));
            tokio::fs::write(&path, image.decode()?).await?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

fn print_story(content: &StoryContent) {
    println!();
    println!("== {} ==", content.content_title);
    println!("{} for {}", content.content_type, content.target_audience);
    println!();
    println!("Slogan: {}", content.poster_slogan);
    println!();
    println!("History");
    println!("{}", content.history);
    println!();
    println!("Plot");
    println!("{}", content.plot);
    println!();
    println!("Expected effect: {}", content.effect);
    println!();
    println!("{}", content.consolation_message);
}

fn print_places(title: &str, places: &[Place]) {
    if places.is_empty() {
        return;
    }
    println!();
    println!("{title}:");
    for place in places {
        let mut line = format!("  - {} ({}): {}", place.name, place.category, place.description);
        if let Some(price) = &place.price {
            line.push_str(&format!(" [{price}]"));
        }
        if let Some(url) = &place.url {
            line.push_str(&format!(" <{url}>"));
        }
        println!("{line}");
    }
}

fn print_nearby(nearby: &NearbyInfo) {
    println!();
    println!("-- Nearby --");
    print_places("Restaurants", &nearby.restaurants);
    print_places("Accommodations", &nearby.accommodations);
    print_places("Attractions", &nearby.attractions);
}

fn print_dietary(dietary: &DietaryPlaces) {
    println!();
    println!("-- Dietary options --");
    if dietary.is_empty() {
        println!("  none found");
        return;
    }
    print_places("Vegan", &dietary.vegan);
    print_places("Halal", &dietary.halal);
    print_places("Kosher", &dietary.kosher);
}
