//! AI story pipeline turning a place and an emotion into cultural content.
//!
//! This crate provides:
//! - A staged generation pipeline: history research, content planning, and
//!   a concurrent fan-out for images and nearby places
//! - An on-demand dietary follow-up that extends a completed result
//! - Structured-output schemas keeping model responses parseable
//! - Session state with progress reporting and result persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use storyteller_core::{Locale, SessionConfig, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_locale(Locale::Ko);
//!     let mut session = StorySession::from_env(config)?;
//!
//!     let result = session.generate("Gamcheon Culture Village", "nostalgia").await?;
//!     println!("{}", result.content.poster_slogan);
//!
//!     session.load_dietary().await;
//!     session.save("story.json").await?;
//!     Ok(())
//! }
//! ```

pub mod locale;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod session;
pub mod story;
pub mod testing;

// Primary public API
pub use locale::{Locale, UnknownLocale};
pub use model::{GeminiModel, GenerativeModel, ModelError};
pub use pipeline::{
    Progress, Storyteller, StorytellerConfig, StorytellerError, DEFAULT_REGION,
};
pub use session::{DietaryOutcome, SessionConfig, SessionError, StorySession};
pub use story::{
    DietaryPlaces, EncodedImage, NearbyInfo, Place, StoryContent, StoryResult,
    PLACES_PER_CATEGORY,
};
