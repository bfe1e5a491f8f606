// Root of the story editor core: block model, converters, backend boundary and handler.
pub mod api;
pub mod block;
pub mod config;
pub(crate) mod dom;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod normalizer;
pub mod parser;
pub mod reconcile;
pub mod renderer;
pub mod session;
pub mod style;
pub mod youtube;

pub use block::{BlockMetadata, BlockType, ContentBlock, PublishStatus, StoryDocument};
pub use errors::{StoryError, StoryResult};
pub use handler::{SavingStatus, StoryHandler};
