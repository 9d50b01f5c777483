//! Render-and-persist core: engine seam, session pool, page renderer,
//! artifact store and the pipeline that ties them together.

pub mod engine;
pub mod pipeline;
pub mod pool;
pub mod renderer;
pub mod store;

pub use engine::{EngineError, EnginePage, EngineSession, LaunchOptions, RenderEngine};
pub use pipeline::{JobStage, PrintError, PrintFailure, PrintPipeline};
pub use pool::{PageLease, PoolError, PoolSettings, RenderPool, SessionState};
pub use renderer::{PageRenderer, PdfArtifact, RenderError, RendererSettings};
pub use store::{ArtifactStore, ObjectStore, PutObject, StorageError};
