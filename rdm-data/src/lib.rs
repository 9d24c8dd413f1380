//! Caching and sampling of rectified frames for radiance-field training

pub mod cache;
pub mod config;
pub mod device;
pub mod embedding;
pub mod manager;
pub mod observer;
pub mod sampler;

pub use cache::{CacheBuilder, FrameCache, MAX_DEVICE_CACHED_TRAIN_FRAMES, effective_policy};
pub use config::{CachePolicy, DataManagerConfig, TestMode};
pub use device::{Device, HostDevice};
pub use embedding::EmbeddingProvider;
pub use manager::DataManager;
pub use observer::{BuildObserver, TracingObserver};
pub use sampler::{Scheduler, UnseenCameras};
