//! Data manager serving rectified full images and their cameras

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rdm_core::camera::CAMERA_INDEX_KEY;
use rdm_core::{CameraRecord, Cameras, Frame, MetadataValue, RdmError, Result, Split};
use rdm_io::{DataParser, Dataset, InputDataset};

use crate::cache::{CacheBuilder, FrameCache, effective_policy};
use crate::config::{DataManagerConfig, TestMode};
use crate::device::Device;
use crate::embedding::EmbeddingProvider;
use crate::observer::{BuildObserver, TracingObserver};
use crate::sampler::Scheduler;

/// Rays per batch reported to ray-based consumers; one full 800×800 image
const TRAIN_RAYS_PER_BATCH: usize = 800 * 800;

/// Caches both splits at construction and serves (camera, frame) pairs
///
/// Every camera of a split is served once per sweep. Train frames are served
/// in a fixed order, eval frames at random.
pub struct DataManager<D: Dataset = InputDataset> {
    config: DataManagerConfig,
    eval_split: Split,
    data_path: Option<PathBuf>,
    train_dataset: D,
    eval_dataset: D,
    train_cache: FrameCache,
    eval_cache: FrameCache,
    builder: CacheBuilder,
    device: Arc<dyn Device>,
    scheduler: Scheduler,
    embedding: Option<Box<dyn EmbeddingProvider>>,
}

impl DataManager<InputDataset> {
    /// Parse both splits, scale them and build the caches
    ///
    /// The eval split is chosen by `test_mode`; `config.data` overrides the
    /// parser's data path.
    pub fn new(
        config: DataManagerConfig,
        parser: &dyn DataParser,
        device: Arc<dyn Device>,
        test_mode: TestMode,
    ) -> Result<Self> {
        config.validate()?;
        let eval_split = test_mode.eval_split();
        let data_path = config
            .data
            .clone()
            .or_else(|| parser.data_path().map(Path::to_path_buf));

        let scale = config.camera_res_scale_factor;
        let train = InputDataset::new(parser.outputs(Split::Train)?, scale);
        let eval = InputDataset::new(parser.outputs(eval_split)?, scale);

        let mut manager =
            Self::assemble(config, train, eval, eval_split, device, Arc::new(TracingObserver))?;
        manager.data_path = data_path;
        Ok(manager)
    }
}

impl<D: Dataset> DataManager<D> {
    /// Build the caches over datasets that were already constructed
    ///
    /// The eval dataset is treated as the `val` split.
    pub fn from_datasets(
        config: DataManagerConfig,
        train: D,
        eval: D,
        device: Arc<dyn Device>,
    ) -> Result<Self> {
        Self::from_datasets_with_observer(config, train, eval, device, Arc::new(TracingObserver))
    }

    /// Like [`DataManager::from_datasets`], reporting build progress to `observer`
    pub fn from_datasets_with_observer(
        config: DataManagerConfig,
        train: D,
        eval: D,
        device: Arc<dyn Device>,
        observer: Arc<dyn BuildObserver>,
    ) -> Result<Self> {
        config.validate()?;
        let data_path = config.data.clone();
        let mut manager = Self::assemble(config, train, eval, Split::Val, device, observer)?;
        manager.data_path = data_path;
        Ok(manager)
    }

    fn assemble(
        mut config: DataManagerConfig,
        mut train_dataset: D,
        mut eval_dataset: D,
        eval_split: Split,
        device: Arc<dyn Device>,
        observer: Arc<dyn BuildObserver>,
    ) -> Result<Self> {
        config.cache_images = effective_policy(config.cache_images, train_dataset.len());
        let builder = CacheBuilder::new(config.cache_images, Arc::clone(&device), observer);

        let train_cache = builder.build(Split::Train, &mut train_dataset)?;
        let eval_cache = builder.build(eval_split, &mut eval_dataset)?;
        check_aligned(Split::Train, train_dataset.cameras(), &train_cache)?;
        check_aligned(eval_split, eval_dataset.cameras(), &eval_cache)?;

        let scheduler = Scheduler::new(train_cache.len(), eval_cache.len(), config.eval_seed);
        let manager = Self {
            config,
            eval_split,
            data_path: None,
            train_dataset,
            eval_dataset,
            train_cache,
            eval_cache,
            builder,
            device,
            scheduler,
            embedding: None,
        };
        manager.setup_train();
        manager.setup_eval();
        Ok(manager)
    }

    /// Forward every ingested frame to `provider`
    pub fn with_embedding_provider(mut self, provider: Box<dyn EmbeddingProvider>) -> Self {
        self.embedding = Some(provider);
        self
    }

    pub fn setup_train(&self) {
        tracing::info!(
            frames = self.train_cache.len(),
            device = self.device.name(),
            "Setting up training dataset"
        );
    }

    pub fn setup_eval(&self) {
        tracing::info!(
            frames = self.eval_cache.len(),
            split = %self.eval_split,
            "Setting up evaluation dataset"
        );
    }

    /// Next train pair; a full sweep visits every camera once
    pub fn next_train(&mut self, step: usize) -> Result<(CameraRecord, Frame)> {
        let index = self.scheduler.next_train_index()?;
        tracing::trace!(step, index, "train sample");
        self.serve(Split::Train, index)
    }

    /// Random eval pair, without repeats within a sweep
    pub fn next_eval(&mut self, step: usize) -> Result<(CameraRecord, Frame)> {
        let index = self.scheduler.next_eval_index(self.eval_split)?;
        tracing::trace!(step, index, "eval sample");
        self.serve(self.eval_split, index)
    }

    pub fn next_eval_image(&mut self, step: usize) -> Result<(CameraRecord, Frame)> {
        self.next_eval(step)
    }

    /// Every eval pair in index order, moved to the device
    ///
    /// Always the whole eval split; `eval_image_indices` is not applied.
    pub fn fixed_indices_eval_dataloader(&self) -> Result<Vec<(CameraRecord, Frame)>> {
        (0..self.eval_cache.len())
            .map(|index| {
                let camera = self.eval_dataset.cameras().slice(index)?;
                let mut frame = self.cached(self.eval_split, index)?.clone();
                self.device.to_device(&mut frame)?;
                Ok((camera, frame))
            })
            .collect()
    }

    /// Append a frame captured during training and return its train index
    ///
    /// The frame is served as given, without rectification. The train sweep
    /// restarts so the new index comes next. A frame that cannot be placed
    /// leaves dataset and cache unchanged. Embedding failures are logged and
    /// do not undo the ingestion.
    pub fn process_image(&mut self, frame: Frame, camera: CameraRecord) -> Result<usize> {
        let mut placed = frame.clone();
        self.builder.place(&mut placed)?;
        self.train_dataset.add_image(frame, camera)?;
        let index = self.train_cache.push(placed);
        check_aligned(Split::Train, self.train_dataset.cameras(), &self.train_cache)?;

        self.scheduler.reset_train(self.train_cache.len());
        if let (Some(provider), Some(frame)) = (self.embedding.as_mut(), self.train_cache.get(index)) {
            if let Err(err) = provider.add_image(index, frame) {
                tracing::warn!(index, error = %err, "embedding provider rejected ingested image");
            }
        }
        tracing::debug!(index, frames = self.train_cache.len(), "image ingested");
        Ok(index)
    }

    /// Dataset root, if known
    pub fn datapath(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    pub fn train_rays_per_batch(&self) -> usize {
        TRAIN_RAYS_PER_BATCH
    }

    pub fn train_len(&self) -> usize {
        self.train_cache.len()
    }

    pub fn eval_len(&self) -> usize {
        self.eval_cache.len()
    }

    /// Configuration in effect, including any cache policy downgrade
    pub fn config(&self) -> &DataManagerConfig {
        &self.config
    }

    pub fn eval_split(&self) -> Split {
        self.eval_split
    }

    pub fn train_cache(&self) -> &FrameCache {
        &self.train_cache
    }

    pub fn eval_cache(&self) -> &FrameCache {
        &self.eval_cache
    }

    pub fn train_cameras(&self) -> &Cameras {
        self.train_dataset.cameras()
    }

    pub fn eval_cameras(&self) -> &Cameras {
        self.eval_dataset.cameras()
    }

    pub fn train_dataset(&self) -> &D {
        &self.train_dataset
    }

    pub fn eval_dataset(&self) -> &D {
        &self.eval_dataset
    }

    fn cached(&self, split: Split, index: usize) -> Result<&Frame> {
        let (cache, cameras) = if split == Split::Train {
            (&self.train_cache, self.train_dataset.cameras())
        } else {
            (&self.eval_cache, self.eval_dataset.cameras())
        };
        cache.get(index).ok_or(RdmError::Misaligned {
            split,
            cameras: cameras.len(),
            frames: cache.len(),
        })
    }

    fn serve(&self, split: Split, index: usize) -> Result<(CameraRecord, Frame)> {
        let cameras = if split == Split::Train {
            self.train_dataset.cameras()
        } else {
            self.eval_dataset.cameras()
        };
        let camera = cameras
            .slice(index)?
            .with_metadata(CAMERA_INDEX_KEY, MetadataValue::Int(index as i64));
        let mut frame = self.cached(split, index)?.clone();
        self.device.to_device(&mut frame)?;
        Ok((camera, frame))
    }
}

fn check_aligned(split: Split, cameras: &Cameras, cache: &FrameCache) -> Result<()> {
    if cameras.len() == cache.len() {
        Ok(())
    } else {
        Err(RdmError::Misaligned {
            split,
            cameras: cameras.len(),
            frames: cache.len(),
        })
    }
}
