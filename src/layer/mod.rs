use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use voxel_store::{BoundingBox, Element, ElementType, MemoryStore, StoreOptions, VoxelStore};

use crate::alignment::AlignmentPlanner;
use crate::error::Error;
use crate::interpolation::InterpolationMode;
use crate::job::{ChunkedDownsampleJob, JobExecutor};
use crate::mag::{MagLevel, ResolutionPyramidPlanner};
use crate::timing::{ChunkReport, JobMonitor};

pub mod settings;

pub use settings::DownsampleSettings;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerCategory {
    /// Intensity data.
    Color,

    /// Label data.
    Segmentation,
}

/// Creates the store of a new pyramid level with the given addressable region.
pub type StoreFactory<T> = Box<
    dyn Fn(MagLevel, &BoundingBox) -> Result<Arc<dyn VoxelStore<T>>, Error> + Send + Sync,
>;

/// One mag of a layer and the store holding its voxels.
#[derive(Clone, Debug)]
pub struct PyramidLevel<T: Element> {
    mag: MagLevel,
    store: Arc<dyn VoxelStore<T>>,
}

impl<T: Element> PyramidLevel<T> {
    pub fn new(mag: MagLevel, store: Arc<dyn VoxelStore<T>>) -> Self {
        Self { mag, store }
    }

    pub fn mag(&self) -> MagLevel {
        self.mag
    }

    pub fn store(&self) -> &Arc<dyn VoxelStore<T>> {
        &self.store
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.store.bounding_box()
    }

    pub fn channel_count(&self) -> u32 {
        self.store.channel_count()
    }

    pub fn element_type(&self) -> ElementType {
        self.store.element_type()
    }
}

#[readonly::make]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelReport {
    pub mag: MagLevel,

    #[serde(rename = "sourceMag")]
    pub source_mag: MagLevel,

    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,

    pub chunks: usize,

    #[serde(rename = "skippedTiles")]
    pub skipped_tiles: usize,
}

#[readonly::make]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DownsampleReport {
    #[serde(rename = "interpolationMode")]
    pub interpolation_mode: InterpolationMode,

    /// Every level that took part in the run, including existing finer levels that were only
    /// padded.
    #[serde(rename = "alignedLevels")]
    pub aligned_levels: Vec<(MagLevel, BoundingBox)>,

    pub levels: Vec<LevelReport>,
}

/// A named stack of pyramid levels sharing one channel count and element type.
pub struct Layer<T: Element> {
    name: String,
    category: LayerCategory,
    channels: u32,
    levels: BTreeMap<MagLevel, PyramidLevel<T>>,
    store_factory: StoreFactory<T>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl<T: Element> Layer<T> {
    pub fn new(
        name: &str,
        category: LayerCategory,
        channels: u32,
        store_factory: StoreFactory<T>,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            channels,
            levels: BTreeMap::new(),
            store_factory,
            cancelled: None,
        }
    }

    /// A layer whose levels are [`MemoryStore`]s created with `options`.
    pub fn in_memory(name: &str, category: LayerCategory, options: StoreOptions) -> Self {
        let channels = options.channels;
        Self::new(
            name,
            category,
            channels,
            Box::new(move |_, bounding_box| {
                let store: Arc<dyn VoxelStore<T>> = Arc::new(MemoryStore::with_bounding_box(
                    options.clone(),
                    *bounding_box,
                ));
                Ok(store)
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> LayerCategory {
        self.category
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Jobs started after `cancelled` is set fail with [`Error::Cancelled`].
    pub fn set_cancellation(&mut self, cancelled: Arc<AtomicBool>) {
        self.cancelled = Some(cancelled);
    }

    pub fn insert_level(
        &mut self,
        mag: MagLevel,
        store: Arc<dyn VoxelStore<T>>,
    ) -> Result<(), Error> {
        if store.channel_count() != self.channels {
            return Err(Error::PlanningInconsistency(format!(
                "level {mag} has {} channels, layer {} has {}",
                store.channel_count(),
                self.name,
                self.channels
            )));
        }
        self.levels.insert(mag, PyramidLevel::new(mag, store));
        Ok(())
    }

    /// Creates a new level through the store factory. Returns the existing level if `mag` exists.
    pub fn add_mag(
        &mut self,
        mag: MagLevel,
        bounding_box: &BoundingBox,
    ) -> Result<&PyramidLevel<T>, Error> {
        if !self.levels.contains_key(&mag) {
            let store = (self.store_factory)(mag, bounding_box)?;
            self.insert_level(mag, store)?;
        }
        self.get_mag(mag)
            .ok_or_else(|| Error::PlanningInconsistency(format!("mag {mag} was not added")))
    }

    pub fn get_mag(&self, mag: MagLevel) -> Option<&PyramidLevel<T>> {
        self.levels.get(&mag)
    }

    /// All mags of this layer, finest first.
    pub fn mags(&self) -> Vec<MagLevel> {
        self.levels.keys().copied().collect()
    }

    /// Existing levels that `from` can be reached from by exact division, finest first.
    /// `from` itself is the last element.
    fn existing_chain(&self, from: MagLevel) -> Vec<MagLevel> {
        let mut chain = vec![from];
        for mag in self.levels.keys().rev() {
            if let Some(last) = chain.last() {
                if *mag != *last && mag.is_finer_or_equal(last) && last.relative_to(mag).is_ok() {
                    chain.push(*mag);
                }
            }
        }
        chain.reverse();
        chain
    }

    /// Builds every mag above `settings.from_mag` up to `settings.max_mag`.
    ///
    /// All levels are padded before any chunk is written. Levels are processed finest first and
    /// the run stops at the first level with a failed chunk job.
    pub fn downsample<E: JobExecutor>(
        &mut self,
        settings: &DownsampleSettings,
        executor: &E,
        monitor: Arc<dyn JobMonitor>,
    ) -> Result<DownsampleReport, Error> {
        settings.validate()?;
        let mode = InterpolationMode::resolve(&settings.interpolation_mode, self.category)?;
        let from = settings.from_mag;
        if !self.levels.contains_key(&from) {
            return Err(Error::PlanningInconsistency(format!(
                "layer {} has no mag {from}",
                self.name
            )));
        }

        let new_mags = ResolutionPyramidPlanner::new(settings.scale, settings.max_mag)?.plan(from);
        let existing = self.existing_chain(from);
        let finest = existing[0];
        let mut base = BoundingBox::default();
        for mag in existing.iter() {
            if let Some(level) = self.levels.get(mag) {
                let factor = mag.relative_to(&finest)?;
                base = base.union(&level.bounding_box().scaled_by(factor));
            }
        }

        let chain: Vec<MagLevel> = existing.iter().chain(new_mags.iter()).copied().collect();
        let plan = AlignmentPlanner::new(chain)?.plan(&base)?;
        log::info!(
            "downsampling layer {} from mag {} to {} with {} ({} new levels)",
            self.name,
            from,
            new_mags.last().copied().unwrap_or(from),
            mode,
            new_mags.len()
        );

        for (mag, bounding_box) in plan.levels().iter() {
            match self.levels.get(mag) {
                Some(level) => {
                    if !bounding_box.is_empty() {
                        level.store().widen(bounding_box).map_err(|source| {
                            Error::TargetWriteFailure {
                                offset: bounding_box.offset,
                                source,
                            }
                        })?;
                    }
                }
                None => {
                    self.add_mag(*mag, bounding_box)?;
                }
            }
        }

        let mut levels = Vec::new();
        let mut source_mag = from;
        for mag in new_mags {
            let bounding_box = plan.get(mag).ok_or_else(|| {
                Error::PlanningInconsistency(format!("mag {mag} is missing from the plan"))
            })?;
            levels.push(self.downsample_level(
                source_mag,
                mag,
                &bounding_box,
                mode,
                settings,
                executor,
                &monitor,
            )?);
            source_mag = mag;
        }

        Ok(DownsampleReport {
            interpolation_mode: mode,
            aligned_levels: plan.levels().to_vec(),
            levels,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn downsample_level<E: JobExecutor>(
        &self,
        source_mag: MagLevel,
        target_mag: MagLevel,
        bounding_box: &BoundingBox,
        mode: InterpolationMode,
        settings: &DownsampleSettings,
        executor: &E,
        monitor: &Arc<dyn JobMonitor>,
    ) -> Result<LevelReport, Error> {
        let missing =
            |mag: MagLevel| Error::PlanningInconsistency(format!("mag {mag} does not exist"));
        let source = self.get_mag(source_mag).ok_or_else(|| missing(source_mag))?;
        let target = self.get_mag(target_mag).ok_or_else(|| missing(target_mag))?;
        let factors = target_mag.relative_to(&source_mag)?;

        let jobs: Vec<ChunkedDownsampleJob<T>> = bounding_box
            .chunks(settings.chunk_size)
            .into_iter()
            .map(|chunk| {
                let job = ChunkedDownsampleJob::new(
                    chunk,
                    factors,
                    mode,
                    self.channels,
                    source.store().clone(),
                    target.store().clone(),
                )
                .with_buffer_edge_len(settings.effective_buffer_edge_len())
                .with_monitor(monitor.clone());
                match self.cancelled.as_ref() {
                    Some(cancelled) => job.with_cancellation(cancelled.clone()),
                    None => job,
                }
            })
            .collect();
        log::info!(
            "downsampling mag {} from mag {}: {} chunks in {}",
            target_mag,
            source_mag,
            jobs.len(),
            bounding_box
        );

        let results = executor.execute(&jobs, settings.parallelism);
        let total = results.len();
        let mut reports: Vec<ChunkReport> = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(error) => failures.push(error),
            }
        }
        if let Some(first) = failures.first() {
            return Err(Error::LevelFailed {
                mag: target_mag,
                failed: failures.len(),
                total,
                first: Box::new(first.clone()),
            });
        }

        Ok(LevelReport {
            mag: target_mag,
            source_mag,
            bounding_box: *bounding_box,
            chunks: total,
            skipped_tiles: reports.iter().map(|r| r.skipped_tiles).sum(),
        })
    }
}

impl<T: Element> fmt::Debug for Layer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("channels", &self.channels)
            .field("levels", &self.levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, UVec3, Vec3};

    use super::*;
    use crate::job::SequentialExecutor;
    use crate::timing::NoopMonitor;

    fn mag(x: u32, y: u32, z: u32) -> MagLevel {
        MagLevel::new(UVec3::new(x, y, z)).unwrap()
    }

    fn layer(category: LayerCategory) -> Layer<u8> {
        Layer::in_memory(
            "layer",
            category,
            StoreOptions {
                chunk_size: UVec3::splat(8),
                ..Default::default()
            },
        )
    }

    #[test]
    fn existing_chain_skips_levels_that_do_not_divide() {
        let mut layer = layer(LayerCategory::Color);
        for m in [mag(1, 1, 1), mag(2, 2, 1), mag(1, 1, 2), mag(4, 4, 2)] {
            layer.add_mag(m, &BoundingBox::default()).unwrap();
        }
        assert_eq!(
            layer.existing_chain(mag(4, 4, 2)),
            vec![mag(1, 1, 1), mag(2, 2, 1), mag(4, 4, 2)]
        );
        assert_eq!(layer.existing_chain(mag(1, 1, 1)), vec![mag(1, 1, 1)]);
    }

    #[test]
    fn missing_source_mag_is_an_error() {
        let mut layer = layer(LayerCategory::Segmentation);
        let settings = DownsampleSettings::new(MagLevel::ONE, MagLevel::isotropic(4).unwrap());
        assert!(matches!(
            layer.downsample(&settings, &SequentialExecutor, Arc::new(NoopMonitor)),
            Err(Error::PlanningInconsistency(_))
        ));
    }

    #[test]
    fn invalid_mode_aborts_before_planning() {
        let mut layer = layer(LayerCategory::Color);
        layer.add_mag(MagLevel::ONE, &BoundingBox::default()).unwrap();
        let settings = DownsampleSettings::new(MagLevel::ONE, MagLevel::isotropic(4).unwrap())
            .with_interpolation_mode("lanczos");
        assert_eq!(
            layer
                .downsample(&settings, &SequentialExecutor, Arc::new(NoopMonitor))
                .unwrap_err(),
            Error::InvalidMode("lanczos".to_string())
        );
        assert_eq!(layer.mags(), vec![MagLevel::ONE]);
    }

    #[test]
    fn invalid_settings_abort_before_planning() {
        let mut layer = layer(LayerCategory::Color);
        layer
            .add_mag(MagLevel::ONE, &BoundingBox::new(IVec3::ZERO, UVec3::splat(16)))
            .unwrap();
        let settings = DownsampleSettings::new(MagLevel::ONE, MagLevel::isotropic(2).unwrap());
        for settings in [
            settings.clone().with_chunk_size(UVec3::new(0, 16, 16)),
            settings.with_scale(Vec3::new(0.0, 1.0, 1.0)),
        ] {
            assert!(matches!(
                layer.downsample(&settings, &SequentialExecutor, Arc::new(NoopMonitor)),
                Err(Error::InvalidSettings(_))
            ));
        }
        assert_eq!(layer.mags(), vec![MagLevel::ONE]);
    }

    #[test]
    fn channel_count_must_match_layer() {
        let mut layer = layer(LayerCategory::Color);
        let store: Arc<dyn VoxelStore<u8>> = Arc::new(MemoryStore::new(StoreOptions {
            channels: 3,
            ..Default::default()
        }));
        assert!(layer.insert_level(MagLevel::ONE, store).is_err());
    }

    #[test]
    fn levels_are_ordered_finest_first() {
        let mut layer = layer(LayerCategory::Color);
        let region = BoundingBox::new(IVec3::ZERO, UVec3::ONE);
        for m in [mag(4, 4, 4), mag(1, 1, 1), mag(2, 2, 1)] {
            layer.add_mag(m, &region).unwrap();
        }
        assert_eq!(layer.mags(), vec![mag(1, 1, 1), mag(2, 2, 1), mag(4, 4, 4)]);
        assert_eq!(layer.get_mag(mag(2, 2, 1)).unwrap().bounding_box(), region);
        assert_eq!(
            layer.get_mag(mag(4, 4, 4)).unwrap().element_type(),
            ElementType::Uint8
        );
    }
}
