use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use glam::{IVec3, UVec3};
use mag_pyramid::voxel_store::{
    BoundingBox, Cube, Element, MemoryStore, RawArray, StoreError, StoreOptions, VoxelStore,
};
use mag_pyramid::{Layer, LayerCategory, MagLevel};

pub type Registry<T> = Arc<Mutex<BTreeMap<MagLevel, Arc<MemoryStore<T>>>>>;

pub fn options(chunk_size: u32, channels: u32) -> StoreOptions {
    StoreOptions {
        chunk_size: UVec3::splat(chunk_size),
        channels,
        ..Default::default()
    }
}

/// A layer backed by memory stores that stay accessible through the returned registry.
pub fn recording_layer<T: Element>(
    category: LayerCategory,
    options: StoreOptions,
) -> (Layer<T>, Registry<T>) {
    let registry: Registry<T> = Arc::default();
    let stores = registry.clone();
    let channels = options.channels;
    let layer = Layer::new(
        "recorded",
        category,
        channels,
        Box::new(move |mag, bounding_box| {
            let store = Arc::new(MemoryStore::with_bounding_box(options.clone(), *bounding_box));
            stores.lock().unwrap().insert(mag, store.clone());
            Ok(store as Arc<dyn VoxelStore<T>>)
        }),
    );
    (layer, registry)
}

pub fn fill<T: Element>(
    layer: &Layer<T>,
    mag: MagLevel,
    region: BoundingBox,
    value: impl Fn(IVec3) -> T,
) {
    let cube = Cube::from_fn(region.size, |v| value(region.offset + v.as_ivec3()));
    let data = RawArray::from_cubes(vec![cube]).unwrap();
    layer
        .get_mag(mag)
        .unwrap()
        .store()
        .write(region.offset, &data)
        .unwrap();
}

pub fn read<T: Element>(layer: &Layer<T>, mag: MagLevel, region: BoundingBox) -> RawArray<T> {
    let store = layer.get_mag(mag).unwrap().store();
    store.open().unwrap();
    let data = store.read(&region).unwrap();
    store.close().unwrap();
    data
}

/// A memory store whose writes at one offset fail.
#[derive(Debug)]
pub struct FailingStore<T> {
    inner: MemoryStore<T>,
    fail_at: IVec3,
}

impl<T: Element> FailingStore<T> {
    pub fn new(inner: MemoryStore<T>, fail_at: IVec3) -> Self {
        Self { inner, fail_at }
    }
}

impl<T: Element> VoxelStore<T> for FailingStore<T> {
    fn open(&self) -> Result<(), StoreError> {
        self.inner.open()
    }

    fn close(&self) -> Result<(), StoreError> {
        self.inner.close()
    }

    fn read(&self, region: &BoundingBox) -> Result<RawArray<T>, StoreError> {
        self.inner.read(region)
    }

    fn write(&self, offset: IVec3, data: &RawArray<T>) -> Result<(), StoreError> {
        if offset == self.fail_at {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.write(offset, data)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.inner.bounding_box()
    }

    fn widen(&self, bounding_box: &BoundingBox) -> Result<(), StoreError> {
        self.inner.widen(bounding_box)
    }

    fn channel_count(&self) -> u32 {
        self.inner.channel_count()
    }
}
