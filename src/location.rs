// src/location.rs
use crate::exif_data::GpsCoordinate;
use crate::viewer_config::MapSettings;

/// A map implementation the renderer drives. `create` binds a new map to the
/// target; `release` unbinds it.
pub trait MapBackend {
    type Target: ?Sized;
    type Map;

    fn create(
        &self,
        target: &Self::Target,
        coordinate: GpsCoordinate,
        settings: &MapSettings,
    ) -> Option<Self::Map>;

    fn release(&self, map: Self::Map);
}

struct ActiveMap<M> {
    map: M,
    coordinate: GpsCoordinate,
}

/// Owns at most one live map. Every transition releases the current map
/// before anything new is created, and dropping the renderer releases it too.
pub struct LocationRenderer<B: MapBackend> {
    backend: B,
    active: Option<ActiveMap<B::Map>>,
}

impl<B: MapBackend> LocationRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    /// Inactive/Active -> Active. Without an attached target the renderer
    /// stays inactive.
    pub fn show(
        &mut self,
        target: Option<&B::Target>,
        coordinate: GpsCoordinate,
        settings: &MapSettings,
    ) {
        self.clear();

        let Some(target) = target else {
            log::debug!("Map target not attached, deferring map for {}", coordinate);
            return;
        };

        if let Some(map) = self.backend.create(target, coordinate, settings) {
            self.active = Some(ActiveMap { map, coordinate });
        }
    }

    pub fn sync(
        &mut self,
        target: Option<&B::Target>,
        coordinate: Option<GpsCoordinate>,
        settings: &MapSettings,
    ) {
        match coordinate {
            Some(coordinate) => self.show(target, coordinate, settings),
            None => self.clear(),
        }
    }

    /// Active -> Inactive.
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("Releasing map at {}", active.coordinate);
            self.backend.release(active.map);
        }
    }
}

impl<B: MapBackend> Drop for LocationRenderer<B> {
    fn drop(&mut self) {
        self.clear();
    }
}
