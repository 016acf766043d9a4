//! Checksum Accumulator
//!
//! Order-sensitive 64-bit fold over a resolved map, used to confirm that every participant in
//! a match loaded the same map. Two maps with the same content in a different order hash
//! differently.

use xxhash_rust::xxh3::Xxh3;

use mapforge_shared::{Droid, Feature, MapData, Structure, WorldPos};

/// Incremental xxh3 over map content. Numbers are fed little-endian.
#[derive(Clone)]
pub struct MapChecksum {
    hasher: Xxh3,
}

impl MapChecksum {
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
        }
    }

    /// Fold every tile in storage order.
    pub fn tiles(&mut self, map: &MapData) -> &mut Self {
        for tile in &map.tiles {
            self.hasher.update(&tile.height.to_le_bytes());
            self.hasher.update(&tile.texture.to_le_bytes());
        }
        self
    }

    pub fn structures(&mut self, structures: &[Structure]) -> &mut Self {
        for s in structures {
            self.object(s.id, &s.name, s.position, s.direction);
            self.hasher.update(&[s.modules]);
            self.hasher.update(&s.player.to_le_bytes());
        }
        self
    }

    pub fn droids(&mut self, droids: &[Droid]) -> &mut Self {
        for d in droids {
            self.object(d.id, &d.name, d.position, d.direction);
            self.hasher.update(&d.player.to_le_bytes());
        }
        self
    }

    pub fn features(&mut self, features: &[Feature]) -> &mut Self {
        for f in features {
            self.object(f.id, &f.name, f.position, f.direction);
            if let Some(player) = f.player {
                self.hasher.update(&player.to_le_bytes());
            }
        }
        self
    }

    fn object(&mut self, id: Option<u32>, name: &str, position: WorldPos, direction: u16) {
        if let Some(id) = id {
            self.hasher.update(&id.to_le_bytes());
        }
        self.hasher.update(name.as_bytes());
        self.hasher.update(&position.x.to_le_bytes());
        self.hasher.update(&position.y.to_le_bytes());
        self.hasher.update(&direction.to_le_bytes());
    }

    pub fn digest(&self) -> u64 {
        self.hasher.digest()
    }
}

impl Default for MapChecksum {
    fn default() -> Self {
        Self::new()
    }
}
