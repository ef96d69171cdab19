use anyhow::{Context, Result};
use dirs::home_dir;
use image::GrayImage;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

use zonewatch::common::get_current_timestamp_str;
use zonewatch::compose::encode_png;
use zonewatch::mask::decode_mask;

/// Zone masks keyed by a caller-chosen zone id, so a base image's mask is
/// generated once and reused across detections. Opens a connection per call.
#[derive(Clone, Debug)]
pub struct ZoneMaskCache {
    path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedMaskInfo {
    pub zone_id: String,
    pub width: u32,
    pub height: u32,
    pub strategy: String,
    pub created_at: String,
}

pub fn get_database_path() -> Result<PathBuf> {
    let mut path = home_dir().context("Unable to find home directory")?;
    path.push(".zonewatch");
    fs::create_dir_all(&path).context("Unable to create .zonewatch directory")?;
    path.push("zone_masks.db");
    Ok(path)
}

impl ZoneMaskCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let cache = Self {
            path: path.as_ref().to_path_buf(),
        };
        cache.connect()?.execute(
            "CREATE TABLE IF NOT EXISTS zone_masks (
                zone_id TEXT PRIMARY KEY,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                strategy TEXT NOT NULL,
                created_at TEXT NOT NULL,
                mask_png BLOB NOT NULL
            )",
            [],
        )?;
        Ok(cache)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(get_database_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open mask cache at {}", self.path.display()))
    }

    pub fn store(&self, zone_id: &str, mask: &GrayImage, strategy: &str) -> Result<CachedMaskInfo> {
        let encoded = encode_png(&image::DynamicImage::ImageLuma8(mask.clone()))?;
        let info = CachedMaskInfo {
            zone_id: zone_id.to_string(),
            width: mask.width(),
            height: mask.height(),
            strategy: strategy.to_string(),
            created_at: get_current_timestamp_str(),
        };
        self.connect()?.execute(
            "INSERT OR REPLACE INTO zone_masks (zone_id, width, height, strategy, created_at, mask_png)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                info.zone_id,
                info.width,
                info.height,
                info.strategy,
                info.created_at,
                encoded.bytes
            ],
        )?;
        log::debug!("Cached {}x{} mask for zone {}", info.width, info.height, zone_id);
        Ok(info)
    }

    pub fn load(&self, zone_id: &str) -> Result<Option<GrayImage>> {
        let bytes: Option<Vec<u8>> = self
            .connect()?
            .query_row(
                "SELECT mask_png FROM zone_masks WHERE zone_id = ?1",
                params![zone_id],
                |row| row.get(0),
            )
            .optional()?;
        match bytes {
            Some(bytes) => Ok(Some(decode_mask(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn info(&self, zone_id: &str) -> Result<Option<CachedMaskInfo>> {
        let info = self
            .connect()?
            .query_row(
                "SELECT zone_id, width, height, strategy, created_at FROM zone_masks WHERE zone_id = ?1",
                params![zone_id],
                |row| {
                    Ok(CachedMaskInfo {
                        zone_id: row.get(0)?,
                        width: row.get(1)?,
                        height: row.get(2)?,
                        strategy: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    /// Returns whether a mask was removed.
    pub fn remove(&self, zone_id: &str) -> Result<bool> {
        let removed = self
            .connect()?
            .execute("DELETE FROM zone_masks WHERE zone_id = ?1", params![zone_id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::tempdir;

    #[test]
    fn test_store_load_remove() -> Result<()> {
        let dir = tempdir()?;
        let cache = ZoneMaskCache::open(dir.path().join("masks.db"))?;
        let mask = GrayImage::from_fn(30, 20, |x, _| Luma([if x < 10 { 255 } else { 0 }]));

        assert!(cache.load("river")?.is_none());
        let info = cache.store("river", &mask, "intensity")?;
        assert_eq!((info.width, info.height), (30, 20));

        assert_eq!(cache.load("river")?, Some(mask));
        assert_eq!(cache.info("river")?.map(|i| i.strategy), Some("intensity".to_string()));

        assert!(cache.remove("river")?);
        assert!(!cache.remove("river")?);
        assert!(cache.load("river")?.is_none());
        Ok(())
    }

    #[test]
    fn test_store_replaces_existing_zone() -> Result<()> {
        let dir = tempdir()?;
        let cache = ZoneMaskCache::open(dir.path().join("masks.db"))?;
        cache.store("lake", &GrayImage::new(5, 5), "edge")?;
        cache.store("lake", &GrayImage::from_pixel(8, 8, Luma([255])), "intensity")?;
        let mask = cache.load("lake")?.unwrap();
        assert_eq!(mask.dimensions(), (8, 8));
        Ok(())
    }
}
