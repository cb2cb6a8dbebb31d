//! # Texture Atlas Module
//!
//! Named tiles packed into a square-ish grid. Tile `i` sits in column
//! `i % columns` and row `i / columns`, with row 0 at the top of the image.
//! UV rectangles use the GL convention: `v0` is the bottom edge of the tile.
//!
//! The atlas is a layout only. Meshes carry the resulting texture coordinates,
//! but no atlas image is uploaded and the chunk shader ignores them, shading
//! faces by block tint alone.

use std::collections::HashMap;

use crate::engine_state::voxels::block::TileIndex;

/// Grid layout of named, equally sized tiles.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    tile_names: Vec<String>,
    indices_by_name: HashMap<String, TileIndex>,
    tile_width: u32,
    tile_height: u32,
    columns: u32,
    rows: u32,
    padding: u32,
}

impl TextureAtlas {
    /// Lays out `names` in the given order.
    ///
    /// The grid has `ceil(sqrt(n))` columns and as many rows as needed to hold
    /// every tile.
    ///
    /// # Arguments
    /// * `names` - Tile names; the position in this sequence is the tile index
    /// * `tile_width` - Width of one cell in pixels
    /// * `tile_height` - Height of one cell in pixels
    /// * `padding` - Pixels trimmed from each edge of a cell when computing UVs
    pub fn grid<I, S>(names: I, tile_width: u32, tile_height: u32, padding: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tile_names: Vec<String> = names.into_iter().map(Into::into).collect();
        let count = tile_names.len() as u32;
        let columns = ((count as f64).sqrt().ceil() as u32).max(1);
        let rows = count.div_ceil(columns).max(1);

        let indices_by_name = tile_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index as TileIndex))
            .collect();

        log::info!(
            "Atlas layout: {} cols x {} rows, tile size {}x{}, {} tiles",
            columns,
            rows,
            tile_width,
            tile_height,
            count
        );

        TextureAtlas {
            tile_names,
            indices_by_name,
            tile_width,
            tile_height,
            columns,
            rows,
            padding,
        }
    }

    /// Index of the tile called `name`.
    pub fn tile_index(&self, name: &str) -> Option<TileIndex> {
        self.indices_by_name.get(name).copied()
    }

    /// Tile names in index order.
    pub fn tile_names(&self) -> &[String] {
        &self.tile_names
    }

    /// Size of the whole atlas image in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns * self.tile_width, self.rows * self.tile_height)
    }

    /// Normalized `[u0, v0, u1, v1]` for a tile.
    ///
    /// Out-of-range indices are clamped to the last tile. An atlas without
    /// tiles maps everything to the full unit square.
    pub fn uv_rect(&self, tile: TileIndex) -> [f32; 4] {
        if self.tile_names.is_empty() {
            return [0.0, 0.0, 1.0, 1.0];
        }

        let tile = tile.min(self.tile_names.len() as TileIndex - 1);
        let column = tile % self.columns;
        let row = tile / self.columns;

        let (atlas_width, atlas_height) = self.dimensions();
        let atlas_width = atlas_width as f32;
        let atlas_height = atlas_height as f32;

        let mut u0 = (column * self.tile_width) as f32 / atlas_width;
        let mut u1 = ((column + 1) * self.tile_width) as f32 / atlas_width;
        let mut v0 = 1.0 - ((row + 1) * self.tile_height) as f32 / atlas_height;
        let mut v1 = 1.0 - (row * self.tile_height) as f32 / atlas_height;

        let pad_u = self.padding as f32 / atlas_width;
        let pad_v = self.padding as f32 / atlas_height;
        u0 += pad_u;
        u1 -= pad_u;
        v0 += pad_v;
        v1 -= pad_v;

        if u0 > u1 {
            std::mem::swap(&mut u0, &mut u1);
        }
        if v0 > v1 {
            std::mem::swap(&mut v0, &mut v1);
        }

        [u0, v0, u1, v1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_are_indexed_in_order() {
        let atlas = TextureAtlas::grid(["a", "b", "c"], 16, 16, 0);
        assert_eq!(atlas.tile_index("a"), Some(0));
        assert_eq!(atlas.tile_index("c"), Some(2));
        assert_eq!(atlas.tile_index("missing"), None);
    }

    #[test]
    fn grid_is_square_ish() {
        let atlas = TextureAtlas::grid(["a", "b", "c", "d", "e"], 16, 8, 0);
        assert_eq!(atlas.dimensions(), (48, 16));
    }

    #[test]
    fn first_tile_occupies_the_top_left_cell() {
        let atlas = TextureAtlas::grid(["a", "b", "c", "d"], 16, 16, 0);
        assert_eq!(atlas.uv_rect(0), [0.0, 0.5, 0.5, 1.0]);
        assert_eq!(atlas.uv_rect(3), [0.5, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn out_of_range_tiles_clamp_to_the_last() {
        let atlas = TextureAtlas::grid(["a", "b", "c", "d"], 16, 16, 0);
        assert_eq!(atlas.uv_rect(99), atlas.uv_rect(3));
    }

    #[test]
    fn padding_shrinks_the_rect() {
        let atlas = TextureAtlas::grid(["a", "b", "c", "d"], 16, 16, 2);
        let [u0, v0, u1, v1] = atlas.uv_rect(0);
        assert!((u0 - 2.0 / 32.0).abs() < 1e-6);
        assert!((u1 - 14.0 / 32.0).abs() < 1e-6);
        assert!((v0 - 18.0 / 32.0).abs() < 1e-6);
        assert!((v1 - 30.0 / 32.0).abs() < 1e-6);
    }
}
