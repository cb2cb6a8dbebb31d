//! # Block Module
//!
//! Block types are plain data: a [`BlockDefinition`] holds the per-face texture
//! tiles, a tint and an opacity flag, and a [`BlockRegistry`] built once at
//! start-up maps ids and names to definitions. The registry is passed
//! explicitly to every consumer (mesher, generators) rather than living in
//! global state.

use std::collections::HashMap;

use block_side::BlockSide;

use crate::{engine_state::rendering::atlas::TextureAtlas, error::EngineError};

pub mod block_side;

/// The integer type stored per voxel.
pub type BlockId = u16;

/// Index of a tile inside the texture atlas.
pub type TileIndex = u32;

/// Empty space. Never produces geometry and never occludes.
pub const AIR: BlockId = 0;

/// Reserved for debugging tools; never registered.
pub const DEBUG_BLOCK: BlockId = 1;

/// The id handed to the first registered block.
pub const FIRST_BLOCK_ID: BlockId = 2;

const OPAQUE_WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Describes how one block type looks.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockDefinition {
    /// Unique, human readable name
    pub name: String,
    /// Atlas tile per face, indexed by `BlockSide as usize`
    pub face_tiles: [TileIndex; 6],
    /// Constant RGBA tint applied to every vertex of the block
    pub tint: [f32; 4],
    /// Whether the block hides the faces of its neighbours
    pub opaque: bool,
}

impl BlockDefinition {
    /// Creates an opaque, untinted block with explicit per-face tiles.
    ///
    /// # Arguments
    /// * `name` - Unique block name
    /// * `face_tiles` - Tiles in [`BlockSide::all`] order
    pub fn new(name: impl Into<String>, face_tiles: [TileIndex; 6]) -> Self {
        BlockDefinition {
            name: name.into(),
            face_tiles,
            tint: OPAQUE_WHITE,
            opaque: true,
        }
    }

    /// Creates a block that uses the same tile on every face.
    pub fn uniform(name: impl Into<String>, tile: TileIndex) -> Self {
        Self::new(name, [tile; 6])
    }

    /// Creates a block with distinct top and bottom tiles and a shared side tile.
    pub fn top_bottom_side(
        name: impl Into<String>,
        top: TileIndex,
        bottom: TileIndex,
        side: TileIndex,
    ) -> Self {
        Self::new(name, [side, side, bottom, top, side, side])
    }

    /// Replaces the tint.
    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    /// Marks the block as see-through so it does not cull neighbouring faces.
    pub fn transparent(mut self) -> Self {
        self.opaque = false;
        self
    }

    /// The atlas tile used on `side`.
    pub fn tile_for_face(&self, side: BlockSide) -> TileIndex {
        self.face_tiles[side as usize]
    }
}

/// Lookup table from block id or name to [`BlockDefinition`].
///
/// Ids are handed out in registration order starting at [`FIRST_BLOCK_ID`];
/// ids below that are reserved sentinels.
///
/// # Examples
///
/// ```
/// use voxel_streaming::engine_state::voxels::block::{BlockDefinition, BlockRegistry, FIRST_BLOCK_ID};
///
/// let mut registry = BlockRegistry::new();
/// let stone = registry.register(BlockDefinition::uniform("stone", 0)).unwrap();
/// assert_eq!(stone, FIRST_BLOCK_ID);
/// assert_eq!(registry.id_of("stone"), Some(stone));
/// ```
#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    definitions: Vec<BlockDefinition>,
    ids_by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Creates a registry holding no blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the stock stone, dirt and grass blocks, resolving their tiles
    /// by name through `atlas`.
    ///
    /// # Errors
    /// [`EngineError::UnknownTile`] if the atlas lacks one of the required tiles.
    pub fn with_default_blocks(atlas: &TextureAtlas) -> Result<Self, EngineError> {
        let tile = |name: &str| {
            atlas
                .tile_index(name)
                .ok_or_else(|| EngineError::UnknownTile(name.to_string()))
        };

        let mut registry = Self::new();
        registry.register(
            BlockDefinition::uniform("stone", tile("stone")?).with_tint([0.55, 0.55, 0.57, 1.0]),
        )?;
        registry.register(
            BlockDefinition::uniform("dirt", tile("dirt")?).with_tint([0.48, 0.33, 0.2, 1.0]),
        )?;
        registry.register(
            BlockDefinition::top_bottom_side(
                "grass",
                tile("grass_top")?,
                tile("dirt")?,
                tile("grass_side")?,
            )
            .with_tint([0.36, 0.62, 0.25, 1.0]),
        )?;
        Ok(registry)
    }

    /// Adds a definition and returns the id assigned to it.
    ///
    /// # Errors
    /// [`EngineError::DuplicateBlockName`] if the name is taken.
    pub fn register(&mut self, definition: BlockDefinition) -> Result<BlockId, EngineError> {
        if self.ids_by_name.contains_key(&definition.name) {
            return Err(EngineError::DuplicateBlockName(definition.name));
        }

        let id = FIRST_BLOCK_ID + self.definitions.len() as BlockId;
        log::info!("Registering block id {}: {}", id, definition.name);
        self.ids_by_name.insert(definition.name.clone(), id);
        self.definitions.push(definition);
        Ok(id)
    }

    /// Looks up a definition by id. Sentinels and unknown ids yield `None`.
    pub fn get(&self, id: BlockId) -> Option<&BlockDefinition> {
        id.checked_sub(FIRST_BLOCK_ID)
            .and_then(|index| self.definitions.get(index as usize))
    }

    /// Looks up an id by name.
    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.ids_by_name.get(name).copied()
    }

    /// Like [`id_of`](Self::id_of) but reports a missing name as an error.
    pub fn require(&self, name: &str) -> Result<BlockId, EngineError> {
        self.id_of(name)
            .ok_or_else(|| EngineError::UnknownBlockName(name.to_string()))
    }

    /// Whether `id` is empty space.
    pub fn is_air(&self, id: BlockId) -> bool {
        id == AIR
    }

    /// Whether a voxel holding `id` hides the face of a neighbour.
    ///
    /// Unknown non-air ids count as solid.
    pub fn occludes(&self, id: BlockId) -> bool {
        !self.is_air(id) && self.get(id).map_or(true, |definition| definition.opaque)
    }

    /// Atlas tile for one face of a block, `None` for unknown ids.
    pub fn tile_for_face(&self, id: BlockId, side: BlockSide) -> Option<TileIndex> {
        self.get(id).map(|definition| definition.tile_for_face(side))
    }

    /// RGBA tint of a block, `None` for unknown ids.
    pub fn tint(&self, id: BlockId) -> Option<[f32; 4]> {
        self.get(id).map(|definition| definition.tint)
    }

    /// Number of registered blocks, excluding sentinels.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no blocks are registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
