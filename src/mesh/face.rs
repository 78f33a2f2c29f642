//! Per-face processing: texture resolution, tinting, UV rectangles, and
//! material interning.

use crate::content::{Element, Model};
use crate::registry::{MaterialKey, MaterialRegistry};
use crate::types::{BlockKey, Category, Direction};

/// Tint colors for the block families that bake vertex color into their
/// materials.
#[derive(Debug, Clone)]
pub struct TintTable {
    /// Default grass/foliage tint (plains biome approximate).
    pub grass: [f32; 3],
    /// Water tint.
    pub water: [f32; 3],
    /// Lava tint.
    pub lava: [f32; 3],
    /// Redstone dust colors by power level (0-15).
    pub redstone: [[f32; 3]; 16],
}

impl Default for TintTable {
    fn default() -> Self {
        Self {
            grass: [0.56, 0.74, 0.35],
            water: [0.247, 0.463, 0.894],
            lava: [1.0, 0.45, 0.1],
            redstone: Self::default_redstone_colors(),
        }
    }
}

impl TintTable {
    /// Redstone brightens from dim red at power 0 to full red at 15.
    fn default_redstone_colors() -> [[f32; 3]; 16] {
        let mut colors = [[0.0; 3]; 16];
        for (power, color) in colors.iter_mut().enumerate() {
            let brightness = power as f32 / 15.0;
            *color = [
                0.3 + brightness * 0.7,
                brightness * 0.1,
                brightness * 0.1,
            ];
        }
        colors
    }

    /// Resolve the tint for a textured face. `None` when the face carries no
    /// tint index.
    pub fn tint_for(&self, block: &BlockKey, texture: &str, tintindex: i32) -> Option<[f32; 3]> {
        if tintindex < 0 {
            return None;
        }
        if texture.starts_with("block/water") {
            return Some(self.water);
        }
        if texture.starts_with("block/lava") {
            return Some(self.lava);
        }
        if texture.starts_with("block/redstone_dust") {
            let power = block
                .property("power")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(0)
                .min(15);
            return Some(self.redstone[power]);
        }
        Some(self.grass)
    }
}

/// Quantize a tint to the 8-bit channels used by material keys.
pub fn quantize_tint(tint: [f32; 3]) -> [u8; 3] {
    [
        (tint[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (tint[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (tint[2].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// Untinted material color.
const WHITE: [u8; 3] = [255, 255, 255];

/// Processed data for one canonical face of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFace {
    /// Interned material index; `None` for absent/null/overlay faces.
    pub material: Option<u32>,
    /// UV rectangle `[u0, v0, u1, v1]` in [0, 1].
    pub uv: [f32; 4],
    /// Normalized UV rotation in {0, 90, 180, 270}.
    pub rotation: u16,
}

impl ProcessedFace {
    fn absent() -> Self {
        Self {
            material: None,
            uv: [0.0, 0.0, 1.0, 1.0],
            rotation: 0,
        }
    }
}

/// Per-face output for one element, indexed by [`Direction::bit`].
pub type ElementFaces = [ProcessedFace; 6];

/// Resolves element faces into materials and UV rectangles.
pub struct FaceProcessor<'a> {
    registry: &'a MaterialRegistry,
    tints: TintTable,
}

impl<'a> FaceProcessor<'a> {
    pub fn new(registry: &'a MaterialRegistry) -> Self {
        Self {
            registry,
            tints: TintTable::default(),
        }
    }

    pub fn with_tints(registry: &'a MaterialRegistry, tints: TintTable) -> Self {
        Self { registry, tints }
    }

    /// Process all six canonical faces of one element.
    pub fn process(
        &self,
        block: &BlockKey,
        category: Category,
        model: &Model,
        element: &Element,
    ) -> ElementFaces {
        let mut out = [
            ProcessedFace::absent(),
            ProcessedFace::absent(),
            ProcessedFace::absent(),
            ProcessedFace::absent(),
            ProcessedFace::absent(),
            ProcessedFace::absent(),
        ];

        if element.faces.is_empty() {
            return out;
        }

        for direction in Direction::ALL {
            let Some(face) = element.face(direction) else {
                continue;
            };

            let texture = model.resolve_texture(&face.texture);
            // Overlay companions carry biome color in a second pass the
            // renderer composites; they never become geometry here.
            if texture.ends_with("_overlay") {
                continue;
            }

            let tint = self
                .tints
                .tint_for(block, &texture, face.tintindex)
                .map(quantize_tint)
                .unwrap_or(WHITE);

            let rotation = normalize_rotation(face.rotation);
            let material = self
                .registry
                .intern(MaterialKey::new(texture, tint, rotation), category);

            out[direction.bit() as usize] = ProcessedFace {
                material: Some(material),
                uv: face.normalized_uv(direction, &element.from, &element.to),
                rotation,
            };
        }

        out
    }
}

/// Normalize a rotation to {0, 90, 180, 270}. Off-grid angles snap down to
/// the nearest quarter turn.
pub fn normalize_rotation(rotation: i32) -> u16 {
    let wrapped = ((rotation % 360) + 360) % 360;
    (wrapped / 90 * 90) as u16
}

/// Rotate the four UV corners of a rectangle by quarter turns.
///
/// Corners are in perimeter order (top-left, top-right, bottom-right,
/// bottom-left); each 90-degree step is one quarter turn of the corner
/// assignment. Zero rotation returns the input unchanged.
pub fn rotate_uv_corners(corners: [[f32; 2]; 4], rotation: u16) -> [[f32; 2]; 4] {
    let steps = (rotation / 90) % 4;
    let mut result = corners;
    for _ in 0..steps {
        result = [result[3], result[0], result[1], result[2]];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Face, MISSING_TEXTURE};

    fn full_cube_element(texture: &str, tintindex: i32) -> Element {
        let faces = Direction::ALL
            .iter()
            .map(|dir| {
                (
                    *dir,
                    Some(Face {
                        uv: None,
                        texture: texture.to_string(),
                        cullface: Some(dir.to_string()),
                        rotation: 0,
                        tintindex,
                    }),
                )
            })
            .collect();
        Element {
            from: [0.0; 3],
            to: [1.0; 3],
            rotation: None,
            shade: true,
            faces,
        }
    }

    fn model_with(texture_key: &str, texture: &str) -> Model {
        Model {
            textures: [(texture_key.to_string(), texture.to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_interns_one_material_per_texture() {
        let registry = MaterialRegistry::new();
        let processor = FaceProcessor::new(&registry);
        let block = BlockKey::new("minecraft:stone");
        let model = model_with("all", "block/stone");
        let element = full_cube_element("#all", -1);

        let faces = processor.process(&block, Category::Solid, &model, &element);

        for face in &faces {
            assert_eq!(face.material, Some(0));
            assert_eq!(face.uv, [0.0, 0.0, 1.0, 1.0]);
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_absent_faces_have_no_material() {
        let registry = MaterialRegistry::new();
        let processor = FaceProcessor::new(&registry);
        let block = BlockKey::new("minecraft:stone");
        let model = Model::default();
        let element = Element {
            from: [0.0; 3],
            to: [1.0; 3],
            rotation: None,
            shade: true,
            faces: [(
                Direction::Up,
                Some(Face {
                    uv: None,
                    texture: "block/stone".to_string(),
                    cullface: None,
                    rotation: 0,
                    tintindex: -1,
                }),
            )]
            .into_iter()
            .collect(),
        };

        let faces = processor.process(&block, Category::Solid, &model, &element);
        assert!(faces[Direction::Up.bit() as usize].material.is_some());
        assert!(faces[Direction::Down.bit() as usize].material.is_none());
        assert_eq!(faces[Direction::Down.bit() as usize].uv, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_overlay_sentinel_skipped() {
        let registry = MaterialRegistry::new();
        let processor = FaceProcessor::new(&registry);
        let block = BlockKey::new("minecraft:grass_block");
        let model = model_with("overlay", "block/grass_block_side_overlay");
        let element = full_cube_element("#overlay", 0);

        let faces = processor.process(&block, Category::Solid, &model, &element);
        assert!(faces.iter().all(|f| f.material.is_none()));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unresolved_reference_becomes_missing_texture() {
        let registry = MaterialRegistry::new();
        let processor = FaceProcessor::new(&registry);
        let block = BlockKey::new("minecraft:stone");
        let model = Model::default();
        let element = full_cube_element("#nope", -1);

        processor.process(&block, Category::Solid, &model, &element);
        let info = registry.get(0).unwrap();
        assert_eq!(info.key.texture, MISSING_TEXTURE);
    }

    #[test]
    fn test_redstone_tint_by_power() {
        let registry = MaterialRegistry::new();
        let processor = FaceProcessor::new(&registry);
        let model = model_with("line", "block/redstone_dust_line0");
        let element = full_cube_element("#line", 0);

        let p7 = BlockKey::new("minecraft:redstone_wire").with_property("power", "7");
        let p8 = BlockKey::new("minecraft:redstone_wire").with_property("power", "8");

        let faces7 = processor.process(&p7, Category::Redstone, &model, &element);
        let faces8 = processor.process(&p8, Category::Redstone, &model, &element);

        // Same texture, different tint: distinct materials.
        let m7 = faces7[0].material.unwrap();
        let m8 = faces8[0].material.unwrap();
        assert_ne!(m7, m8);
        assert_eq!(
            registry.get(m7).unwrap().key.texture,
            registry.get(m8).unwrap().key.texture
        );

        // Power 7 maps to the 8th table entry.
        let table = TintTable::default();
        assert_eq!(
            registry.get(m7).unwrap().key.tint,
            quantize_tint(table.redstone[7])
        );
    }

    #[test]
    fn test_water_and_lava_sentinels() {
        let table = TintTable::default();
        let water = BlockKey::new("minecraft:water");
        assert_eq!(
            table.tint_for(&water, "block/water_still", 0),
            Some(table.water)
        );
        let lava = BlockKey::new("minecraft:lava");
        assert_eq!(table.tint_for(&lava, "block/lava_still", 0), Some(table.lava));
        // Untinted faces never tint, whatever the texture.
        assert_eq!(table.tint_for(&water, "block/water_still", -1), None);
    }

    #[test]
    fn test_uv_rotation_law() {
        let corners = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        // 360 degrees is identity.
        assert_eq!(rotate_uv_corners(corners, normalize_rotation(360)), corners);
        // Four quarter turns are identity.
        let mut rotated = corners;
        for _ in 0..4 {
            rotated = rotate_uv_corners(rotated, 90);
        }
        assert_eq!(rotated, corners);
        // One quarter turn moves the last corner first.
        let once = rotate_uv_corners(corners, 90);
        assert_eq!(once[0], corners[3]);
        assert_eq!(once[1], corners[0]);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(270), 270);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
    }
}
