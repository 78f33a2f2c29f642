//! Single-block mesh building: one canonical mesh per block, no world
//! context.
//!
//! Quads carry four vertices each and flatten into two triangles with the
//! corner order `(0, 1, 2, 2, 1, 3)`.

use crate::content::Element;
use crate::error::ErrorCounts;
use crate::mesh::face::{rotate_uv_corners, FaceProcessor, ProcessedFace};
use crate::resolver::{ModelResolver, StateResolver};
use crate::types::{BlockKey, Category, Direction, ElementRotation, HolderTransform};
use glam::{Mat3, Vec3};
use tracing::debug;

/// One textured quad of a block mesh, in block-local [0, 1] space.
#[derive(Debug, Clone)]
pub struct BlockQuad {
    /// Interned material index.
    pub material: u32,
    /// The canonical face this quad came from.
    pub face: Direction,
    /// Corner positions: top-left, bottom-left, top-right, bottom-right.
    pub positions: [[f32; 3]; 4],
    /// Per-corner normals (identical unless the element is rotated).
    pub normals: [[f32; 3]; 4],
    /// Per-corner UVs, V already flipped for the host convention.
    pub uvs: [[f32; 2]; 4],
}

/// The canonical mesh of a single block.
#[derive(Debug, Clone, Default)]
pub struct BlockMesh {
    pub quads: Vec<BlockQuad>,
}

impl BlockMesh {
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

/// Builds canonical block meshes by composing the resolvers and the face
/// processor. Content errors are recovered locally and counted; the
/// returned mesh is simply empty (or partial) when content is broken.
pub struct BlockMeshBuilder<'a> {
    states: &'a StateResolver<'a>,
    models: &'a ModelResolver<'a>,
    faces: &'a FaceProcessor<'a>,
}

impl<'a> BlockMeshBuilder<'a> {
    pub fn new(
        states: &'a StateResolver<'a>,
        models: &'a ModelResolver<'a>,
        faces: &'a FaceProcessor<'a>,
    ) -> Self {
        Self {
            states,
            models,
            faces,
        }
    }

    /// Build the canonical mesh for one block.
    pub fn build(&self, block: &BlockKey, counts: &mut ErrorCounts) -> BlockMesh {
        let mut mesh = BlockMesh::default();

        let holders = match self.states.resolve(block) {
            Ok(holders) => holders,
            Err(e) => {
                debug!(block = %block.name, error = %e, "skipping block without model");
                counts.record(e.kind());
                return mesh;
            }
        };

        let category = Category::of(block);

        for holder in holders {
            let model = match self.models.resolve(&holder.model, block) {
                Ok(model) => model,
                Err(e) => {
                    // Pathological parent chains degrade to empty models.
                    debug!(model = %holder.model, error = %e, "model resolution failed");
                    counts.record(e.kind());
                    continue;
                }
            };
            let transform =
                HolderTransform::new(holder.x, holder.y, holder.z, holder.uv_lock);

            for element in &model.elements {
                let processed = self.faces.process(block, category, &model, element);
                emit_element(&mut mesh, element, &processed, &transform);
            }
        }

        mesh
    }
}

/// Emit the visible faces of one element as quads.
fn emit_element(
    mesh: &mut BlockMesh,
    element: &Element,
    processed: &[ProcessedFace; 6],
    transform: &HolderTransform,
) {
    for direction in Direction::ALL {
        let face = &processed[direction.bit() as usize];
        let Some(material) = face.material else {
            continue;
        };

        let mut positions = corner_positions(direction, element.from, element.to);
        let mut normal = direction.normal();

        if let Some(rotation) = &element.rotation {
            apply_element_rotation(&mut positions, &mut normal, rotation);
        }

        for p in &mut positions {
            *p = transform.rotate_point(*p);
        }
        normal = transform.rotate_vector(normal);

        let uvs = corner_uvs(face.uv, face.rotation);

        mesh.quads.push(BlockQuad {
            material,
            face: transform.rotate_direction(direction),
            positions,
            normals: [normal; 4],
            uvs,
        });
    }
}

/// Corner positions for a face, interpolated from `from`/`to`.
///
/// Order is top-left, bottom-left, top-right, bottom-right so that the
/// `(0,1,2)(2,1,3)` triangles wind counter-clockwise seen from outside.
pub(crate) fn corner_positions(direction: Direction, from: [f32; 3], to: [f32; 3]) -> [[f32; 3]; 4] {
    let [x0, y0, z0] = from;
    let [x1, y1, z1] = to;
    match direction {
        Direction::Down => [
            [x0, y0, z1],
            [x0, y0, z0],
            [x1, y0, z1],
            [x1, y0, z0],
        ],
        Direction::Up => [
            [x0, y1, z0],
            [x0, y1, z1],
            [x1, y1, z0],
            [x1, y1, z1],
        ],
        Direction::North => [
            [x1, y1, z0],
            [x1, y0, z0],
            [x0, y1, z0],
            [x0, y0, z0],
        ],
        Direction::South => [
            [x0, y1, z1],
            [x0, y0, z1],
            [x1, y1, z1],
            [x1, y0, z1],
        ],
        Direction::West => [
            [x0, y1, z0],
            [x0, y0, z0],
            [x0, y1, z1],
            [x0, y0, z1],
        ],
        Direction::East => [
            [x1, y1, z1],
            [x1, y0, z1],
            [x1, y1, z0],
            [x1, y0, z0],
        ],
    }
}

/// Per-corner UVs for a face rectangle, with the rotation applied as a
/// quarter-turn corner swap and V flipped on emission.
pub(crate) fn corner_uvs(uv: [f32; 4], rotation: u16) -> [[f32; 2]; 4] {
    let [u0, v0, u1, v1] = uv;
    // Perimeter order for rotation: TL, TR, BR, BL.
    let perimeter = rotate_uv_corners([[u0, v0], [u1, v0], [u1, v1], [u0, v1]], rotation);
    // Reorder to the corner-position order (TL, BL, TR, BR) and flip V.
    let strip = [perimeter[0], perimeter[3], perimeter[1], perimeter[2]];
    strip.map(|[u, v]| [u, 1.0 - v])
}

/// Rotate quad corners (and the face normal) about the element's rotation
/// origin. With `rescale`, the two coordinates orthogonal to the axis are
/// stretched by `1/cos(angle)` before the rotation.
fn apply_element_rotation(
    positions: &mut [[f32; 3]; 4],
    normal: &mut [f32; 3],
    rotation: &ElementRotation,
) {
    let origin = Vec3::from_array(rotation.origin);
    let angle = rotation.angle_radians();
    let rescale = rotation.rescale_factor();
    let axis = rotation.axis.index();

    let matrix = match rotation.axis {
        crate::types::Axis::X => Mat3::from_rotation_x(angle),
        crate::types::Axis::Y => Mat3::from_rotation_y(angle),
        crate::types::Axis::Z => Mat3::from_rotation_z(angle),
    };

    for position in positions.iter_mut() {
        let mut p = Vec3::from_array(*position) - origin;
        if rescale != 1.0 {
            for i in 0..3 {
                if i != axis {
                    p[i] *= rescale;
                }
            }
        }
        *position = (matrix * p + origin).to_array();
    }

    *normal = (matrix * Vec3::from_array(*normal)).normalize().to_array();
}
