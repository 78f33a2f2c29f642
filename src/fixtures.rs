//! Shared test content: an in-memory resource pack with the block
//! definitions the scenario tests exercise, plus palette helpers.

use crate::error::ErrorCounts;
use crate::mesh::{BlockMeshBuilder, FaceProcessor, Palette, PaletteCompiler};
use crate::provider::MemoryPack;
use crate::registry::{MaterialInfo, MaterialRegistry};
use crate::resolver::{ModelResolver, StateResolver};
use crate::schematic::MapSchematic;

/// Build the standard test pack.
pub fn test_pack() -> MemoryPack {
    let mut pack = MemoryPack::new();

    // --- base models ---
    pack.insert_text(
        "models/block/cube.json",
        r##"{
            "elements": [{
                "from": [0, 0, 0],
                "to": [16, 16, 16],
                "faces": {
                    "down":  { "texture": "#down",  "cullface": "down" },
                    "up":    { "texture": "#up",    "cullface": "up" },
                    "north": { "texture": "#north", "cullface": "north" },
                    "south": { "texture": "#south", "cullface": "south" },
                    "west":  { "texture": "#west",  "cullface": "west" },
                    "east":  { "texture": "#east",  "cullface": "east" }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "models/block/cube_all.json",
        r##"{
            "parent": "block/cube",
            "textures": {
                "particle": "#all",
                "down": "#all", "up": "#all",
                "north": "#all", "south": "#all",
                "west": "#all", "east": "#all"
            }
        }"##,
    );
    pack.insert_text(
        "models/block/orientable.json",
        r##"{
            "parent": "block/cube",
            "textures": {
                "particle": "#front",
                "down": "#top", "up": "#top",
                "north": "#front",
                "south": "#side", "west": "#side", "east": "#side"
            }
        }"##,
    );

    // --- full cubes ---
    pack.insert_text(
        "models/block/stone.json",
        r#"{ "parent": "block/cube_all", "textures": { "all": "block/stone" } }"#,
    );
    pack.insert_text(
        "blockstates/stone.json",
        r#"{ "variants": { "": { "model": "block/stone" } } }"#,
    );
    pack.insert_text(
        "models/block/glass.json",
        r#"{ "parent": "block/cube_all", "textures": { "all": "block/glass" } }"#,
    );
    pack.insert_text(
        "blockstates/glass.json",
        r#"{ "variants": { "": { "model": "block/glass" } } }"#,
    );

    // --- furnace (directional full cube) ---
    pack.insert_text(
        "models/block/furnace.json",
        r#"{
            "parent": "block/orientable",
            "textures": {
                "top": "block/furnace_top",
                "front": "block/furnace_front",
                "side": "block/furnace_side"
            }
        }"#,
    );
    pack.insert_text(
        "blockstates/furnace.json",
        r#"{ "variants": {
            "facing=north": { "model": "block/furnace" },
            "facing=east":  { "model": "block/furnace", "y": 90 },
            "facing=south": { "model": "block/furnace", "y": 180 },
            "facing=west":  { "model": "block/furnace", "y": 270 }
        } }"#,
    );

    // --- fence (multipart) ---
    pack.insert_text(
        "models/block/oak_fence_post.json",
        r##"{
            "textures": { "texture": "block/oak_planks" },
            "elements": [{
                "from": [6, 0, 6],
                "to": [10, 16, 10],
                "faces": {
                    "down":  { "texture": "#texture" },
                    "up":    { "texture": "#texture" },
                    "north": { "texture": "#texture" },
                    "south": { "texture": "#texture" },
                    "west":  { "texture": "#texture" },
                    "east":  { "texture": "#texture" }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "models/block/oak_fence_side.json",
        r##"{
            "textures": { "texture": "block/oak_planks" },
            "elements": [{
                "from": [7, 12, 0],
                "to": [9, 15, 6],
                "faces": {
                    "down":  { "texture": "#texture" },
                    "up":    { "texture": "#texture" },
                    "north": { "texture": "#texture" },
                    "south": { "texture": "#texture" },
                    "west":  { "texture": "#texture" },
                    "east":  { "texture": "#texture" }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "blockstates/oak_fence.json",
        r#"{ "multipart": [
            { "apply": { "model": "block/oak_fence_post" } },
            { "when": { "north": "true" }, "apply": { "model": "block/oak_fence_side" } },
            { "when": { "east": "true" }, "apply": { "model": "block/oak_fence_side", "y": 90 } },
            { "when": { "south": "true" }, "apply": { "model": "block/oak_fence_side", "y": 180 } },
            { "when": { "west": "true" }, "apply": { "model": "block/oak_fence_side", "y": 270 } }
        ] }"#,
    );

    // --- stairs (multi-element, rotated variants) ---
    pack.insert_text(
        "models/block/oak_stairs.json",
        r##"{
            "textures": { "all": "block/oak_planks" },
            "elements": [
                {
                    "from": [0, 0, 0], "to": [16, 8, 8],
                    "faces": {
                        "down": { "texture": "#all" }, "up": { "texture": "#all" },
                        "north": { "texture": "#all" }, "south": { "texture": "#all" },
                        "west": { "texture": "#all" }, "east": { "texture": "#all" }
                    }
                },
                {
                    "from": [0, 0, 8], "to": [16, 8, 16],
                    "faces": {
                        "down": { "texture": "#all" }, "up": { "texture": "#all" },
                        "north": { "texture": "#all" }, "south": { "texture": "#all" },
                        "west": { "texture": "#all" }, "east": { "texture": "#all" }
                    }
                },
                {
                    "from": [0, 8, 8], "to": [16, 16, 12],
                    "faces": {
                        "down": { "texture": "#all" }, "up": { "texture": "#all" },
                        "north": { "texture": "#all" }, "south": { "texture": "#all" },
                        "west": { "texture": "#all" }, "east": { "texture": "#all" }
                    }
                },
                {
                    "from": [0, 8, 12], "to": [16, 16, 16],
                    "faces": {
                        "down": { "texture": "#all" }, "up": { "texture": "#all" },
                        "north": { "texture": "#all" }, "south": { "texture": "#all" },
                        "west": { "texture": "#all" }, "east": { "texture": "#all" }
                    }
                }
            ]
        }"##,
    );
    pack.insert_text(
        "blockstates/oak_stairs.json",
        r#"{ "variants": {
            "facing=north,half=bottom": { "model": "block/oak_stairs" },
            "facing=east,half=bottom":  { "model": "block/oak_stairs", "y": 90 },
            "facing=south,half=bottom": { "model": "block/oak_stairs", "y": 180 },
            "facing=west,half=bottom":  { "model": "block/oak_stairs", "y": 270 },
            "facing=north,half=top": { "model": "block/oak_stairs", "x": 180 },
            "facing=east,half=top":  { "model": "block/oak_stairs", "x": 180, "y": 90 },
            "facing=south,half=top": { "model": "block/oak_stairs", "x": 180, "y": 180 },
            "facing=west,half=top":  { "model": "block/oak_stairs", "x": 180, "y": 270 }
        } }"#,
    );

    // --- slabs ---
    pack.insert_text(
        "models/block/stone_slab.json",
        r##"{
            "textures": { "all": "block/stone" },
            "elements": [{
                "from": [0, 0, 0], "to": [16, 8, 16],
                "faces": {
                    "down": { "texture": "#all", "cullface": "down" },
                    "up": { "texture": "#all" },
                    "north": { "texture": "#all", "cullface": "north" },
                    "south": { "texture": "#all", "cullface": "south" },
                    "west": { "texture": "#all", "cullface": "west" },
                    "east": { "texture": "#all", "cullface": "east" }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "models/block/stone_slab_top.json",
        r##"{
            "textures": { "all": "block/stone" },
            "elements": [{
                "from": [0, 8, 0], "to": [16, 16, 16],
                "faces": {
                    "down": { "texture": "#all" },
                    "up": { "texture": "#all", "cullface": "up" },
                    "north": { "texture": "#all", "cullface": "north" },
                    "south": { "texture": "#all", "cullface": "south" },
                    "west": { "texture": "#all", "cullface": "west" },
                    "east": { "texture": "#all", "cullface": "east" }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "blockstates/stone_slab.json",
        r#"{ "variants": {
            "type=bottom": { "model": "block/stone_slab" },
            "type=top": { "model": "block/stone_slab_top" },
            "type=double": { "model": "block/stone" }
        } }"#,
    );

    // --- redstone dust (tinted flat quad) ---
    pack.insert_text(
        "models/block/redstone_dust_dot.json",
        r##"{
            "textures": { "line": "block/redstone_dust_dot" },
            "elements": [{
                "from": [0, 0, 0], "to": [16, 0.5, 16],
                "faces": {
                    "up": { "texture": "#line", "tintindex": 0 }
                }
            }]
        }"##,
    );
    pack.insert_text(
        "blockstates/redstone_wire.json",
        r#"{ "variants": { "": { "model": "block/redstone_dust_dot" } } }"#,
    );

    pack
}

/// Compile a palette for a world against the standard test pack.
pub fn compile_palette(world: &MapSchematic) -> (Palette, Vec<MaterialInfo>) {
    let pack = test_pack();
    let registry = MaterialRegistry::new();
    let mut counts = ErrorCounts::new();
    let palette = {
        let states = StateResolver::new(&pack);
        let models = ModelResolver::new(&pack);
        let faces = FaceProcessor::new(&registry);
        let builder = BlockMeshBuilder::new(&states, &models, &faces);
        PaletteCompiler::new(builder).compile(world, &mut counts)
    };
    (palette, registry.snapshot())
}
