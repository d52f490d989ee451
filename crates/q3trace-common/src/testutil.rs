// testutil.rs — In-memory BSP files for tests

use crate::cmodel::CollisionModel;
use crate::q_shared::Vec3;
use crate::qfiles::{
    BSP_VERSION, HEADER_LUMPS, HEADER_SIZE, IBSP_IDENT, LUMP_BRUSHES, LUMP_BRUSHSIDES,
    LUMP_LEAFBRUSHES, LUMP_LEAFS, LUMP_NODES, LUMP_PLANES, LUMP_TEXTURES, MAX_TEXTURE_NAME,
};

/// Builds a minimal IBSP file record by record. Indices returned by the
/// builder methods are the raw on-disk values.
#[derive(Default)]
pub struct MapBuilder {
    textures: Vec<(String, i32, i32)>,
    planes: Vec<(Vec3, f32)>,
    nodes: Vec<(i32, [i32; 2])>,
    leafs: Vec<(i32, i32)>,
    leaf_brushes: Vec<i32>,
    brushes: Vec<(i32, i32, i32)>,
    sides: Vec<(i32, i32)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&mut self, name: &str, surface_flags: i32, contents: i32) -> i32 {
        self.textures.push((name.to_string(), surface_flags, contents));
        self.textures.len() as i32 - 1
    }

    /// Adds the plane and its flipped twin, returning the first.
    pub fn plane(&mut self, normal: Vec3, dist: f32) -> i32 {
        let index = self.planes.len() as i32;
        self.planes.push((normal, dist));
        self.planes.push(([-normal[0], -normal[1], -normal[2]], -dist));
        index
    }

    pub fn node(&mut self, plane: i32, front: i32, back: i32) -> i32 {
        self.nodes.push((plane, [front, back]));
        self.nodes.len() as i32 - 1
    }

    /// Adds a leaf holding `brushes` and returns it as a node child value.
    pub fn leaf(&mut self, brushes: &[i32]) -> i32 {
        let first = self.leaf_brushes.len() as i32;
        self.leaf_brushes.extend_from_slice(brushes);
        self.raw_leaf(first, brushes.len() as i32)
    }

    pub fn raw_leaf(&mut self, first_leaf_brush: i32, num_leaf_brushes: i32) -> i32 {
        self.leafs.push((first_leaf_brush, num_leaf_brushes));
        -(self.leafs.len() as i32)
    }

    pub fn brush(&mut self, planes: &[i32], texture: i32) -> i32 {
        let first = self.sides.len() as i32;
        for &plane in planes {
            self.sides.push((plane, texture));
        }
        self.brushes.push((first, planes.len() as i32, texture));
        self.brushes.len() as i32 - 1
    }

    /// Box brush with sides in the -X,+X,-Y,+Y,-Z,+Z order the compiler uses.
    pub fn axial_box(&mut self, mins: Vec3, maxs: Vec3, texture: i32) -> i32 {
        let mut planes = Vec::with_capacity(6);
        for axis in 0..3 {
            let mut normal = [0.0; 3];
            normal[axis] = -1.0;
            planes.push(self.plane(normal, -mins[axis]));
            normal[axis] = 1.0;
            planes.push(self.plane(normal, maxs[axis]));
        }
        self.brush(&planes, texture)
    }

    /// A side not owned by any brush.
    pub fn raw_side(&mut self, plane: i32, texture: i32) {
        self.sides.push((plane, texture));
    }

    /// Adds a side to the most recently built brush.
    pub fn append_side(&mut self, brush: i32, plane: i32, texture: i32) {
        let b = &mut self.brushes[brush as usize];
        assert_eq!(
            (b.0 + b.1) as usize,
            self.sides.len(),
            "can only extend the last brush"
        );
        b.1 += 1;
        self.sides.push((plane, texture));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); HEADER_LUMPS];

        let out = &mut lumps[LUMP_TEXTURES];
        for (name, surface_flags, contents) in &self.textures {
            let mut raw = [0u8; MAX_TEXTURE_NAME];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&raw);
            put_i32(out, *surface_flags);
            put_i32(out, *contents);
        }

        let out = &mut lumps[LUMP_PLANES];
        for (normal, dist) in &self.planes {
            for c in normal {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.extend_from_slice(&dist.to_le_bytes());
        }

        let out = &mut lumps[LUMP_NODES];
        for (plane, children) in &self.nodes {
            put_i32(out, *plane);
            put_i32(out, children[0]);
            put_i32(out, children[1]);
            out.extend_from_slice(&[0u8; 24]);
        }

        let out = &mut lumps[LUMP_LEAFS];
        for (first, count) in &self.leafs {
            // cluster, area, mins, maxs, leaf faces
            out.extend_from_slice(&[0u8; 40]);
            put_i32(out, *first);
            put_i32(out, *count);
        }

        let out = &mut lumps[LUMP_LEAFBRUSHES];
        for brush in &self.leaf_brushes {
            put_i32(out, *brush);
        }

        let out = &mut lumps[LUMP_BRUSHES];
        for (first, count, texture) in &self.brushes {
            put_i32(out, *first);
            put_i32(out, *count);
            put_i32(out, *texture);
        }

        let out = &mut lumps[LUMP_BRUSHSIDES];
        for (plane, texture) in &self.sides {
            put_i32(out, *plane);
            put_i32(out, *texture);
        }

        let mut data = Vec::new();
        data.extend_from_slice(&IBSP_IDENT);
        put_i32(&mut data, BSP_VERSION);
        let mut ofs = HEADER_SIZE;
        for lump in &lumps {
            put_i32(&mut data, ofs as i32);
            put_i32(&mut data, lump.len() as i32);
            ofs += lump.len();
        }
        for lump in &lumps {
            data.extend_from_slice(lump);
        }
        data
    }
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// A single 1x1x1 brush centred on the origin, split by the x = 0 plane so
/// both leaves reference it.
pub fn unit_cube_map(contents: i32) -> Vec<u8> {
    let mut map = MapBuilder::new();
    let tex = map.texture("textures/common/solid", 0, contents);
    let split = map.plane([1.0, 0.0, 0.0], 0.0);
    let cube = map.axial_box([-0.5; 3], [0.5; 3], tex);
    let front = map.leaf(&[cube]);
    let back = map.leaf(&[cube]);
    map.node(split, front, back);
    map.to_bytes()
}

pub fn unit_cube_model(contents: i32) -> CollisionModel {
    CollisionModel::from_bytes(&unit_cube_map(contents)).unwrap()
}
