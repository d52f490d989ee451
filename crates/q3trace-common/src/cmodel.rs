// cmodel.rs — Collision model loading
//
// The map is decoded once into flat arrays addressed by typed indices and is
// read-only afterwards. Only the seven lumps used for collision are read.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crc::{Crc, CRC_32_ISO_HDLC};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::LoadError;
use crate::q_shared::{dot_product, ContentFlags, SurfaceFlags, Vec3};
use crate::qfiles::{
    DBrush, DBrushSide, DHeader, DLeaf, DLeafBrush, DNode, DPlane, DTexture, LumpRecord,
    BSP_VERSION, HEADER_SIZE, IBSP_IDENT, LUMP_NAMES,
};

// ============================================================
// Typed indices
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrushId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// One side of a BSP node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeChild {
    Node(NodeId),
    Leaf(LeafId),
}

impl NodeChild {
    /// Decode a child index as stored on disk: `c >= 0` is node `c`,
    /// `c < 0` is leaf `-(c + 1)`.
    pub fn from_raw(c: i32) -> Self {
        if c >= 0 {
            NodeChild::Node(NodeId(c as usize))
        } else {
            NodeChild::Leaf(LeafId((-1 - c) as usize))
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            NodeChild::Node(NodeId(n)) => n as i32,
            NodeChild::Leaf(LeafId(l)) => -1 - l as i32,
        }
    }
}

// ============================================================
// Runtime structures
// ============================================================

/// Planes are paired in the file: `i` and `i ^ 1` are coincident with
/// opposite normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
}

impl CPlane {
    /// Signed distance of `p` from the plane, positive on the normal side.
    #[inline]
    pub fn distance_to(&self, p: &Vec3) -> f32 {
        dot_product(p, &self.normal) - self.dist
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTexture {
    pub name: String,
    pub surface_flags: SurfaceFlags,
    pub contents: ContentFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CNode {
    pub plane: PlaneId,
    /// [front, back]
    pub children: [NodeChild; 2],
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CLeaf {
    pub cluster: i32,
    pub area: i32,
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
    pub first_leaf_face: i32,
    pub num_leaf_faces: i32,
    pub first_leaf_brush: usize,
    pub num_leaf_brushes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CBrush {
    pub first_side: usize,
    pub num_sides: i32,
    pub texture: TextureId,
    /// World-space bounds. Unbounded (`-inf..inf`) when `axial_bounds` is false.
    pub mins: Vec3,
    pub maxs: Vec3,
    /// The bounds came from the brush's own axial sides.
    pub axial_bounds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CBrushSide {
    pub plane: PlaneId,
    pub texture: i32,
}

// ============================================================
// Constants
// ============================================================

/// Below this record count, sequential decoding is faster.
const PARALLEL_LUMP_THRESHOLD: usize = 64;

/// Per-component tolerance when checking that a brush side is axis-aligned.
const AXIAL_NORMAL_EPSILON: f32 = 1.0e-5;

const UNBOUNDED_MINS: Vec3 = [f32::NEG_INFINITY; 3];
const UNBOUNDED_MAXS: Vec3 = [f32::INFINITY; 3];

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

// ============================================================
// Collision model
// ============================================================

/// Immutable collision geometry of one map.
#[derive(Debug, Clone, Default)]
pub struct CollisionModel {
    pub textures: Vec<MapTexture>,
    pub planes: Vec<CPlane>,
    pub nodes: Vec<CNode>,
    pub leafs: Vec<CLeaf>,
    pub leaf_brushes: Vec<BrushId>,
    pub brushes: Vec<CBrush>,
    pub brush_sides: Vec<CBrushSide>,
    /// CRC-32 of the file the model was decoded from.
    pub checksum: u32,
}

/// Load a BSP map from disk.
pub fn load_map<P: AsRef<Path>>(path: P) -> Result<CollisionModel, LoadError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let model = CollisionModel::from_bytes(&data)?;
    info!("loaded {} ({})", path.display(), model.summary());
    Ok(model)
}

impl CollisionModel {
    /// Decode a map from raw file bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        let header = DHeader::read(data).ok_or(LoadError::TruncatedRead {
            what: "header",
            offset: 0,
            len: HEADER_SIZE as i64,
            file_len: data.len(),
        })?;

        if header.ident != IBSP_IDENT {
            return Err(LoadError::BadMagic { found: header.ident });
        }
        if header.version != BSP_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: header.version,
                expected: BSP_VERSION,
            });
        }

        let textures = read_lump::<DTexture>(data, &header)?;
        let planes = read_lump::<DPlane>(data, &header)?;
        let nodes = read_lump::<DNode>(data, &header)?;
        let leafs = read_lump::<DLeaf>(data, &header)?;
        let leaf_brushes = read_lump::<DLeafBrush>(data, &header)?;
        let brushes = read_lump::<DBrush>(data, &header)?;
        let brush_sides = read_lump::<DBrushSide>(data, &header)?;

        let mut model = CollisionModel {
            textures: textures
                .iter()
                .map(|t| MapTexture {
                    name: t.name_str(),
                    surface_flags: SurfaceFlags::from_bits_retain(t.surface_flags as u32),
                    contents: ContentFlags::from_bits_retain(t.content_flags as u32),
                })
                .collect(),
            planes: planes
                .iter()
                .map(|p| CPlane {
                    normal: p.normal,
                    dist: p.dist,
                })
                .collect(),
            checksum: CRC32.checksum(data),
            ..Default::default()
        };

        model.brush_sides = convert_brush_sides(&brush_sides, model.planes.len())?;
        model.brushes = convert_brushes(&brushes, model.brush_sides.len(), model.textures.len())?;
        model.leaf_brushes = convert_leaf_brushes(&leaf_brushes, model.brushes.len())?;
        model.leafs = convert_leafs(&leafs, model.leaf_brushes.len())?;
        model.nodes = convert_nodes(&nodes, model.planes.len(), model.leafs.len())?;
        check_node_cycles(&model.nodes)?;

        let non_axial = model.compute_brush_bounds();
        if non_axial > 0 {
            warn!(
                "{} of {} brushes lack axial bounding sides, leaf culling disabled for them",
                non_axial,
                model.brushes.len()
            );
        }

        Ok(model)
    }

    /// Fill in each brush's AABB from its first six sides, which the map
    /// compiler emits as -X,+X,-Y,+Y,-Z,+Z. Returns the number of brushes
    /// that don't follow that layout.
    fn compute_brush_bounds(&mut self) -> usize {
        let planes = &self.planes;
        let sides = &self.brush_sides;
        let mut non_axial = 0;

        for (i, brush) in self.brushes.iter_mut().enumerate() {
            let brush_sides = if brush.num_sides > 0 {
                &sides[brush.first_side..brush.first_side + brush.num_sides as usize]
            } else {
                &[][..]
            };

            match axial_bounds(brush_sides, planes) {
                Some((mins, maxs)) => {
                    brush.mins = mins;
                    brush.maxs = maxs;
                    brush.axial_bounds = true;
                }
                None => {
                    debug!("brush {} has no axial bounds ({} sides)", i, brush.num_sides);
                    brush.mins = UNBOUNDED_MINS;
                    brush.maxs = UNBOUNDED_MAXS;
                    brush.axial_bounds = false;
                    non_axial += 1;
                }
            }
        }

        non_axial
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn plane(&self, id: PlaneId) -> &CPlane {
        &self.planes[id.0]
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &CNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn leaf(&self, id: LeafId) -> &CLeaf {
        &self.leafs[id.0]
    }

    #[inline]
    pub fn brush(&self, id: BrushId) -> &CBrush {
        &self.brushes[id.0]
    }

    #[inline]
    pub fn texture(&self, id: TextureId) -> &MapTexture {
        &self.textures[id.0]
    }

    /// Brushes referenced by a leaf.
    pub fn leaf_brushes(&self, leaf: &CLeaf) -> &[BrushId] {
        &self.leaf_brushes[leaf.first_leaf_brush..leaf.first_leaf_brush + leaf.num_leaf_brushes]
    }

    /// Sides bounding a brush; empty for brushes with no sides.
    pub fn brush_sides(&self, brush: &CBrush) -> &[CBrushSide] {
        if brush.num_sides <= 0 {
            return &[];
        }
        &self.brush_sides[brush.first_side..brush.first_side + brush.num_sides as usize]
    }

    /// Only brushes whose texture carries the solid content bit collide.
    #[inline]
    pub fn is_solid(&self, brush: &CBrush) -> bool {
        self.texture(brush.texture).contents.contains(ContentFlags::SOLID)
    }

    pub fn summary(&self) -> MapSummary {
        MapSummary {
            textures: self.textures.len(),
            planes: self.planes.len(),
            nodes: self.nodes.len(),
            leafs: self.leafs.len(),
            leaf_brushes: self.leaf_brushes.len(),
            brushes: self.brushes.len(),
            brush_sides: self.brush_sides.len(),
            solid_brushes: self.brushes.iter().filter(|b| self.is_solid(b)).count(),
            non_axial_brushes: self.brushes.iter().filter(|b| !b.axial_bounds).count(),
            checksum: self.checksum,
        }
    }
}

// ============================================================
// Summary
// ============================================================

/// Record counts of a loaded map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSummary {
    pub textures: usize,
    pub planes: usize,
    pub nodes: usize,
    pub leafs: usize,
    pub leaf_brushes: usize,
    pub brushes: usize,
    pub brush_sides: usize,
    pub solid_brushes: usize,
    pub non_axial_brushes: usize,
    pub checksum: u32,
}

impl fmt::Display for MapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} textures, {} planes, {} nodes, {} leafs, {} leafbrushes, \
             {} brushes ({} solid, {} non-axial), {} brushsides, checksum {:08x}",
            self.textures,
            self.planes,
            self.nodes,
            self.leafs,
            self.leaf_brushes,
            self.brushes,
            self.solid_brushes,
            self.non_axial_brushes,
            self.brush_sides,
            self.checksum
        )
    }
}

// ============================================================
// Lump decoding
// ============================================================

fn read_lump<T: LumpRecord>(data: &[u8], header: &DHeader) -> Result<Vec<T>, LoadError> {
    let lump = header.lumps[T::LUMP];
    let name = LUMP_NAMES[T::LUMP];
    let truncated = || LoadError::TruncatedRead {
        what: name,
        offset: lump.fileofs as i64,
        len: lump.filelen as i64,
        file_len: data.len(),
    };

    if lump.fileofs < 0 || lump.filelen < 0 {
        return Err(truncated());
    }
    let ofs = lump.fileofs as usize;
    let len = lump.filelen as usize;

    if len % T::SIZE != 0 {
        warn!(
            "{} lump length {} is not a multiple of {}, ignoring {} trailing bytes",
            name,
            len,
            T::SIZE,
            len % T::SIZE
        );
    }
    let count = len / T::SIZE;
    let end = ofs
        .checked_add(count * T::SIZE)
        .filter(|&end| end <= data.len())
        .ok_or_else(truncated)?;
    let bytes = &data[ofs..end];

    let records: Vec<T> = if count >= PARALLEL_LUMP_THRESHOLD {
        bytes.par_chunks_exact(T::SIZE).map(T::read).collect()
    } else {
        bytes.chunks_exact(T::SIZE).map(T::read).collect()
    };

    debug!("{}: {} records", name, records.len());
    Ok(records)
}

/// Check `value` is a valid index into an array of `len` elements.
fn check_index(
    lump: &'static str,
    index: usize,
    field: &'static str,
    value: i64,
    len: usize,
) -> Result<usize, LoadError> {
    if value < 0 || value as u64 >= len as u64 {
        return Err(LoadError::BadIndex {
            lump,
            index,
            field,
            value,
        });
    }
    Ok(value as usize)
}

/// Check `[first, first + count)` lies inside an array of `len` elements.
/// Non-positive counts are an empty range.
fn check_range(
    lump: &'static str,
    index: usize,
    field: &'static str,
    first: i32,
    count: i32,
    len: usize,
) -> Result<(usize, usize), LoadError> {
    if count <= 0 {
        return Ok((0, 0));
    }
    let end = first as i64 + count as i64;
    if first < 0 || end > len as i64 {
        return Err(LoadError::BadIndex {
            lump,
            index,
            field,
            value: end,
        });
    }
    Ok((first as usize, count as usize))
}

fn convert_brush_sides(
    sides: &[DBrushSide],
    num_planes: usize,
) -> Result<Vec<CBrushSide>, LoadError> {
    sides
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Ok(CBrushSide {
                plane: PlaneId(check_index("brushsides", i, "plane", s.planenum as i64, num_planes)?),
                texture: s.texture,
            })
        })
        .collect()
}

fn convert_brushes(
    brushes: &[DBrush],
    num_sides: usize,
    num_textures: usize,
) -> Result<Vec<CBrush>, LoadError> {
    brushes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let (first_side, _) =
                check_range("brushes", i, "side", b.firstside, b.numsides, num_sides)?;
            let texture = check_index("brushes", i, "texture", b.texture as i64, num_textures)?;
            Ok(CBrush {
                first_side,
                num_sides: b.numsides,
                texture: TextureId(texture),
                mins: UNBOUNDED_MINS,
                maxs: UNBOUNDED_MAXS,
                axial_bounds: false,
            })
        })
        .collect()
}

fn convert_leaf_brushes(
    leaf_brushes: &[DLeafBrush],
    num_brushes: usize,
) -> Result<Vec<BrushId>, LoadError> {
    leaf_brushes
        .iter()
        .enumerate()
        .map(|(i, lb)| {
            check_index("leafbrushes", i, "brush", lb.brushnum as i64, num_brushes).map(BrushId)
        })
        .collect()
}

fn convert_leafs(leafs: &[DLeaf], num_leaf_brushes: usize) -> Result<Vec<CLeaf>, LoadError> {
    leafs
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let (first_leaf_brush, num_leaf_brushes) = check_range(
                "leafs",
                i,
                "leafbrush",
                l.firstleafbrush,
                l.numleafbrushes,
                num_leaf_brushes,
            )?;
            Ok(CLeaf {
                cluster: l.cluster,
                area: l.area,
                mins: l.mins,
                maxs: l.maxs,
                first_leaf_face: l.firstleafface,
                num_leaf_faces: l.numleaffaces,
                first_leaf_brush,
                num_leaf_brushes,
            })
        })
        .collect()
}

fn convert_nodes(
    nodes: &[DNode],
    num_planes: usize,
    num_leafs: usize,
) -> Result<Vec<CNode>, LoadError> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let plane = check_index("nodes", i, "plane", n.planenum as i64, num_planes)?;
            let mut children = [NodeChild::Leaf(LeafId(0)); 2];
            for (child, &raw) in children.iter_mut().zip(n.children.iter()) {
                *child = match NodeChild::from_raw(raw) {
                    NodeChild::Node(NodeId(c)) => {
                        if c >= nodes.len() {
                            return Err(LoadError::BadIndex {
                                lump: "nodes",
                                index: i,
                                field: "child node",
                                value: raw as i64,
                            });
                        }
                        NodeChild::Node(NodeId(c))
                    }
                    NodeChild::Leaf(LeafId(l)) => {
                        NodeChild::Leaf(LeafId(check_index("nodes", i, "child leaf", l as i64, num_leafs)?))
                    }
                };
            }
            Ok(CNode {
                plane: PlaneId(plane),
                children,
                mins: n.mins,
                maxs: n.maxs,
            })
        })
        .collect()
}

/// Walk the tree from node 0 and reject any child link that leads back to a
/// node on the current path. Node numbering is otherwise unconstrained, and
/// subtrees shared by several parents are allowed.
fn check_node_cycles(nodes: &[CNode]) -> Result<(), LoadError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    if nodes.is_empty() {
        return Ok(());
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    // (node, next child slot to visit)
    let mut stack = vec![(0usize, 0usize)];
    marks[0] = Mark::OnPath;

    while let Some(top) = stack.last_mut() {
        let (node, slot) = *top;
        if slot == 2 {
            marks[node] = Mark::Done;
            stack.pop();
            continue;
        }
        top.1 += 1;

        if let NodeChild::Node(NodeId(child)) = nodes[node].children[slot] {
            match marks[child] {
                Mark::OnPath => {
                    return Err(LoadError::BadIndex {
                        lump: "nodes",
                        index: node,
                        field: "child node",
                        value: child as i64,
                    });
                }
                Mark::Unvisited => {
                    marks[child] = Mark::OnPath;
                    stack.push((child, 0));
                }
                Mark::Done => {}
            }
        }
    }

    Ok(())
}

// ============================================================
// Brush bounds
// ============================================================

fn is_axis_normal(normal: &Vec3, axis: usize, sign: f32) -> bool {
    (0..3).all(|j| {
        let expected = if j == axis { sign } else { 0.0 };
        (normal[j] - expected).abs() <= AXIAL_NORMAL_EPSILON
    })
}

/// Bounds from the first six sides of a brush, or `None` if there are fewer
/// than six or they aren't the -X,+X,-Y,+Y,-Z,+Z axial planes.
fn axial_bounds(sides: &[CBrushSide], planes: &[CPlane]) -> Option<(Vec3, Vec3)> {
    if sides.len() < 6 {
        return None;
    }

    let mut mins = [0.0f32; 3];
    let mut maxs = [0.0f32; 3];
    for axis in 0..3 {
        let neg = &planes[sides[axis * 2].plane.0];
        let pos = &planes[sides[axis * 2 + 1].plane.0];
        if !is_axis_normal(&neg.normal, axis, -1.0) || !is_axis_normal(&pos.normal, axis, 1.0) {
            return None;
        }
        mins[axis] = -neg.dist;
        maxs[axis] = pos.dist;
    }
    Some((mins, maxs))
}

// ============================================================
// Tests
// ============================================================
