// qfiles.rs — Quake 3 BSP (IBSP v46) on-disk structures
//
// Only the lumps needed for collision are decoded. Every record is a run of
// little-endian i32/f32 fields; `LumpRecord::read` decodes one record from a
// slice of exactly `SIZE` bytes.

// ============================================================
// Header
// ============================================================

/// BSP magic as it appears at offset 0.
pub const IBSP_IDENT: [u8; 4] = *b"IBSP";
pub const BSP_VERSION: i32 = 0x2e;

// Lump indices, in header order
pub const LUMP_ENTITIES: usize = 0;
pub const LUMP_TEXTURES: usize = 1;
pub const LUMP_PLANES: usize = 2;
pub const LUMP_NODES: usize = 3;
pub const LUMP_LEAFS: usize = 4;
pub const LUMP_LEAFFACES: usize = 5;
pub const LUMP_LEAFBRUSHES: usize = 6;
pub const LUMP_MODELS: usize = 7;
pub const LUMP_BRUSHES: usize = 8;
pub const LUMP_BRUSHSIDES: usize = 9;
pub const LUMP_VERTEXES: usize = 10;
pub const LUMP_MESHVERTS: usize = 11;
pub const LUMP_EFFECTS: usize = 12;
pub const LUMP_FACES: usize = 13;
pub const LUMP_LIGHTMAPS: usize = 14;
pub const LUMP_LIGHTVOLS: usize = 15;
pub const LUMP_VISDATA: usize = 16;
pub const HEADER_LUMPS: usize = 17;

pub const LUMP_NAMES: [&str; HEADER_LUMPS] = [
    "entities",
    "textures",
    "planes",
    "nodes",
    "leafs",
    "leaffaces",
    "leafbrushes",
    "models",
    "brushes",
    "brushsides",
    "vertexes",
    "meshverts",
    "effects",
    "faces",
    "lightmaps",
    "lightvols",
    "visdata",
];

/// ident(4) + version(4) + 17 * Lump(8)
pub const HEADER_SIZE: usize = 8 + HEADER_LUMPS * 8;

pub const MAX_TEXTURE_NAME: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Lump {
    pub fileofs: i32,
    pub filelen: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DHeader {
    pub ident: [u8; 4],
    pub version: i32,
    pub lumps: [Lump; HEADER_LUMPS],
}

impl DHeader {
    /// Decode the header from the start of `data`. Returns `None` if the
    /// buffer is shorter than `HEADER_SIZE`; ident/version are not checked.
    pub fn read(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE {
            return None;
        }
        let mut ident = [0u8; 4];
        ident.copy_from_slice(&data[0..4]);
        let mut lumps = [Lump::default(); HEADER_LUMPS];
        for (i, lump) in lumps.iter_mut().enumerate() {
            let base = 8 + i * 8;
            lump.fileofs = read_i32_le(data, base);
            lump.filelen = read_i32_le(data, base + 4);
        }
        Some(Self {
            ident,
            version: read_i32_le(data, 4),
            lumps,
        })
    }
}

// ============================================================
// Byte helpers
// ============================================================

#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_i32x3_le(data: &[u8], offset: usize) -> [i32; 3] {
    [
        read_i32_le(data, offset),
        read_i32_le(data, offset + 4),
        read_i32_le(data, offset + 8),
    ]
}

// ============================================================
// Lump records
// ============================================================

/// A fixed-size record stored in one of the header lumps.
pub trait LumpRecord: Sized + Send {
    /// Record size in bytes on disk.
    const SIZE: usize;
    /// Header slot of the lump holding these records.
    const LUMP: usize;

    /// Decode one record. `rec` is exactly `SIZE` bytes long.
    fn read(rec: &[u8]) -> Self;
}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DTexture {
    pub name: [u8; MAX_TEXTURE_NAME],
    pub surface_flags: i32,
    pub content_flags: i32,
}

impl DTexture {
    /// Texture name up to the first NUL.
    pub fn name_str(&self) -> String {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_TEXTURE_NAME);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

impl LumpRecord for DTexture {
    const SIZE: usize = 72;
    const LUMP: usize = LUMP_TEXTURES;

    fn read(rec: &[u8]) -> Self {
        let mut name = [0u8; MAX_TEXTURE_NAME];
        name.copy_from_slice(&rec[..MAX_TEXTURE_NAME]);
        Self {
            name,
            surface_flags: read_i32_le(rec, 64),
            content_flags: read_i32_le(rec, 68),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct DPlane {
    pub normal: [f32; 3],
    pub dist: f32,
}

impl LumpRecord for DPlane {
    const SIZE: usize = 16;
    const LUMP: usize = LUMP_PLANES;

    fn read(rec: &[u8]) -> Self {
        Self {
            normal: [read_f32_le(rec, 0), read_f32_le(rec, 4), read_f32_le(rec, 8)],
            dist: read_f32_le(rec, 12),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DNode {
    pub planenum: i32,
    /// Negative numbers are leafs: -(leaf + 1).
    pub children: [i32; 2],
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
}

impl LumpRecord for DNode {
    const SIZE: usize = 36;
    const LUMP: usize = LUMP_NODES;

    fn read(rec: &[u8]) -> Self {
        Self {
            planenum: read_i32_le(rec, 0),
            children: [read_i32_le(rec, 4), read_i32_le(rec, 8)],
            mins: read_i32x3_le(rec, 12),
            maxs: read_i32x3_le(rec, 24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DLeaf {
    pub cluster: i32,
    pub area: i32,
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
    pub firstleafface: i32,
    pub numleaffaces: i32,
    pub firstleafbrush: i32,
    pub numleafbrushes: i32,
}

impl LumpRecord for DLeaf {
    const SIZE: usize = 48;
    const LUMP: usize = LUMP_LEAFS;

    fn read(rec: &[u8]) -> Self {
        Self {
            cluster: read_i32_le(rec, 0),
            area: read_i32_le(rec, 4),
            mins: read_i32x3_le(rec, 8),
            maxs: read_i32x3_le(rec, 20),
            firstleafface: read_i32_le(rec, 32),
            numleaffaces: read_i32_le(rec, 36),
            firstleafbrush: read_i32_le(rec, 40),
            numleafbrushes: read_i32_le(rec, 44),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DLeafBrush {
    pub brushnum: i32,
}

impl LumpRecord for DLeafBrush {
    const SIZE: usize = 4;
    const LUMP: usize = LUMP_LEAFBRUSHES;

    fn read(rec: &[u8]) -> Self {
        Self {
            brushnum: read_i32_le(rec, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DBrush {
    pub firstside: i32,
    pub numsides: i32,
    pub texture: i32,
}

impl LumpRecord for DBrush {
    const SIZE: usize = 12;
    const LUMP: usize = LUMP_BRUSHES;

    fn read(rec: &[u8]) -> Self {
        Self {
            firstside: read_i32_le(rec, 0),
            numsides: read_i32_le(rec, 4),
            texture: read_i32_le(rec, 8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DBrushSide {
    pub planenum: i32,
    pub texture: i32,
}

impl LumpRecord for DBrushSide {
    const SIZE: usize = 8;
    const LUMP: usize = LUMP_BRUSHSIDES;

    fn read(rec: &[u8]) -> Self {
        Self {
            planenum: read_i32_le(rec, 0),
            texture: read_i32_le(rec, 4),
        }
    }
}
