// q_shared.rs — Vector helpers and content/surface flags shared by the
// loader and the trace engine.

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

// ============================================================
// Content flags (brush texture `contentFlags`)
// ============================================================

bitflags::bitflags! {
    /// Brush content bits as written by the Quake 3 map compiler.
    /// The trace engine only looks at `SOLID`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContentFlags: u32 {
        const SOLID         = 0x0000_0001;
        const LAVA          = 0x0000_0008;
        const SLIME         = 0x0000_0010;
        const WATER         = 0x0000_0020;
        const FOG           = 0x0000_0040;
        const NOTTEAM1      = 0x0000_0080;
        const NOTTEAM2      = 0x0000_0100;
        const NOBOTCLIP     = 0x0000_0200;
        const AREAPORTAL    = 0x0000_8000;
        const PLAYERCLIP    = 0x0001_0000;
        const MONSTERCLIP   = 0x0002_0000;
        const TELEPORTER    = 0x0004_0000;
        const JUMPPAD       = 0x0008_0000;
        const CLUSTERPORTAL = 0x0010_0000;
        const DONOTENTER    = 0x0020_0000;
        const BOTCLIP       = 0x0040_0000;
        const MOVER         = 0x0080_0000;
        const ORIGIN        = 0x0100_0000;
        const BODY          = 0x0200_0000;
        const CORPSE        = 0x0400_0000;
        const DETAIL        = 0x0800_0000;
        const STRUCTURAL    = 0x1000_0000;
        const TRANSLUCENT   = 0x2000_0000;
        const TRIGGER       = 0x4000_0000;
        const NODROP        = 0x8000_0000;
    }
}

bitflags::bitflags! {
    /// Per-surface bits. Carried for callers, ignored by collision.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u32 {
        const NODAMAGE    = 0x0000_0001;
        const SLICK       = 0x0000_0002;
        const SKY         = 0x0000_0004;
        const LADDER      = 0x0000_0008;
        const NOIMPACT    = 0x0000_0010;
        const NOMARKS     = 0x0000_0020;
        const FLESH       = 0x0000_0040;
        const NODRAW      = 0x0000_0080;
        const HINT        = 0x0000_0100;
        const SKIP        = 0x0000_0200;
        const NOLIGHTMAP  = 0x0000_0400;
        const POINTLIGHT  = 0x0000_0800;
        const METALSTEPS  = 0x0000_1000;
        const NOSTEPS     = 0x0000_2000;
        const NONSOLID    = 0x0000_4000;
        const LIGHTFILTER = 0x0000_8000;
        const ALPHASHADOW = 0x0001_0000;
        const NODLIGHT    = 0x0002_0000;
        const DUST        = 0x0004_0000;
    }
}

// ============================================================
// Vector math
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_is_zero(v: &Vec3) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

/// start + frac * (end - start)
#[inline]
pub fn vector_lerp(start: &Vec3, end: &Vec3, frac: f32) -> Vec3 {
    [
        start[0] + frac * (end[0] - start[0]),
        start[1] + frac * (end[1] - start[1]),
        start[2] + frac * (end[2] - start[2]),
    ]
}

/// Component-wise min/max of two points.
pub fn vector_min_max(a: &Vec3, b: &Vec3) -> (Vec3, Vec3) {
    (
        [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
        [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
    )
}

#[inline]
pub fn clamp01(f: f32) -> f32 {
    f.clamp(0.0, 1.0)
}
