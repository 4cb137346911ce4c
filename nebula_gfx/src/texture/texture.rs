/// Texture resource lifecycle.
///
/// A `Texture` is a logical pixel-data container: format, dimensions, mip
/// levels, sampling state and a lazily created backend handle. Textures are
/// only constructible through `GraphicsDevice::create_texture`, which
/// registers them in the device arena and accounts their VRAM footprint.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::backend::context::TextureId;
use crate::device::vram::TextureProfile;
use crate::error::Result;
use crate::gfx_warn;
use super::format::{
    calc_gpu_size, calc_level_size, encoding, mip_count, TextureEncoding, TextureFormat,
    TextureKind,
};

/// Process-wide monotonic texture id counter
static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

// ===== SAMPLER STATE =====

/// Texture filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipNearest,
    NearestMipLinear,
    LinearMipNearest,
    LinearMipLinear,
}

/// Texture addressing mode per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Comparison function for compare-on-read (shadow) sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunc {
    #[default]
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Always,
    Never,
}

/// Sampling state late-bound to the backend sampler at draw time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub anisotropy: u32,
    pub compare_on_read: bool,
    pub compare_func: CompareFunc,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: Filter::LinearMipLinear,
            mag_filter: Filter::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            anisotropy: 1,
            compare_on_read: false,
            compare_func: CompareFunc::Less,
        }
    }
}

bitflags! {
    /// Which sampling properties changed since the last backend sync
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureDirty: u32 {
        const MIN_FILTER = 1 << 0;
        const MAG_FILTER = 1 << 1;
        const ADDRESS_U = 1 << 2;
        const ADDRESS_V = 1 << 3;
        const ADDRESS_W = 1 << 4;
        const ANISOTROPY = 1 << 5;
        const COMPARE = 1 << 6;
    }
}

// ===== SOURCES AND LEVEL STORAGE =====

/// Kind of an external image-like surface bound as a mip level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Canvas,
    Video,
    Bitmap,
}

/// External image-like surface (canvas/image/video/bitmap)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSource {
    pub width: u32,
    pub height: u32,
    pub kind: SourceKind,
}

/// Source set passed to `Texture::set_source`
#[derive(Debug, Clone)]
pub enum TextureSourceSet {
    /// Single surface for a 2D/volume texture
    Single(ImageSource),
    /// Exactly 6 same-sized, same-kind faces for a cubemap
    Cube([ImageSource; 6]),
}

/// Pixel data backing one face of one mip level
#[derive(Debug, Clone)]
pub enum LevelData {
    /// Raw pixel bytes (allocated lazily on first lock)
    Pixels(Vec<u8>),
    /// An external image-like surface bound via `set_source`
    Source(ImageSource),
}

/// Mip-level storage, shaped by cubemap-ness.
///
/// Invariant: the shape always matches the texture (flat vs. 6 face slots
/// per level) and the current mip count.
#[derive(Debug, Clone)]
pub enum MipLevels {
    Flat(Vec<Option<LevelData>>),
    Cube(Vec<[Option<LevelData>; 6]>),
}

impl MipLevels {
    fn new(cubemap: bool, levels: u32) -> Self {
        if cubemap {
            MipLevels::Cube((0..levels).map(|_| std::array::from_fn(|_| None)).collect())
        } else {
            MipLevels::Flat(vec![None; levels as usize])
        }
    }

    /// Number of mip levels in the storage
    pub fn level_count(&self) -> u32 {
        match self {
            MipLevels::Flat(v) => v.len() as u32,
            MipLevels::Cube(v) => v.len() as u32,
        }
    }

    /// Data for one face of one level, if present
    pub fn get(&self, level: u32, face: u32) -> Option<&LevelData> {
        match self {
            MipLevels::Flat(v) => v.get(level as usize)?.as_ref(),
            MipLevels::Cube(v) => v.get(level as usize)?.get(face as usize)?.as_ref(),
        }
    }

    fn get_mut(&mut self, level: u32, face: u32) -> Option<&mut LevelData> {
        match self {
            MipLevels::Flat(v) => v.get_mut(level as usize)?.as_mut(),
            MipLevels::Cube(v) => v.get_mut(level as usize)?.get_mut(face as usize)?.as_mut(),
        }
    }

    fn set(&mut self, level: u32, face: u32, data: LevelData) {
        match self {
            MipLevels::Flat(v) => {
                if let Some(slot) = v.get_mut(level as usize) {
                    *slot = Some(data);
                }
            }
            MipLevels::Cube(v) => {
                if let Some(faces) = v.get_mut(level as usize) {
                    if let Some(slot) = faces.get_mut(face as usize) {
                        *slot = Some(data);
                    }
                }
            }
        }
    }

    /// Null every face slot of one level
    fn clear_level(&mut self, level: u32) {
        match self {
            MipLevels::Flat(v) => {
                if let Some(slot) = v.get_mut(level as usize) {
                    *slot = None;
                }
            }
            MipLevels::Cube(v) => {
                if let Some(faces) = v.get_mut(level as usize) {
                    for slot in faces.iter_mut() {
                        *slot = None;
                    }
                }
            }
        }
    }

    /// Grow or shrink to `levels`, keeping existing data where possible
    fn reshape(&mut self, levels: u32) {
        match self {
            MipLevels::Flat(v) => v.resize(levels as usize, None),
            MipLevels::Cube(v) => {
                v.resize_with(levels as usize, || std::array::from_fn(|_| None))
            }
        }
    }
}

// ===== DESCRIPTOR =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Diagnostic name
    pub name: String,
    /// Width in pixels (0 selects the 4x4 placeholder)
    pub width: u32,
    /// Height in pixels (0 selects the 4x4 placeholder)
    pub height: u32,
    /// Slice count, volume textures only
    pub depth: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Data interpretation on top of the format
    pub kind: TextureKind,
    /// 6-face cubemap
    pub cubemap: bool,
    /// 3D/volume texture
    pub volume: bool,
    /// Whether a full mip chain is maintained
    pub mipmaps: bool,
    /// VRAM accounting category
    pub profile: TextureProfile,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 4,
            height: 4,
            depth: 1,
            format: TextureFormat::RGBA8,
            kind: TextureKind::Default,
            cubemap: false,
            volume: false,
            mipmaps: true,
            profile: TextureProfile::Texture,
        }
    }
}

/// Options for `Texture::lock`
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureLockOptions {
    /// Mip level to lock
    pub level: u32,
    /// Cubemap face to lock (ignored for non-cubemaps)
    pub face: u32,
}

// ===== TEXTURE =====

/// A logical pixel-data container backed by GPU memory
#[derive(Debug)]
pub struct Texture {
    id: u64,
    name: String,
    width: u32,
    height: u32,
    depth: u32,
    cubemap: bool,
    volume: bool,
    format: TextureFormat,
    kind: TextureKind,
    mipmaps: bool,
    profile: TextureProfile,
    sampler: SamplerState,
    dirty: TextureDirty,
    levels: MipLevels,
    level_updated: Vec<bool>,
    needs_upload: bool,
    needs_mipmaps_upload: bool,
    mipmaps_uploaded: bool,
    invalid: bool,
    locked: Option<(u32, u32)>,
    backend_id: Option<TextureId>,
}

impl Texture {
    /// Internal only — textures are created via
    /// `GraphicsDevice::create_texture` so the device arena and VRAM
    /// counters stay consistent.
    pub(crate) fn new(desc: TextureDesc, supports_volume: bool) -> Self {
        let width = if desc.width == 0 { 4 } else { desc.width };
        let height = if desc.height == 0 { 4 } else { desc.height };
        // Volume textures silently degrade to a single slice on devices
        // without volume support.
        let depth = if desc.volume && supports_volume {
            desc.depth.max(1)
        } else {
            1
        };
        let levels = mip_count(width, height, desc.mipmaps);
        let mut texture = Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            name: desc.name,
            width,
            height,
            depth,
            cubemap: desc.cubemap,
            volume: desc.volume && supports_volume,
            format: desc.format,
            kind: desc.kind,
            mipmaps: desc.mipmaps,
            profile: desc.profile,
            sampler: SamplerState::default(),
            dirty: TextureDirty::empty(),
            levels: MipLevels::new(desc.cubemap, levels),
            level_updated: vec![false; levels as usize],
            needs_upload: false,
            needs_mipmaps_upload: false,
            mipmaps_uploaded: false,
            invalid: false,
            locked: None,
            backend_id: None,
        };
        texture.dirty_all();
        texture
    }

    // ===== ACCESSORS =====

    /// Process-wide unique id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Slice count (1 unless a supported volume texture)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn cubemap(&self) -> bool {
        self.cubemap
    }

    pub fn volume(&self) -> bool {
        self.volume
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Encoding derived from format + kind
    pub fn encoding(&self) -> TextureEncoding {
        encoding(self.format, self.kind)
    }

    pub fn mipmaps(&self) -> bool {
        self.mipmaps
    }

    pub fn profile(&self) -> TextureProfile {
        self.profile
    }

    pub fn sampler(&self) -> &SamplerState {
        &self.sampler
    }

    /// Pending sampler-state changes not yet synced to the backend
    pub fn dirty(&self) -> TextureDirty {
        self.dirty
    }

    /// Whether the texture degraded to the 4x4 placeholder
    pub fn invalid(&self) -> bool {
        self.invalid
    }

    /// Backend texture handle, if created
    pub fn backend_id(&self) -> Option<TextureId> {
        self.backend_id
    }

    pub(crate) fn set_backend_id(&mut self, id: Option<TextureId>) {
        self.backend_id = id;
    }

    /// Number of mip levels currently maintained
    pub fn level_count(&self) -> u32 {
        self.levels.level_count()
    }

    /// 6 for cubemaps, 1 otherwise
    pub fn face_count(&self) -> u32 {
        if self.cubemap {
            6
        } else {
            1
        }
    }

    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    pub fn needs_mipmaps_upload(&self) -> bool {
        self.needs_mipmaps_upload
    }

    pub fn mipmaps_uploaded(&self) -> bool {
        self.mipmaps_uploaded
    }

    /// Whether one mip level changed since the last backend sync
    pub fn level_updated(&self, level: u32) -> bool {
        self.level_updated.get(level as usize).copied().unwrap_or(false)
    }

    /// Data bound to one face of one level, if any
    pub fn level_data(&self, level: u32, face: u32) -> Option<&LevelData> {
        self.levels.get(level, face)
    }

    /// Raw pixel bytes for one face of one level (None for source-backed data)
    pub(crate) fn level_pixels(&self, level: u32, face: u32) -> Option<&[u8]> {
        match self.levels.get(level, face) {
            Some(LevelData::Pixels(p)) => Some(p.as_slice()),
            _ => None,
        }
    }

    /// Total GPU footprint in bytes
    pub fn gpu_size(&self) -> u64 {
        calc_gpu_size(
            self.format,
            self.width,
            self.height,
            self.depth,
            self.mipmaps,
            self.cubemap,
        )
    }

    // ===== SAMPLER SETTERS =====
    //
    // Each setter is a no-op when the value does not change, and flips
    // exactly one dirty bit otherwise.

    pub fn set_min_filter(&mut self, filter: Filter) {
        if self.sampler.min_filter == filter {
            return;
        }
        self.sampler.min_filter = filter;
        self.dirty |= TextureDirty::MIN_FILTER;
    }

    pub fn set_mag_filter(&mut self, filter: Filter) {
        if self.sampler.mag_filter == filter {
            return;
        }
        self.sampler.mag_filter = filter;
        self.dirty |= TextureDirty::MAG_FILTER;
    }

    pub fn set_address_u(&mut self, mode: AddressMode) {
        if self.sampler.address_u == mode {
            return;
        }
        self.sampler.address_u = mode;
        self.dirty |= TextureDirty::ADDRESS_U;
    }

    pub fn set_address_v(&mut self, mode: AddressMode) {
        if self.sampler.address_v == mode {
            return;
        }
        self.sampler.address_v = mode;
        self.dirty |= TextureDirty::ADDRESS_V;
    }

    pub fn set_address_w(&mut self, mode: AddressMode) {
        if self.sampler.address_w == mode {
            return;
        }
        self.sampler.address_w = mode;
        self.dirty |= TextureDirty::ADDRESS_W;
    }

    pub fn set_anisotropy(&mut self, anisotropy: u32) {
        let anisotropy = anisotropy.max(1);
        if self.sampler.anisotropy == anisotropy {
            return;
        }
        self.sampler.anisotropy = anisotropy;
        self.dirty |= TextureDirty::ANISOTROPY;
    }

    pub fn set_compare_on_read(&mut self, compare: bool) {
        if self.sampler.compare_on_read == compare {
            return;
        }
        self.sampler.compare_on_read = compare;
        self.dirty |= TextureDirty::COMPARE;
    }

    pub fn set_compare_func(&mut self, func: CompareFunc) {
        if self.sampler.compare_func == func {
            return;
        }
        self.sampler.compare_func = func;
        self.dirty |= TextureDirty::COMPARE;
    }

    // ===== UPLOAD STATE =====

    /// Mark every mip level updated and all sampler state dirty.
    ///
    /// Invoked on construction, on resize and on context-loss recovery,
    /// the three moments at which backend state must be rebuilt.
    pub fn dirty_all(&mut self) {
        for flag in &mut self.level_updated {
            *flag = true;
        }
        self.needs_upload = true;
        self.needs_mipmaps_upload = self.mipmaps;
        self.mipmaps_uploaded = false;
        self.dirty = TextureDirty::all();
    }

    /// Force a re-upload of the base level on the next backend sync
    pub fn upload(&mut self) {
        if let Some(flag) = self.level_updated.get_mut(0) {
            *flag = true;
        }
        self.needs_upload = true;
        self.needs_mipmaps_upload = self.mipmaps;
    }

    /// Bind an image-like surface as one mip level's data.
    ///
    /// Cubemaps require exactly 6 same-sized, same-kind faces; any mismatch
    /// invalidates the texture, resets it to the 4x4 placeholder and clears
    /// the level's data. Validity transitions trigger re-upload.
    pub fn set_source(&mut self, source: TextureSourceSet, mip_level: u32) {
        let was_invalid = self.invalid;
        let invalid = match (&source, self.cubemap) {
            (TextureSourceSet::Cube(faces), true) => {
                let first = faces[0];
                faces.iter().any(|f| {
                    f.width != first.width || f.height != first.height || f.kind != first.kind
                })
            }
            (TextureSourceSet::Single(_), false) => false,
            // Wrong source shape for this texture
            _ => true,
        };

        if invalid {
            self.invalid = true;
            self.width = 4;
            self.height = 4;
            self.reshape_levels();
            self.levels.clear_level(mip_level);
        } else {
            if mip_level == 0 {
                let (w, h) = match &source {
                    TextureSourceSet::Single(s) => (s.width, s.height),
                    TextureSourceSet::Cube(faces) => (faces[0].width, faces[0].height),
                };
                self.width = w;
                self.height = h;
                self.reshape_levels();
            }
            self.invalid = false;
            match source {
                TextureSourceSet::Single(s) => {
                    self.levels.set(mip_level, 0, LevelData::Source(s));
                }
                TextureSourceSet::Cube(faces) => {
                    for (face, s) in faces.into_iter().enumerate() {
                        self.levels.set(mip_level, face as u32, LevelData::Source(s));
                    }
                }
            }
        }

        // Re-upload on valid->invalid, invalid->valid, or any change while
        // remaining valid.
        if was_invalid != self.invalid || !self.invalid {
            if let Some(flag) = self.level_updated.get_mut(mip_level as usize) {
                *flag = true;
            }
            self.upload();
        }
    }

    /// Exclusive access to a mip level's raw pixel buffer.
    ///
    /// Allocates storage on first use, sized by format and mip-adjusted
    /// dimensions. Must be paired with `unlock`.
    pub fn lock(&mut self, options: TextureLockOptions) -> Result<&mut [u8]> {
        debug_assert!(
            self.locked.is_none(),
            "texture '{}' is already locked",
            self.name
        );
        let level = options.level;
        let face = if self.cubemap { options.face } else { 0 };
        if level >= self.level_count() {
            crate::gfx_bail!(
                "nebula::Texture",
                "lock: mip level {} out of range on texture '{}' ({} levels)",
                level,
                self.name,
                self.level_count()
            );
        }
        let w = (self.width >> level).max(1);
        let h = (self.height >> level).max(1);
        let d = (self.depth >> level).max(1);
        let size = calc_level_size(self.format, w, h, d) as usize;
        let backed = matches!(
            self.levels.get(level, face),
            Some(LevelData::Pixels(p)) if p.len() == size
        );
        if !backed {
            self.levels.set(level, face, LevelData::Pixels(vec![0; size]));
        }
        self.locked = Some((level, face));
        match self.levels.get_mut(level, face) {
            Some(LevelData::Pixels(pixels)) => Ok(pixels.as_mut_slice()),
            _ => Err(crate::Error::InvalidResource(format!(
                "lock: no pixel storage for level {} of texture '{}'",
                level, self.name
            ))),
        }
    }

    /// Release a locked mip level; always triggers upload.
    pub fn unlock(&mut self) {
        match self.locked.take() {
            Some((level, _face)) => {
                if let Some(flag) = self.level_updated.get_mut(level as usize) {
                    *flag = true;
                }
                self.needs_upload = true;
                self.needs_mipmaps_upload = self.mipmaps;
            }
            None => {
                gfx_warn!(
                    "nebula::Texture",
                    "unlock called on texture '{}' which is not locked",
                    self.name
                );
            }
        }
    }

    // ===== INTERNAL LIFECYCLE =====

    /// Rebuild level storage for the current dimensions, keeping existing
    /// level data where the mip chain overlaps.
    fn reshape_levels(&mut self) {
        let levels = mip_count(self.width, self.height, self.mipmaps);
        self.levels.reshape(levels);
        self.level_updated.resize(levels as usize, true);
    }

    /// Resize in place; only the backend state is rebuilt, mip data is kept.
    /// Used exclusively for render-target attachments, via
    /// `GraphicsDevice::resize_texture`.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.reshape_levels();
        self.dirty_all();
    }

    /// Clamp dimensions to the device's maximum render buffer size
    pub(crate) fn clamp_size(&mut self, max_size: u32) {
        if self.width <= max_size && self.height <= max_size {
            return;
        }
        self.width = self.width.min(max_size);
        self.height = self.height.min(max_size);
        self.reshape_levels();
    }

    /// Drop the backend handle without a driver delete (the context is
    /// already gone) and mark all state dirty for the lazy rebuild.
    pub(crate) fn lose_context(&mut self) {
        self.backend_id = None;
        self.dirty_all();
    }

    /// Clear upload bookkeeping after a completed backend sync
    pub(crate) fn mark_uploaded(&mut self) {
        for flag in &mut self.level_updated {
            *flag = false;
        }
        self.needs_upload = false;
        self.mipmaps_uploaded = self.mipmaps;
        self.needs_mipmaps_upload = false;
    }

    /// Clear the sampler dirty mask after a backend flush
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = TextureDirty::empty();
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
