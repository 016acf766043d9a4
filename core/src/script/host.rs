//! Native API exposed to map scripts under the `env` module.

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use rand::RngCore;
use rand_pcg::Pcg32;
use wasmtime::{
    Caller, Extern, Global, GlobalType, Linker, Memory, Mutability, ResourceLimiter, Store, Val,
    ValType,
};

use super::limits::InterruptCheck;
use super::memory::{guest_memory, read_bytes, read_records, read_str, read_u32s, write_u32s};
use super::noise::{NoiseParams, NoiseSource, RiggedRegion, fractal_value_noise};
use crate::error::ScriptError;
use crate::logging::{LogLevel, SharedLogger};
use crate::map_log;
use mapforge_shared::{
    Droid, Feature, MAP_MAX_AREA, MAP_MAX_HEIGHT, MAP_MAX_WIDTH, MAX_PLAYERS, MapData, MapTile,
    PLAYER_SCAVENGERS, Structure, TILE_MAX_HEIGHT, TILE_ROTMASK, TILE_ROTSHIFT, TILE_TRIFLIP,
    TILE_XFLIP, TILE_YFLIP, WorldPos,
};

/// Feature descriptor player value meaning "no owner".
pub const NO_PLAYER: i32 = i32::MIN;

/// Bytes per entity descriptor passed to `set_map_data`.
pub const OBJECT_DESCRIPTOR_LEN: usize = 28;

/// Bytes per rigged region record passed to `generate_fractal_value_noise`.
pub const RIGGED_REGION_LEN: usize = 24;

/// Largest table a script may grow.
const MAX_TABLE_ELEMENTS: usize = 100_000;

const SET_MAP_DATA: &str = "set_map_data";
const NOISE: &str = "generate_fractal_value_noise";

/// Everything a script run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub map_data: MapData,
    pub structures: Vec<Structure>,
    pub droids: Vec<Droid>,
    pub features: Vec<Feature>,
}

/// Store data for one script run.
pub(crate) struct HostState {
    pub(crate) rng: Pcg32,
    pub(crate) logger: SharedLogger,
    /// Name used as the prefix for script log lines.
    pub(crate) script_name: String,
    pub(crate) interrupt: Box<dyn InterruptCheck>,
    pub(crate) max_memory_bytes: usize,
    pub(crate) output: Option<ScriptOutput>,
    /// Error raised by a native, kept so the trap can be reported precisely.
    pub(crate) fault: Option<ScriptError>,
    pub(crate) timed_out: bool,
    pub(crate) memory_exceeded: bool,
}

impl HostState {
    pub(crate) fn new(
        rng: Pcg32,
        logger: SharedLogger,
        script_name: String,
        interrupt: Box<dyn InterruptCheck>,
        max_memory_bytes: usize,
    ) -> Self {
        Self {
            rng,
            logger,
            script_name,
            interrupt,
            max_memory_bytes,
            output: None,
            fault: None,
            timed_out: false,
            memory_exceeded: false,
        }
    }
}

impl ResourceLimiter for HostState {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> Result<bool> {
        if desired > self.max_memory_bytes {
            self.memory_exceeded = true;
            anyhow::bail!(
                "memory growth to {} bytes exceeds the limit of {} bytes",
                desired,
                self.max_memory_bytes
            );
        }
        Ok(true)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> Result<bool> {
        Ok(desired <= MAX_TABLE_ELEMENTS)
    }
}

/// Record a native failure and turn it into a trap.
fn fail(caller: &mut Caller<'_, HostState>, error: ScriptError) -> anyhow::Error {
    caller.data_mut().fault = Some(error.clone());
    anyhow::Error::new(error)
}

/// Register natives and read-only globals with the linker
pub(crate) fn register_natives(
    linker: &mut Linker<HostState>,
    store: &mut Store<HostState>,
    preview: bool,
) -> Result<()> {
    linker.func_wrap("env", "game_rand", game_rand)?;
    linker.func_wrap("env", "log", log_message)?;
    linker.func_wrap("env", "set_map_data", set_map_data)?;
    linker.func_wrap("env", "generate_fractal_value_noise", generate_fractal_value_noise)?;

    let constants = [
        ("preview", i32::from(preview)),
        ("XFLIP", i32::from(TILE_XFLIP)),
        ("YFLIP", i32::from(TILE_YFLIP)),
        ("ROTMASK", i32::from(TILE_ROTMASK)),
        ("ROTSHIFT", i32::from(TILE_ROTSHIFT)),
        ("TRIFLIP", i32::from(TILE_TRIFLIP)),
    ];
    for (name, value) in constants {
        let ty = GlobalType::new(ValType::I32, Mutability::Const);
        let global = Global::new(&mut *store, ty, Val::I32(value))?;
        linker.define(&*store, "env", name, global)?;
    }
    Ok(())
}

// ============================================================================
// gameRand / log
// ============================================================================

/// Next seeded random value, reduced modulo `modulus` when non-zero
fn game_rand(mut caller: Caller<'_, HostState>, modulus: u32) -> u32 {
    let value = caller.data_mut().rng.next_u32();
    value.checked_rem(modulus).unwrap_or(value)
}

/// Log UTF-8 text from the script at info level
fn log_message(mut caller: Caller<'_, HostState>, ptr: u32, len: u32) -> Result<()> {
    let text = guest_memory(&mut caller, "log")
        .and_then(|memory| read_str(memory, &caller, ptr, len, "log"));
    match text {
        Ok(text) => {
            let state = caller.data();
            map_log!(state.logger, LogLevel::Info, "{}: \"{}\"", state.script_name, text);
            Ok(())
        }
        Err(e) => Err(fail(&mut caller, e)),
    }
}

// ============================================================================
// setMapData
// ============================================================================

/// Pointer/length pair of one guest array.
#[derive(Debug, Clone, Copy)]
struct GuestArray {
    ptr: u32,
    len: u32,
}

#[allow(clippy::too_many_arguments)]
fn set_map_data(
    mut caller: Caller<'_, HostState>,
    width: u32,
    height: u32,
    textures_ptr: u32,
    textures_len: u32,
    heights_ptr: u32,
    heights_len: u32,
    structures_ptr: u32,
    structures_len: u32,
    droids_ptr: u32,
    droids_len: u32,
    features_ptr: u32,
    features_len: u32,
) -> Result<()> {
    let arrays = [
        GuestArray { ptr: textures_ptr, len: textures_len },
        GuestArray { ptr: heights_ptr, len: heights_len },
        GuestArray { ptr: structures_ptr, len: structures_len },
        GuestArray { ptr: droids_ptr, len: droids_len },
        GuestArray { ptr: features_ptr, len: features_len },
    ];
    match decode_map_data(&mut caller, width, height, arrays) {
        Ok(output) => {
            caller.data_mut().output = Some(output);
            Ok(())
        }
        Err(e) => Err(fail(&mut caller, e)),
    }
}

fn decode_map_data(
    caller: &mut Caller<'_, HostState>,
    width: u32,
    height: u32,
    [textures, heights, structures, droids, features]: [GuestArray; 5],
) -> Result<ScriptOutput, ScriptError> {
    if caller.data().output.is_some() {
        return Err(ScriptError::AlreadyCommitted);
    }

    let area = u64::from(width) * u64::from(height);
    if width <= 1 || height <= 1 || width > MAP_MAX_WIDTH || height > MAP_MAX_HEIGHT || area > MAP_MAX_AREA {
        return Err(ScriptError::InvalidDimensions { width, height });
    }
    let expected = width * height;
    for (array, guest) in [("texture", textures), ("height", heights)] {
        if guest.len != expected {
            return Err(ScriptError::ArrayLength {
                array,
                len: guest.len,
                expected,
            });
        }
    }
    for (kind, guest) in [("structures", structures), ("droids", droids), ("features", features)] {
        if guest.len > u32::from(u16::MAX) {
            return Err(ScriptError::TooManyObjects {
                kind,
                count: guest.len,
            });
        }
    }

    let memory = guest_memory(caller, SET_MAP_DATA)?;
    let texture_values = read_u32s(memory, &*caller, textures.ptr, textures.len, SET_MAP_DATA)?;
    let height_values = read_u32s(memory, &*caller, heights.ptr, heights.len, SET_MAP_DATA)?;

    let mut tiles = Vec::with_capacity(expected as usize);
    for (index, (&texture, &tile_height)) in texture_values.iter().zip(&height_values).enumerate() {
        let index = index as u32;
        let texture = u16::try_from(texture)
            .map_err(|_| ScriptError::TextureOutOfRange { index, value: texture })?;
        if tile_height > u32::from(TILE_MAX_HEIGHT) {
            return Err(ScriptError::HeightOutOfRange {
                index,
                value: tile_height,
            });
        }
        tiles.push(MapTile {
            height: tile_height as u16,
            texture,
        });
    }

    let structures = read_objects(memory, caller, structures, "structures")?
        .into_iter()
        .map(|object| -> Result<Structure, ScriptError> {
            Ok(Structure {
                id: None,
                modules: object.modules()?,
                player: object.player(false)?.unwrap_or(PLAYER_SCAVENGERS),
                name: object.name,
                position: object.position,
                direction: object.direction,
            })
        })
        .collect::<Result<Vec<_>, ScriptError>>()?;

    let droids = read_objects(memory, caller, droids, "droids")?
        .into_iter()
        .map(|object| -> Result<Droid, ScriptError> {
            Ok(Droid {
                id: None,
                player: object.player(false)?.unwrap_or(PLAYER_SCAVENGERS),
                name: object.name,
                position: object.position,
                direction: object.direction,
            })
        })
        .collect::<Result<Vec<_>, ScriptError>>()?;

    let features = read_objects(memory, caller, features, "features")?
        .into_iter()
        .map(|object| -> Result<Feature, ScriptError> {
            Ok(Feature {
                id: None,
                player: object.player(true)?,
                name: object.name,
                position: object.position,
                direction: object.direction,
            })
        })
        .collect::<Result<Vec<_>, ScriptError>>()?;

    Ok(ScriptOutput {
        map_data: MapData {
            width,
            height,
            tiles,
            gateways: Vec::new(),
        },
        structures,
        droids,
        features,
    })
}

/// One decoded entity descriptor.
struct GuestObject {
    kind: &'static str,
    index: u32,
    name: String,
    position: WorldPos,
    direction: u16,
    raw_player: i32,
    raw_modules: u32,
}

impl GuestObject {
    fn invalid(&self, reason: String) -> ScriptError {
        ScriptError::InvalidObject {
            kind: self.kind,
            index: self.index,
            reason,
        }
    }

    /// `None` only for features without an owner.
    fn player(&self, allow_none: bool) -> Result<Option<i8>, ScriptError> {
        if allow_none && self.raw_player == NO_PLAYER {
            return Ok(None);
        }
        if (i32::from(PLAYER_SCAVENGERS)..i32::from(MAX_PLAYERS)).contains(&self.raw_player) {
            return Ok(Some(self.raw_player as i8));
        }
        Err(self.invalid(format!("invalid player ({})", self.raw_player)))
    }

    fn modules(&self) -> Result<u8, ScriptError> {
        u8::try_from(self.raw_modules)
            .map_err(|_| self.invalid(format!("invalid modules ({})", self.raw_modules)))
    }
}

fn read_objects(
    memory: Memory,
    caller: &Caller<'_, HostState>,
    guest: GuestArray,
    kind: &'static str,
) -> Result<Vec<GuestObject>, ScriptError> {
    let records = read_records(
        memory,
        caller,
        guest.ptr,
        guest.len,
        OBJECT_DESCRIPTOR_LEN,
        SET_MAP_DATA,
    )?;

    let mut objects = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let index = index as u32;
        let invalid = |reason: String| ScriptError::InvalidObject { kind, index, reason };

        let name_ptr = LittleEndian::read_u32(&record[0..4]);
        let name_len = LittleEndian::read_u32(&record[4..8]);
        let name_bytes = read_bytes(memory, caller, name_ptr, name_len, SET_MAP_DATA)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| invalid("name is not valid UTF-8".to_string()))?;

        let raw_direction = LittleEndian::read_u32(&record[16..20]);
        let direction = u16::try_from(raw_direction)
            .map_err(|_| invalid(format!("invalid direction ({})", raw_direction)))?;

        objects.push(GuestObject {
            kind,
            index,
            name,
            position: WorldPos::new(
                LittleEndian::read_i32(&record[8..12]),
                LittleEndian::read_i32(&record[12..16]),
            ),
            direction,
            raw_player: LittleEndian::read_i32(&record[20..24]),
            raw_modules: LittleEndian::read_u32(&record[24..28]),
        });
    }
    Ok(objects)
}

// ============================================================================
// generateFractalValueNoise
// ============================================================================

/// Layer values from the store's generator, rigged values from exported guest functions.
struct GuestNoiseSource<'a, 'c> {
    caller: &'a mut Caller<'c, HostState>,
    callbacks: Vec<(String, wasmtime::TypedFunc<(u32, u32, u32, u32), u32>)>,
}

impl NoiseSource for GuestNoiseSource<'_, '_> {
    fn next_random(&mut self) -> u32 {
        self.caller.data_mut().rng.next_u32()
    }

    fn rigged_value(
        &mut self,
        region: usize,
        x: u32,
        y: u32,
        layer_idx: u32,
        layer_range: u32,
    ) -> Result<u32, ScriptError> {
        let Some((name, callback)) = self.callbacks.get(region) else {
            return Err(ScriptError::BadArgument {
                function: NOISE,
                reason: format!("no callback for rigged region {}", region),
            });
        };
        callback
            .call(&mut *self.caller, (x, y, layer_idx, layer_range))
            .map_err(|e| ScriptError::RiggedCallback {
                name: name.clone(),
                reason: format!("failed: {:#}", e),
            })
    }
}

#[allow(clippy::too_many_arguments)]
fn generate_fractal_value_noise(
    mut caller: Caller<'_, HostState>,
    width: u32,
    height: u32,
    range: u32,
    crispness: u32,
    scale: u32,
    normalize_to_range: u32,
    out_ptr: u32,
    rigged_ptr: u32,
    rigged_len: u32,
) -> Result<()> {
    let params = NoiseParams {
        width,
        height,
        range,
        crispness,
        scale,
        normalize_to_range,
    };
    match fill_noise(&mut caller, &params, out_ptr, rigged_ptr, rigged_len) {
        Ok(()) => Ok(()),
        Err(e) => {
            // A nested trap (for example a timeout inside a callback) already recorded its cause.
            if caller.data().fault.is_some() || caller.data().timed_out {
                return Err(anyhow::Error::new(e));
            }
            Err(fail(&mut caller, e))
        }
    }
}

fn fill_noise(
    caller: &mut Caller<'_, HostState>,
    params: &NoiseParams,
    out_ptr: u32,
    rigged_ptr: u32,
    rigged_len: u32,
) -> Result<(), ScriptError> {
    params.validate()?;
    let memory = guest_memory(caller, NOISE)?;
    let records = read_records(memory, &*caller, rigged_ptr, rigged_len, RIGGED_REGION_LEN, NOISE)?;

    let mut regions = Vec::with_capacity(records.len());
    let mut callbacks = Vec::with_capacity(records.len());
    for record in &records {
        regions.push(RiggedRegion {
            x1: LittleEndian::read_u32(&record[0..4]),
            y1: LittleEndian::read_u32(&record[4..8]),
            x2: LittleEndian::read_u32(&record[8..12]),
            y2: LittleEndian::read_u32(&record[12..16]),
        });
        let name_ptr = LittleEndian::read_u32(&record[16..20]);
        let name_len = LittleEndian::read_u32(&record[20..24]);
        let name = read_str(memory, &*caller, name_ptr, name_len, NOISE)?;
        let callback = match caller.get_export(&name) {
            Some(Extern::Func(func)) => func.typed::<(u32, u32, u32, u32), u32>(&*caller).map_err(|e| {
                ScriptError::RiggedCallback {
                    name: name.clone(),
                    reason: format!("has the wrong signature: {:#}", e),
                }
            })?,
            _ => {
                return Err(ScriptError::RiggedCallback {
                    name,
                    reason: "is not an exported function".to_string(),
                });
            }
        };
        callbacks.push((name, callback));
    }

    // Fail before doing any work if the output does not fit.
    write_u32s(memory, &mut *caller, out_ptr, &vec![0; params.len()], NOISE)?;

    let noise = {
        let mut source = GuestNoiseSource { caller, callbacks };
        fractal_value_noise(params, &regions, &mut source)?
    };
    write_u32s(memory, &mut *caller, out_ptr, &noise, NOISE)
}
