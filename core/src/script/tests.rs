//! Tests for the script sandbox

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use super::noise::{NoiseParams, NoiseSource, fractal_value_noise};
use super::*;
use crate::logging::LogLevel;
use crate::test_utils::RecordingLogger;
use mapforge_shared::{PLAYER_SCAVENGERS, TILE_XFLIP, WorldPos};

const SCRIPT_PATH: &str = "maps/generated/game.wasm";

/// Test module with a fixed data layout:
///
/// - textures at 0, heights at 64 (first four are 10, 20, 30, 40)
/// - structure, droid and feature descriptors at 128, 160, 192
/// - names at 256, 288, 320; log text at 384
/// - rigged regions at 448 (`flat`), 472 (`nope`), 496 (`too_big`), each covering the map
fn script(body: &str) -> String {
    format!(
        r#"
(module
  (import "env" "game_rand" (func $game_rand (param i32) (result i32)))
  (import "env" "log" (func $log (param i32 i32)))
  (import "env" "set_map_data"
    (func $set_map_data (param i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32 i32)))
  (import "env" "generate_fractal_value_noise"
    (func $noise (param i32 i32 i32 i32 i32 i32 i32 i32 i32)))
  (import "env" "preview" (global $preview i32))
  (import "env" "XFLIP" (global $xflip i32))
  (memory (export "memory") 1)

  (data (i32.const 64) "\0a\00\00\00\14\00\00\00\1e\00\00\00\28\00\00\00")
  (data (i32.const 128)
    "\00\01\00\00" "\0f\00\00\00" "\80\02\00\00" "\80\01\00\00" "\00\40\00\00" "\01\00\00\00" "\02\00\00\00")
  (data (i32.const 160)
    "\40\01\00\00" "\11\00\00\00" "\2c\01\00\00" "\f4\01\00\00" "\00\80\00\00" "\ff\ff\ff\ff" "\00\00\00\00")
  (data (i32.const 192)
    "\20\01\00\00" "\05\00\00\00" "\80\00\00\00" "\80\00\00\00" "\00\00\00\00" "\00\00\00\80" "\00\00\00\00")
  (data (i32.const 256) "A0CommandCentre")
  (data (i32.const 288) "Tree1")
  (data (i32.const 320) "ConstructionDroid")
  (data (i32.const 384) "hello map")
  (data (i32.const 448)
    "\00\00\00\00" "\00\00\00\00" "\ff\00\00\00" "\ff\00\00\00" "\08\02\00\00" "\04\00\00\00")
  (data (i32.const 472)
    "\00\00\00\00" "\00\00\00\00" "\ff\00\00\00" "\ff\00\00\00" "\10\02\00\00" "\04\00\00\00")
  (data (i32.const 496)
    "\00\00\00\00" "\00\00\00\00" "\ff\00\00\00" "\ff\00\00\00" "\18\02\00\00" "\07\00\00\00")
  (data (i32.const 520) "flat")
  (data (i32.const 528) "nope")
  (data (i32.const 536) "too_big")

  (func $fill_textures
    (local $i i32)
    (loop $next
      (i32.store (i32.shl (local.get $i) (i32.const 2)) (call $game_rand (i32.const 512)))
      (local.set $i (i32.add (local.get $i) (i32.const 1)))
      (br_if $next (i32.lt_u (local.get $i) (i32.const 4)))))

  (func $commit
    (call $set_map_data (i32.const 2) (i32.const 2)
      (i32.const 0) (i32.const 4) (i32.const 64) (i32.const 4)
      (i32.const 128) (i32.const 1) (i32.const 160) (i32.const 1) (i32.const 192) (i32.const 1)))

  (func $commit_terrain (param $w i32) (param $h i32)
    (call $set_map_data (local.get $w) (local.get $h)
      (i32.const 0) (i32.mul (local.get $w) (local.get $h))
      (i32.const 64) (i32.mul (local.get $w) (local.get $h))
      (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0)))

  (func (export "flat") (param i32 i32 i32 i32) (result i32) (i32.const 0))
  (func (export "too_big") (param i32 i32 i32 i32) (result i32) (i32.const 1000000))

  (func (export "generate") {body})
)
"#
    )
}

fn wasm(body: &str) -> Vec<u8> {
    wat::parse_str(script(body)).unwrap()
}

fn runner(seed: u32) -> (MapScriptRunner, RecordingLogger) {
    let logger = RecordingLogger::new();
    let runner = MapScriptRunner::new(seed, false, ScriptLimits::default(), Arc::new(logger.clone()));
    (runner, logger)
}

fn run(body: &str, seed: u32) -> Result<ScriptOutput, ScriptError> {
    let (mut runner, _) = runner(seed);
    runner.run(&wasm(body), SCRIPT_PATH)
}

fn expected_textures(seed: u32) -> Vec<u16> {
    let mut rng = Pcg32::seed_from_u64(u64::from(seed));
    (0..4).map(|_| (rng.next_u32() % 512) as u16).collect()
}

struct SeededNoise(Pcg32);

impl NoiseSource for SeededNoise {
    fn next_random(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn rigged_value(&mut self, _: usize, _: u32, _: u32, _: u32, _: u32) -> Result<u32, ScriptError> {
        Ok(0)
    }
}

// ============================================================================
// Committing map data
// ============================================================================

#[test]
fn test_script_commits_map() {
    let (mut runner, _) = runner(42);
    let output = runner
        .run(&wasm("(call $fill_textures) (call $commit)"), SCRIPT_PATH)
        .unwrap();
    assert_eq!(runner.phase(), ScriptPhase::Completed);

    let map = &output.map_data;
    assert_eq!((map.width, map.height), (2, 2));
    assert!(map.gateways.is_empty());
    let heights: Vec<u16> = map.tiles.iter().map(|t| t.height).collect();
    assert_eq!(heights, vec![10, 20, 30, 40]);
    let textures: Vec<u16> = map.tiles.iter().map(|t| t.texture).collect();
    assert_eq!(textures, expected_textures(42));

    let structure = &output.structures[0];
    assert_eq!(structure.id, None);
    assert_eq!(structure.name, "A0CommandCentre");
    assert_eq!(structure.position, WorldPos::new(640, 384));
    assert_eq!(structure.direction, 0x4000);
    assert_eq!(structure.player, 1);
    assert_eq!(structure.modules, 2);

    let droid = &output.droids[0];
    assert_eq!(droid.name, "ConstructionDroid");
    assert_eq!(droid.position, WorldPos::new(300, 500));
    assert_eq!(droid.direction, 0x8000);
    assert_eq!(droid.player, PLAYER_SCAVENGERS);

    let feature = &output.features[0];
    assert_eq!(feature.name, "Tree1");
    assert_eq!(feature.position, WorldPos::new(128, 128));
    assert_eq!(feature.player, None);
}

#[test]
fn test_same_seed_same_map() {
    let body = "(call $fill_textures) (call $commit)";
    let a = run(body, 7).unwrap();
    let b = run(body, 7).unwrap();
    let c = run(body, 8).unwrap();
    assert_eq!(a, b);
    assert_ne!(a.map_data, c.map_data);
}

#[test]
fn test_text_format_accepted() {
    let (mut runner, _) = runner(1);
    let source = script("(call $fill_textures) (call $commit)");
    assert!(runner.run(source.as_bytes(), SCRIPT_PATH).is_ok());
}

#[test]
fn test_start_function_entry_point() {
    let source = script("")
        .replace(
            "(func (export \"generate\") )",
            "(func $main (call $fill_textures) (call $commit)) (start $main)",
        );
    let (mut runner, _) = runner(3);
    let output = runner.run(source.as_bytes(), SCRIPT_PATH).unwrap();
    assert_eq!(output.structures.len(), 1);
}

#[test]
fn test_no_commit_is_no_map_data() {
    let (mut runner, _) = runner(1);
    assert_eq!(runner.run(&wasm(""), SCRIPT_PATH), Err(ScriptError::NoMapData));
    assert_eq!(runner.phase(), ScriptPhase::Completed);
}

#[test]
fn test_double_commit_rejected() {
    let body = "(call $fill_textures) (call $commit) (call $commit)";
    assert_eq!(run(body, 1), Err(ScriptError::AlreadyCommitted));
}

#[test]
fn test_runner_is_single_use() {
    let (mut runner, _) = runner(1);
    let wasm = wasm("(call $fill_textures) (call $commit)");
    assert!(runner.run(&wasm, SCRIPT_PATH).is_ok());
    assert_eq!(runner.run(&wasm, SCRIPT_PATH), Err(ScriptError::AlreadyRun));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_invalid_dimensions() {
    for (w, h) in [(1, 2), (2, 1), (257, 2)] {
        let body = format!("(call $commit_terrain (i32.const {}) (i32.const {}))", w, h);
        assert_eq!(
            run(&body, 1),
            Err(ScriptError::InvalidDimensions { width: w, height: h })
        );
    }
}

#[test]
fn test_array_length_mismatch() {
    let body = "(call $set_map_data (i32.const 2) (i32.const 2)
        (i32.const 0) (i32.const 3) (i32.const 64) (i32.const 4)
        (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))";
    assert_eq!(
        run(body, 1),
        Err(ScriptError::ArrayLength {
            array: "texture",
            len: 3,
            expected: 4
        })
    );
}

#[test]
fn test_tile_value_limits() {
    let body = "(call $fill_textures) (i32.store (i32.const 64) (i32.const 600)) (call $commit)";
    assert_eq!(
        run(body, 1),
        Err(ScriptError::HeightOutOfRange { index: 0, value: 600 })
    );

    let body = "(call $fill_textures) (i32.store (i32.const 4) (i32.const 65536)) (call $commit)";
    assert_eq!(
        run(body, 1),
        Err(ScriptError::TextureOutOfRange { index: 1, value: 65536 })
    );
}

#[test]
fn test_object_validation() {
    let cases = [
        // structure player
        ("(i32.store (i32.const 148) (i32.const 11))", "structures"),
        // the no-owner sentinel is for features only
        ("(i32.store (i32.const 148) (i32.const -2147483648))", "structures"),
        // structure modules
        ("(i32.store (i32.const 152) (i32.const 256))", "structures"),
        // droid direction
        ("(i32.store (i32.const 176) (i32.const 65536))", "droids"),
        // feature player
        ("(i32.store (i32.const 212) (i32.const -2))", "features"),
        // droid name is not UTF-8
        ("(i32.store8 (i32.const 320) (i32.const 255))", "droids"),
    ];
    for (patch, expected_kind) in cases {
        let body = format!("(call $fill_textures) {} (call $commit)", patch);
        match run(&body, 1) {
            Err(ScriptError::InvalidObject { kind, index, .. }) => {
                assert_eq!(kind, expected_kind, "{}", patch);
                assert_eq!(index, 0);
            }
            other => panic!("{}: unexpected {:?}", patch, other),
        }
    }
}

#[test]
fn test_out_of_bounds_pointer() {
    let body = "(call $set_map_data (i32.const 2) (i32.const 2)
        (i32.const 65530) (i32.const 4) (i32.const 64) (i32.const 4)
        (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))";
    assert!(matches!(
        run(body, 1),
        Err(ScriptError::OutOfBounds {
            function: "set_map_data",
            ptr: 65530,
            ..
        })
    ));
}

#[test]
fn test_too_many_objects() {
    let body = "(call $fill_textures)
        (call $set_map_data (i32.const 2) (i32.const 2)
        (i32.const 0) (i32.const 4) (i32.const 64) (i32.const 4)
        (i32.const 128) (i32.const 65536) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))";
    assert_eq!(
        run(body, 1),
        Err(ScriptError::TooManyObjects {
            kind: "structures",
            count: 65536
        })
    );
}

// ============================================================================
// Natives and globals
// ============================================================================

#[test]
fn test_log_message() {
    let (mut runner, logger) = runner(1);
    let body = "(call $log (i32.const 384) (i32.const 9)) (call $fill_textures) (call $commit)";
    runner.run(&wasm(body), SCRIPT_PATH).unwrap();
    assert!(logger.contains(LogLevel::Info, "game.wasm: \"hello map\""));
}

#[test]
fn test_globals() {
    let body = "(if (global.get $preview) (then (call $log (i32.const 384) (i32.const 9))))
        (call $fill_textures)
        (i32.store (i32.const 0) (global.get $xflip))
        (call $commit)";

    for preview in [false, true] {
        let logger = RecordingLogger::new();
        let mut runner =
            MapScriptRunner::new(1, preview, ScriptLimits::default(), Arc::new(logger.clone()));
        let output = runner.run(&wasm(body), SCRIPT_PATH).unwrap();
        assert_eq!(output.map_data.tiles[0].texture, TILE_XFLIP);
        assert_eq!(logger.contains(LogLevel::Info, "hello map"), preview);
    }
}

#[test]
fn test_noise_matches_host_generator() {
    let body = "(call $noise (i32.const 2) (i32.const 2) (i32.const 100) (i32.const 5)
            (i32.const 4) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))
        (call $commit)";
    let output = run(body, 9).unwrap();

    let params = NoiseParams {
        width: 2,
        height: 2,
        range: 100,
        crispness: 5,
        scale: 4,
        normalize_to_range: 0,
    };
    let mut source = SeededNoise(Pcg32::seed_from_u64(9));
    let expected = fractal_value_noise(&params, &[], &mut source).unwrap();
    let textures: Vec<u32> = output.map_data.tiles.iter().map(|t| u32::from(t.texture)).collect();
    assert_eq!(textures, expected);
}

#[test]
fn test_noise_rigged_callback() {
    // A region covering the whole map whose callback returns 0 flattens the noise.
    let body = "(call $noise (i32.const 4) (i32.const 4) (i32.const 1000) (i32.const 5)
            (i32.const 8) (i32.const 0) (i32.const 0) (i32.const 448) (i32.const 1))
        (call $commit_terrain (i32.const 4) (i32.const 4))";
    let output = run(body, 5).unwrap();
    assert!(output.map_data.tiles.iter().all(|t| t.texture == 0));
}

#[test]
fn test_noise_callback_errors() {
    let call = |rigged_ptr: u32, out_ptr: u32| {
        format!(
            "(call $noise (i32.const 4) (i32.const 4) (i32.const 1000) (i32.const 5)
                (i32.const 8) (i32.const 0) (i32.const {}) (i32.const {}) (i32.const 1))",
            out_ptr, rigged_ptr
        )
    };

    assert!(matches!(
        run(&call(472, 0), 1),
        Err(ScriptError::RiggedCallback { name, .. }) if name == "nope"
    ));
    assert!(matches!(
        run(&call(496, 0), 1),
        Err(ScriptError::BadArgument { function: "generate_fractal_value_noise", .. })
    ));
    assert!(matches!(
        run(&call(448, 65530), 1),
        Err(ScriptError::OutOfBounds { .. })
    ));
}

#[test]
fn test_noise_argument_errors() {
    let body = "(call $noise (i32.const 0) (i32.const 4) (i32.const 100) (i32.const 5)
            (i32.const 4) (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))";
    assert!(matches!(
        run(body, 1),
        Err(ScriptError::BadArgument { reason, .. }) if reason == "width must be > 0"
    ));
}

// ============================================================================
// Failures and limits
// ============================================================================

#[test]
fn test_compile_error() {
    let (mut runner, _) = runner(1);
    let result = runner.run(b"(module (func", SCRIPT_PATH);
    assert!(matches!(result, Err(ScriptError::Compile(_))));
    assert_eq!(runner.phase(), ScriptPhase::Faulted);
}

#[test]
fn test_trap_is_script_error() {
    let (mut runner, _) = runner(1);
    let result = runner.run(&wasm("(call $fill_textures) (call $commit) unreachable"), SCRIPT_PATH);
    assert!(matches!(result, Err(ScriptError::Trap(_))));
    assert_eq!(runner.phase(), ScriptPhase::Faulted);
}

#[test]
fn test_unknown_import_fails_instantiation() {
    let source = r#"(module (import "env" "launch_missiles" (func)))"#;
    let (mut runner, _) = runner(1);
    assert!(matches!(
        runner.run(source.as_bytes(), SCRIPT_PATH),
        Err(ScriptError::Instantiate(_))
    ));
}

#[test]
fn test_interrupt_stops_endless_loop() {
    let (runner, _) = runner(1);
    let mut runner = runner.with_interrupt(|| true);
    let result = runner.run(&wasm("(loop $spin (br $spin))"), SCRIPT_PATH);
    assert_eq!(result, Err(ScriptError::TimedOut(30)));
    assert_eq!(runner.phase(), ScriptPhase::TimedOut);
}

#[test]
fn test_interrupt_lands_before_commit() {
    let (runner, logger) = runner(1);
    let mut runner = runner.with_interrupt(|| true);
    let result = runner.run(&wasm("(call $fill_textures) (call $commit)"), SCRIPT_PATH);
    assert_eq!(result, Err(ScriptError::TimedOut(30)));
    assert_eq!(runner.phase(), ScriptPhase::TimedOut);
    assert_eq!(logger.count(LogLevel::Error), 0);
}

#[test]
fn test_interrupt_is_polled_while_running() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let limits = ScriptLimits {
        epoch_tick: Duration::from_millis(1),
        ..ScriptLimits::default()
    };
    let mut runner = MapScriptRunner::new(1, false, limits, Arc::new(RecordingLogger::new()))
        .with_interrupt(move || counter.fetch_add(1, Ordering::SeqCst) >= 3);

    let result = runner.run(&wasm("(loop $spin (br $spin))"), SCRIPT_PATH);
    assert_eq!(result, Err(ScriptError::TimedOut(30)));
    assert!(polls.load(Ordering::SeqCst) >= 4);
}

#[test]
fn test_memory_limit() {
    let limits = ScriptLimits {
        max_memory_bytes: 2 * 65536,
        ..ScriptLimits::default()
    };
    let mut runner = MapScriptRunner::new(1, false, limits, Arc::new(RecordingLogger::new()));
    let result = runner.run(&wasm("(drop (memory.grow (i32.const 10)))"), SCRIPT_PATH);
    assert_eq!(result, Err(ScriptError::MemoryLimit(2 * 65536)));
    assert_eq!(runner.phase(), ScriptPhase::Faulted);
}

#[test]
fn test_stack_overflow_is_script_error() {
    let source = script("(call $recurse)").replace(
        "(func $fill_textures",
        "(func $recurse (call $recurse))\n  (func $fill_textures",
    );
    let (mut runner, _) = runner(1);
    assert!(matches!(
        runner.run(source.as_bytes(), SCRIPT_PATH),
        Err(ScriptError::Trap(_))
    ));
}
