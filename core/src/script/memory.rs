//! Bounds-checked access to guest linear memory.

use byteorder::{ByteOrder, LittleEndian};
use wasmtime::{AsContext, AsContextMut, Caller, Extern, Memory};

use super::host::HostState;
use crate::error::ScriptError;

/// The guest's exported `memory`.
///
/// Looked up per call so natives also work while the start function is still running.
pub(super) fn guest_memory(
    caller: &mut Caller<'_, HostState>,
    function: &'static str,
) -> Result<Memory, ScriptError> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Ok(memory),
        _ => Err(ScriptError::NoMemory { function }),
    }
}

fn checked_range(
    ptr: u32,
    len: u64,
    size: usize,
    function: &'static str,
) -> Result<std::ops::Range<usize>, ScriptError> {
    let out_of_bounds = || ScriptError::OutOfBounds {
        function,
        ptr,
        len,
        size,
    };
    let start = ptr as usize;
    let len = usize::try_from(len).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > size {
        return Err(out_of_bounds());
    }
    Ok(start..end)
}

/// Copy `len` bytes starting at `ptr`.
pub(super) fn read_bytes(
    memory: Memory,
    store: impl AsContext,
    ptr: u32,
    len: u32,
    function: &'static str,
) -> Result<Vec<u8>, ScriptError> {
    let data = memory.data(&store);
    let range = checked_range(ptr, u64::from(len), data.len(), function)?;
    Ok(data[range].to_vec())
}

/// UTF-8 text of `len` bytes starting at `ptr`.
pub(super) fn read_str(
    memory: Memory,
    store: impl AsContext,
    ptr: u32,
    len: u32,
    function: &'static str,
) -> Result<String, ScriptError> {
    let bytes = read_bytes(memory, store, ptr, len, function)?;
    String::from_utf8(bytes).map_err(|_| ScriptError::BadArgument {
        function,
        reason: format!("string at {} is not valid UTF-8", ptr),
    })
}

/// `count` little-endian `u32` values starting at `ptr`.
pub(super) fn read_u32s(
    memory: Memory,
    store: impl AsContext,
    ptr: u32,
    count: u32,
    function: &'static str,
) -> Result<Vec<u32>, ScriptError> {
    let data = memory.data(&store);
    let range = checked_range(ptr, u64::from(count) * 4, data.len(), function)?;
    let mut values = vec![0u32; count as usize];
    LittleEndian::read_u32_into(&data[range], &mut values);
    Ok(values)
}

/// Store `values` as little-endian `u32` starting at `ptr`.
pub(super) fn write_u32s(
    memory: Memory,
    mut store: impl AsContextMut,
    ptr: u32,
    values: &[u32],
    function: &'static str,
) -> Result<(), ScriptError> {
    let data = memory.data_mut(&mut store);
    let range = checked_range(ptr, values.len() as u64 * 4, data.len(), function)?;
    LittleEndian::write_u32_into(values, &mut data[range]);
    Ok(())
}

/// Fixed-size records of `record_len` bytes, `count` of them, starting at `ptr`.
pub(super) fn read_records(
    memory: Memory,
    store: impl AsContext,
    ptr: u32,
    count: u32,
    record_len: usize,
    function: &'static str,
) -> Result<Vec<Vec<u8>>, ScriptError> {
    let data = memory.data(&store);
    let total = u64::from(count) * record_len as u64;
    let range = checked_range(ptr, total, data.len(), function)?;
    Ok(data[range]
        .chunks_exact(record_len)
        .map(<[u8]>::to_vec)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(4, 8, 16, "f"), Ok(4..12));
        assert_eq!(checked_range(8, 8, 16, "f"), Ok(8..16));
        assert!(matches!(
            checked_range(9, 8, 16, "f"),
            Err(ScriptError::OutOfBounds { ptr: 9, len: 8, size: 16, .. })
        ));
        assert!(checked_range(u32::MAX, u64::MAX, 16, "f").is_err());
    }
}
