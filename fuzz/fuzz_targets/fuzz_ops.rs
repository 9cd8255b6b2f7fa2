#![no_main]

use libfuzzer_sys::fuzz_target;

/// Fuzz target that interprets a byte slice as a sequence of zalloc/zfree calls.
///
/// Each operation is encoded as:
///   byte 0: opcode (0=alloc items, 1=free, 2=fill, 3=alloc single)
///   byte 1-2: size (little-endian u16)
///   byte 3: slot index (which tracked pointer to operate on)
///
/// Every block is written only within its requested bytes, so no sequence of
/// operations may ever reach the heap-corruption fail-fast.
const MAX_SLOTS: usize = 64;

fuzz_target!(|data: &[u8]| {
    let alloc = zguard::api::allocator();
    let mut slots: [*mut u8; MAX_SLOTS] = [std::ptr::null_mut(); MAX_SLOTS];
    let mut sizes: [usize; MAX_SLOTS] = [0; MAX_SLOTS];

    let mut i = 0;
    while i + 4 <= data.len() {
        let opcode = data[i] & 0x03;
        let size = u16::from_le_bytes([data[i + 1], data[i + 2]]) as usize;
        let slot = (data[i + 3] as usize) % MAX_SLOTS;
        i += 4;

        match opcode {
            0 => {
                // items * element size, never zeroed unless items == 1
                unsafe { alloc.free(slots[slot]) };
                let items = (size >> 8) + 2;
                let elem_size = size & 0xFF;
                let ptr = alloc.allocate(items, elem_size);
                assert!(!ptr.is_null(), "allocate({}, {}) failed", items, elem_size);
                slots[slot] = ptr;
                sizes[slot] = items * elem_size;
            }
            1 => {
                unsafe { alloc.free(slots[slot]) };
                slots[slot] = std::ptr::null_mut();
                sizes[slot] = 0;
            }
            2 => {
                // Fill to the last requested byte
                if !slots[slot].is_null() {
                    unsafe { std::ptr::write_bytes(slots[slot], data[i - 4], sizes[slot]) };
                }
            }
            3 => {
                unsafe { alloc.free(slots[slot]) };
                let ptr = alloc.allocate(1, size);
                assert!(!ptr.is_null(), "allocate(1, {}) failed", size);
                for j in 0..size {
                    assert_eq!(unsafe { *ptr.add(j) }, 0, "single item not zeroed at {}", j);
                }
                slots[slot] = ptr;
                sizes[slot] = size;
            }
            _ => unreachable!(),
        }
    }

    for slot in &mut slots {
        unsafe { alloc.free(*slot) };
        *slot = std::ptr::null_mut();
    }
});
