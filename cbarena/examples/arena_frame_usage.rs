use cbarena::Allocator;
use cbarena::Arena;
use cbarena::VirtualMemory;
use cbarena::alloc_array;

// A typical frame loop: data that lives for the whole program is allocated first, then every frame
// takes a checkpoint, allocates its scratch data and rewinds to the checkpoint at the end.

struct Level {
    tiles: *mut u16,
    tile_count: usize,
}

fn load_level(allocator: &dyn Allocator, tile_count: usize) -> Level {
    let tiles = alloc_array::<u16, _>(allocator, tile_count);
    for i in 0..tile_count {
        unsafe { tiles.add(i).write((i % 7) as u16) };
    }

    Level {
        tiles: tiles.as_ptr(),
        tile_count,
    }
}

fn simulate_frame(allocator: &dyn Allocator, level: &Level, frame: usize) -> u64 {
    let scratch = alloc_array::<u64, _>(allocator, level.tile_count);

    let mut sum = 0;
    for i in 0..level.tile_count {
        let tile = unsafe { *level.tiles.add(i) } as u64;
        let value = tile * frame as u64;

        unsafe { scratch.add(i).write(value) };
        sum += value;
    }

    sum
}

fn main() {
    let mut arena = Arena::new(VirtualMemory::new(), 4 << 20);

    let level = load_level(&arena, 10_000);
    let frame_start = arena.checkpoint();
    println!("Level loaded, {}KB allocated", arena.allocated_size() >> 10);

    for frame in 0..5 {
        let sum = simulate_frame(&arena, &level, frame);
        println!(
            "Frame {frame}: sum {sum}, {}KB allocated",
            arena.allocated_size() >> 10,
        );

        // The level stays, everything the frame allocated goes.
        arena.set_checkpoint(frame_start);
    }

    println!("Done, {}KB allocated", arena.allocated_size() >> 10);
}
