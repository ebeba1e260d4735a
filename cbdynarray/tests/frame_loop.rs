use cbarena::Allocator;
use cbarena::Arena;
use cbarena::VirtualMemory;
use cbdynarray::DynArray;
use oorandom::Rand32;

#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Zeroable)]
#[repr(C)]
struct Vertex {
    position: [f32; 2],
    color: u32,
}

fn build_quads<'a>(allocator: &'a dyn Allocator, count: usize) -> DynArray<'a, Vertex> {
    let mut vertices = DynArray::new();
    for i in 0..count {
        let x = i as f32;
        for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            vertices.push(
                allocator,
                Vertex {
                    position: [x + dx, dy],
                    color: i as u32,
                },
            );
        }
    }

    vertices
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_long_lived_and_per_frame_arrays() {
    let arena = Arena::new(VirtualMemory::new(), 8 << 20);
    let allocator: &dyn Allocator = &arena;

    let mut level: DynArray<u32> = DynArray::create(allocator, 256, 0);
    for (i, tile) in level.iter_mut().enumerate() {
        *tile = i as u32 * 3;
    }

    let frame_start = Arena::from_allocator(allocator).checkpoint();
    let mut r = Rand32::new(0);

    for frame in 0..32 {
        let quad_count = r.rand_range(1..200) as usize;
        let vertices = build_quads(allocator, quad_count);
        assert!(vertices.len() == quad_count * 4);
        assert!(vertices.back().color == quad_count as u32 - 1);

        let mut visible: DynArray<u32> = DynArray::new();
        for &tile in &level {
            if tile % (frame + 2) == 0 {
                visible.push(allocator, tile);
            }
        }
        assert!(visible.iter().all(|t| t % (frame + 2) == 0));

        // SAFETY: Everything allocated after frame_start belongs to this frame, and none of it is
        // used past this point. The level was allocated before frame_start.
        unsafe { Arena::from_allocator(allocator).set_checkpoint_unchecked(frame_start) };
        assert!(arena.allocated_size() == frame_start);
    }

    for (i, &tile) in level.iter().enumerate() {
        assert!(tile == i as u32 * 3);
    }

    level.dealloc(allocator);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_frame_allocations_are_deterministic() {
    let mut arena = Arena::new(VirtualMemory::new(), 1 << 20);
    let frame_start = arena.checkpoint();

    let mut first_frame = None;
    for _ in 0..4 {
        let (data, capacity) = {
            let mut values: DynArray<u64> = DynArray::new();
            for i in 0..100 {
                values.push(&arena, i);
            }
            (values.data(), values.capacity())
        };

        match first_frame {
            None => first_frame = Some((data, capacity)),
            Some(first) => assert!(first == (data, capacity)),
        }

        arena.set_checkpoint(frame_start);
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_resize_keeps_prefix_across_frames() {
    let arena = Arena::new(VirtualMemory::new(), 1 << 20);

    let mut history: DynArray<Vertex> = DynArray::create(&arena, 2, 4);
    history[0].color = 1;
    history[1].color = 2;

    history.resize(&arena, 6, 0);
    assert!(history.len() == 6);
    assert!(history[0].color == 1);
    assert!(history[1].color == 2);
    assert!(history[5] == <Vertex as bytemuck::Zeroable>::zeroed());

    history.resize(&arena, 1, 0);
    assert!(history.len() == 1);
    assert!(history[0].color == 1);
}
