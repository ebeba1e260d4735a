use core::alloc::Layout;

use cbarena::Arena;
use cbarena::VirtualMemory;

fn main() {
    let vm = VirtualMemory::new();
    println!("System page size is {}B", vm.page_size());

    let mut arena = Arena::new(vm, 16 << 20);

    let p = arena.allocate(Layout::new::<[u64; 1024]>()).unwrap();
    println!("Allocated memory at {p:?}");

    unsafe {
        *(p.as_ptr() as *mut [u64; 1024]) = [42; 1024];
    }
    println!("Written to memory");

    unsafe {
        let values: [u64; 1024] = *(p.as_ptr() as *mut [u64; 1024]);
        let v = values[0];
        println!("First value is {v}");
    }

    let checkpoint = arena.checkpoint();
    let _scratch = arena.alloc(1000, 64);
    println!(
        "Arena has reserved size {}KB, allocated size {}KB after scratch allocation",
        arena.reserved_size() >> 10,
        arena.allocated_size() >> 10,
    );

    arena.set_checkpoint(checkpoint);
    println!(
        "Arena has allocated size {}KB after rewinding to checkpoint {checkpoint}",
        arena.allocated_size() >> 10,
    );

    arena.reset();
    arena.destroy();

    println!("Done");
}
